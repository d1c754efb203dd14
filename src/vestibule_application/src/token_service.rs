use chrono::{Duration, Utc};
use vestibule_core::{
    AccountId, Email, NotificationDispatcher, TokenPurpose, TokenStore, TokenStoreError,
    TokenValue, VerificationToken,
};

/// Issues, validates, and consumes single-use expiring tokens for email
/// verification and password reset.
pub struct TokenService<T, N>
where
    T: TokenStore,
    N: NotificationDispatcher,
{
    tokens: T,
    dispatcher: N,
    /// Base URL the token link is built on, e.g. `https://app.example.com/account`.
    link_base: String,
}

impl<T, N> TokenService<T, N>
where
    T: TokenStore,
    N: NotificationDispatcher,
{
    pub fn new(tokens: T, dispatcher: N, link_base: impl Into<String>) -> Self {
        Self {
            tokens,
            dispatcher,
            link_base: link_base.into(),
        }
    }

    /// Issue a fresh token for `(account, purpose)`, invalidating any prior
    /// unconsumed token of the same purpose, and hand the link to the
    /// dispatcher.
    ///
    /// Delivery failures are logged and recovered by the dispatcher's own
    /// retry policy; they never fail the issuing flow.
    #[tracing::instrument(name = "TokenService::issue", skip(self, email))]
    pub async fn issue(
        &self,
        account_id: AccountId,
        email: &Email,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<TokenValue, TokenStoreError> {
        let token = VerificationToken::issue(account_id, email.clone(), purpose, Utc::now(), ttl);
        let value = token.value.clone();
        self.tokens.put(token).await?;

        let link = self.link_for(purpose, &value);
        if let Err(reason) = self.dispatcher.send(email, purpose, &link).await {
            tracing::warn!(%email, ?purpose, %reason, "notification dispatch failed");
        }

        Ok(value)
    }

    /// Peek at a token without consuming it, for pre-check display such as
    /// the password-reset form.
    #[tracing::instrument(name = "TokenService::validate", skip_all)]
    pub async fn validate(
        &self,
        value: &TokenValue,
        purpose: TokenPurpose,
    ) -> Result<VerificationToken, TokenStoreError> {
        let token = self.tokens.get(value).await?;
        // A purpose mismatch reads as absence; the caller learns nothing
        // about tokens of other purposes.
        if token.purpose != purpose {
            return Err(TokenStoreError::TokenNotFound);
        }
        if token.consumed {
            return Err(TokenStoreError::TokenAlreadyUsed);
        }
        if token.is_expired(Utc::now()) {
            return Err(TokenStoreError::TokenExpired);
        }
        Ok(token)
    }

    /// Consume a token. At most one of two racing callers succeeds; the
    /// other observes `TokenAlreadyUsed`.
    #[tracing::instrument(name = "TokenService::consume", skip_all)]
    pub async fn consume(
        &self,
        value: &TokenValue,
        purpose: TokenPurpose,
    ) -> Result<VerificationToken, TokenStoreError> {
        let token = self.tokens.get(value).await?;
        if token.purpose != purpose {
            return Err(TokenStoreError::TokenNotFound);
        }
        self.tokens.consume(value, Utc::now()).await
    }

    /// Drop every token for an account, e.g. on account deletion.
    pub async fn purge(&self, account_id: AccountId) -> Result<(), TokenStoreError> {
        self.tokens.remove_for_account(account_id).await
    }

    fn link_for(&self, purpose: TokenPurpose, value: &TokenValue) -> String {
        format!(
            "{}/{}?token={}",
            self.link_base.trim_end_matches('/'),
            purpose.link_segment(),
            value.as_str()
        )
    }
}
