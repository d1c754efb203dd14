use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vestibule_core::{AccountId, TokenStore, TokenStoreError, TokenValue, VerificationToken};

/// In-memory token store. Tokens are sharded per account so all mutations
/// for one account serialize on that account's entry while other accounts
/// proceed independently; a value index routes opaque lookups to the owning
/// shard.
#[derive(Default, Clone)]
pub struct MemoryTokenStore {
    by_account: Arc<DashMap<AccountId, Vec<VerificationToken>>>,
    index: Arc<DashMap<TokenValue, AccountId>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_of(&self, value: &TokenValue) -> Result<AccountId, TokenStoreError> {
        // Copy the id out so the index guard drops before any account entry
        // is taken; holding both invites lock-order trouble.
        self.index
            .get(value)
            .map(|entry| *entry.value())
            .ok_or(TokenStoreError::TokenNotFound)
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, token: VerificationToken) -> Result<(), TokenStoreError> {
        let mut entry = self.by_account.entry(token.account_id).or_default();

        // Supersede any unconsumed token of the same purpose.
        let superseded: Vec<TokenValue> = entry
            .iter()
            .filter(|t| t.purpose == token.purpose && !t.consumed)
            .map(|t| t.value.clone())
            .collect();
        entry.retain(|t| !(t.purpose == token.purpose && !t.consumed));

        self.index.insert(token.value.clone(), token.account_id);
        entry.push(token);
        drop(entry);

        for value in superseded {
            self.index.remove(&value);
        }
        Ok(())
    }

    async fn get(&self, value: &TokenValue) -> Result<VerificationToken, TokenStoreError> {
        let account_id = self.owner_of(value)?;
        let tokens = self
            .by_account
            .get(&account_id)
            .ok_or(TokenStoreError::TokenNotFound)?;
        tokens
            .iter()
            .find(|t| &t.value == value)
            .cloned()
            .ok_or(TokenStoreError::TokenNotFound)
    }

    async fn consume(
        &self,
        value: &TokenValue,
        now: DateTime<Utc>,
    ) -> Result<VerificationToken, TokenStoreError> {
        let account_id = self.owner_of(value)?;
        let mut tokens = self
            .by_account
            .get_mut(&account_id)
            .ok_or(TokenStoreError::TokenNotFound)?;
        // Everything below happens under the account's entry lock: the
        // check and the set are one step, so one of two racing consumers
        // must observe `consumed == true`.
        let token = tokens
            .iter_mut()
            .find(|t| &t.value == value)
            .ok_or(TokenStoreError::TokenNotFound)?;
        if token.consumed {
            return Err(TokenStoreError::TokenAlreadyUsed);
        }
        if token.is_expired(now) {
            return Err(TokenStoreError::TokenExpired);
        }
        token.consumed = true;
        Ok(token.clone())
    }

    async fn remove_for_account(&self, id: AccountId) -> Result<(), TokenStoreError> {
        if let Some((_, tokens)) = self.by_account.remove(&id) {
            for token in tokens {
                self.index.remove(&token.value);
            }
        }
        Ok(())
    }
}
