use chrono::Utc;
use vestibule_application::{
    EnrollmentSecrets, LockoutError, LockoutGuard, MfaError, MfaManager, SessionRegistry,
    SharedPolicy, TokenService, shared_policy,
};
use vestibule_core::{
    Account, AccountId, AccountStore, AccountStoreError, CredentialStore, DeviceId, DeviceInfo,
    Email, FailureWindowStore, LoginStep, MfaAttemptId, MfaDevice, MfaDeviceStore,
    MfaDeviceSummary, MfaKind, NotificationDispatcher, Password, SecurityPolicy, Session,
    SessionId, SessionStore, TokenPurpose, TokenStore, TokenValue, next_step,
};

use crate::error::AuthError;
use crate::pending::PendingMfaLedger;

/// Result of a login attempt that got past lockout and credential checks.
#[derive(Debug, PartialEq)]
pub enum LoginOutcome {
    /// Session created; the caller holds a live session.
    Authenticated { session: Session },
    /// Credentials were right but a second factor is still owed. No session
    /// exists until [`AuthenticationService::complete_mfa_login`] succeeds.
    MfaRequired { attempt_id: MfaAttemptId },
    /// Denied until the primary address is verified; offer a re-send.
    EmailUnverified,
}

/// The orchestrator: the only component that knows the whole flow. Every
/// operation names the account or session it acts on; there is no ambient
/// "current user".
pub struct AuthenticationService<A, T, S, D, F, C, N>
where
    A: AccountStore + Clone,
    T: TokenStore,
    S: SessionStore,
    D: MfaDeviceStore,
    F: FailureWindowStore,
    C: CredentialStore,
    N: NotificationDispatcher,
{
    accounts: A,
    credentials: C,
    tokens: TokenService<T, N>,
    sessions: SessionRegistry<S>,
    mfa: MfaManager<D, A>,
    lockout: LockoutGuard<F, A>,
    pending: PendingMfaLedger,
    policy: SharedPolicy,
}

impl<A, T, S, D, F, C, N> AuthenticationService<A, T, S, D, F, C, N>
where
    A: AccountStore + Clone,
    T: TokenStore,
    S: SessionStore,
    D: MfaDeviceStore,
    F: FailureWindowStore,
    C: CredentialStore,
    N: NotificationDispatcher,
{
    /// Wire the service from its stores and collaborators.
    ///
    /// `link_base` anchors the links embedded in verification and reset
    /// notifications. The policy can be swapped later with
    /// [`update_policy`](Self::update_policy).
    pub fn new(
        accounts: A,
        credentials: C,
        tokens: T,
        sessions: S,
        devices: D,
        failures: F,
        dispatcher: N,
        policy: SecurityPolicy,
        link_base: impl Into<String>,
    ) -> Self {
        let policy = shared_policy(policy);
        Self {
            credentials,
            tokens: TokenService::new(tokens, dispatcher, link_base),
            sessions: SessionRegistry::new(sessions),
            mfa: MfaManager::new(devices, accounts.clone(), policy.clone()),
            lockout: LockoutGuard::new(failures, accounts.clone(), policy.clone()),
            accounts,
            pending: PendingMfaLedger::new(),
            policy,
        }
    }

    /// Swap the security policy; takes effect on the next operation.
    pub fn update_policy(&self, policy: SecurityPolicy) {
        self.policy.store(std::sync::Arc::new(policy));
    }

    // ------------------------------------------------------------------
    // Signup and email verification
    // ------------------------------------------------------------------

    /// Create an account with an unverified primary address and send the
    /// verification link.
    #[tracing::instrument(name = "AuthenticationService::signup", skip_all)]
    pub async fn signup(&self, email: Email, password: Password) -> Result<Account, AuthError> {
        let account = Account::new(email.clone(), Utc::now());

        // Hash before the account becomes visible so no account ever exists
        // without credentials.
        self.credentials.set_password(account.id, password).await?;
        if let Err(err) = self.accounts.add_account(account.clone()).await {
            self.credentials.remove(account.id).await?;
            return Err(err.into());
        }

        let ttl = self.policy.load_full().email_verify_ttl();
        self.tokens
            .issue(account.id, &email, TokenPurpose::EmailVerify, ttl)
            .await?;

        tracing::info!(account = %account.id, "account created");
        Ok(account)
    }

    /// Consume an email-verification token and mark its address verified.
    #[tracing::instrument(name = "AuthenticationService::verify_email", skip_all)]
    pub async fn verify_email(&self, token: &TokenValue) -> Result<AccountId, AuthError> {
        let token = self
            .tokens
            .consume(token, TokenPurpose::EmailVerify)
            .await?;
        self.accounts
            .mark_email_verified(token.account_id, &token.email)
            .await?;
        Ok(token.account_id)
    }

    // ------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------

    /// Authenticate credentials and derive what the attempt still needs.
    ///
    /// The failure counter resets only when a login fully completes (here
    /// or in [`complete_mfa_login`](Self::complete_mfa_login)), so failed
    /// second-factor rounds keep accumulating across attempts.
    #[tracing::instrument(name = "AuthenticationService::login", skip_all)]
    pub async fn login(
        &self,
        email: &Email,
        password: &Password,
        device: DeviceInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let account = match self.accounts.find_by_email(email).await {
            Ok(account) => account,
            Err(AccountStoreError::AccountNotFound) => {
                // Unknown identifiers still pay for a verification so
                // response timing does not enumerate accounts.
                let _ = self
                    .credentials
                    .verify_password(AccountId::new(), password)
                    .await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(err.into()),
        };

        self.check_lockout(account.id).await?;

        if !self
            .credentials
            .verify_password(account.id, password)
            .await?
        {
            self.lockout.record_failure(account.id).await?;
            return Err(AuthError::InvalidCredentials);
        }

        match next_step(account.login_flags(), false) {
            LoginStep::EmailUnverified => Ok(LoginOutcome::EmailUnverified),
            LoginStep::MfaRequired => {
                let ttl = self.policy.load_full().mfa_attempt_ttl();
                let attempt_id = self.pending.insert(account.id, device, ttl);
                Ok(LoginOutcome::MfaRequired { attempt_id })
            }
            LoginStep::Authenticated => {
                self.lockout.record_success(account.id).await?;
                let session = self.sessions.create(account.id, device).await?;
                Ok(LoginOutcome::Authenticated { session })
            }
        }
    }

    /// Finish a pending-MFA login. Invalid codes feed the account's failure
    /// window; an expired or already-claimed handle forces a fresh login.
    #[tracing::instrument(name = "AuthenticationService::complete_mfa_login", skip(self, code))]
    pub async fn complete_mfa_login(
        &self,
        attempt_id: MfaAttemptId,
        device_id: DeviceId,
        code: &str,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();
        let pending = self
            .pending
            .peek(attempt_id, now)
            .ok_or(AuthError::LoginAttemptExpired)?;

        self.check_lockout(pending.account_id).await?;

        match self.mfa.challenge(pending.account_id, device_id, code).await {
            Ok(()) => {
                let claimed = self
                    .pending
                    .complete(attempt_id, Utc::now())
                    .ok_or(AuthError::LoginAttemptExpired)?;
                self.lockout.record_success(claimed.account_id).await?;
                let session = self
                    .sessions
                    .create(claimed.account_id, claimed.device)
                    .await?;
                Ok(session)
            }
            Err(MfaError::InvalidCode) => {
                self.lockout.record_failure(pending.account_id).await?;
                Err(AuthError::MfaInvalidCode)
            }
            Err(err) => Err(err.into()),
        }
    }

    // ------------------------------------------------------------------
    // Password reset and change
    // ------------------------------------------------------------------

    /// Issue a reset token when the address is a verified primary. Anything
    /// else is a silent success: this operation never confirms whether an
    /// address exists.
    #[tracing::instrument(name = "AuthenticationService::request_password_reset", skip_all)]
    pub async fn request_password_reset(&self, email: &Email) -> Result<(), AuthError> {
        let account = match self.accounts.find_by_email(email).await {
            Ok(account) => account,
            Err(AccountStoreError::AccountNotFound) => {
                tracing::debug!("password reset requested for unknown address");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let eligible = account
            .email_entry(email)
            .is_some_and(|entry| entry.primary && entry.verified);
        if !eligible {
            tracing::debug!(account = %account.id, "password reset for ineligible address");
            return Ok(());
        }

        let ttl = self.policy.load_full().password_reset_ttl();
        self.tokens
            .issue(account.id, email, TokenPurpose::PasswordReset, ttl)
            .await?;
        Ok(())
    }

    /// Consume a reset token, set the new password, and force
    /// re-authentication everywhere by revoking every session.
    #[tracing::instrument(name = "AuthenticationService::complete_password_reset", skip_all)]
    pub async fn complete_password_reset(
        &self,
        token: &TokenValue,
        new_password: Password,
    ) -> Result<AccountId, AuthError> {
        let token = self
            .tokens
            .consume(token, TokenPurpose::PasswordReset)
            .await?;

        self.credentials
            .set_password(token.account_id, new_password)
            .await?;
        self.accounts
            .set_password_set_at(token.account_id, Utc::now())
            .await?;
        self.sessions
            .revoke_all_except(token.account_id, None)
            .await?;

        tracing::info!(account = %token.account_id, "password reset completed");
        Ok(token.account_id)
    }

    /// Change the password of a logged-in account: re-verify the current
    /// one, set the new one, and revoke every other session.
    #[tracing::instrument(name = "AuthenticationService::change_password", skip_all)]
    pub async fn change_password(
        &self,
        account_id: AccountId,
        session_id: SessionId,
        current_password: &Password,
        new_password: Password,
    ) -> Result<(), AuthError> {
        if !self
            .credentials
            .verify_password(account_id, current_password)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.credentials
            .set_password(account_id, new_password)
            .await?;
        self.accounts
            .set_password_set_at(account_id, Utc::now())
            .await?;
        self.sessions
            .revoke_all_except(account_id, Some(session_id))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn logout(&self, session_id: SessionId) -> Result<(), AuthError> {
        self.sessions.revoke(session_id).await?;
        Ok(())
    }

    pub async fn touch_session(&self, session_id: SessionId) -> Result<(), AuthError> {
        self.sessions.touch(session_id).await?;
        Ok(())
    }

    /// All sessions for the account, most recently seen first.
    pub async fn list_sessions(&self, account_id: AccountId) -> Result<Vec<Session>, AuthError> {
        Ok(self.sessions.list(account_id).await?)
    }

    pub async fn revoke_session(&self, session_id: SessionId) -> Result<(), AuthError> {
        self.sessions.revoke(session_id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // MFA surface
    // ------------------------------------------------------------------

    /// Enroll a device; the returned secrets leave the system exactly once.
    pub async fn enroll_mfa(
        &self,
        account_id: AccountId,
        kind: MfaKind,
    ) -> Result<(MfaDevice, EnrollmentSecrets), AuthError> {
        Ok(self.mfa.enroll(account_id, kind).await?)
    }

    /// Confirm a pending device with a code from it.
    pub async fn confirm_mfa(&self, device_id: DeviceId, code: &str) -> Result<(), AuthError> {
        Ok(self.mfa.confirm(device_id, code).await?)
    }

    /// Challenge an active device outside the login flow (step-up checks).
    /// Failed codes count toward the account's failure window.
    #[tracing::instrument(name = "AuthenticationService::challenge_mfa", skip(self, code))]
    pub async fn challenge_mfa(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
        code: &str,
    ) -> Result<(), AuthError> {
        self.check_lockout(account_id).await?;
        match self.mfa.challenge(account_id, device_id, code).await {
            Ok(()) => Ok(()),
            Err(MfaError::InvalidCode) => {
                self.lockout.record_failure(account_id).await?;
                Err(AuthError::MfaInvalidCode)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn revoke_mfa_device(&self, device_id: DeviceId) -> Result<(), AuthError> {
        Ok(self.mfa.revoke(device_id).await?)
    }

    pub async fn list_mfa_devices(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<MfaDeviceSummary>, AuthError> {
        Ok(self.mfa.list(account_id).await?)
    }

    // ------------------------------------------------------------------
    // Email management
    // ------------------------------------------------------------------

    /// Attach an unverified secondary address and send its verification
    /// link.
    #[tracing::instrument(name = "AuthenticationService::add_email", skip_all)]
    pub async fn add_email(&self, account_id: AccountId, email: Email) -> Result<(), AuthError> {
        self.accounts.add_email(account_id, email.clone()).await?;
        let ttl = self.policy.load_full().email_verify_ttl();
        self.tokens
            .issue(account_id, &email, TokenPurpose::EmailVerify, ttl)
            .await?;
        Ok(())
    }

    /// Re-send the verification link for an unverified address. Already
    /// verified addresses are a quiet no-op.
    #[tracing::instrument(name = "AuthenticationService::resend_verification", skip_all)]
    pub async fn resend_verification(
        &self,
        account_id: AccountId,
        email: &Email,
    ) -> Result<(), AuthError> {
        let account = self.accounts.get_account(account_id).await?;
        let entry = account.email_entry(email).ok_or(AuthError::EmailNotFound)?;
        if entry.verified {
            return Ok(());
        }

        let ttl = self.policy.load_full().email_verify_ttl();
        self.tokens
            .issue(account_id, email, TokenPurpose::EmailVerify, ttl)
            .await?;
        Ok(())
    }

    /// Promote a verified address to primary.
    pub async fn set_primary_email(
        &self,
        account_id: AccountId,
        email: &Email,
    ) -> Result<(), AuthError> {
        let account = self.accounts.get_account(account_id).await?;
        let entry = account.email_entry(email).ok_or(AuthError::EmailNotFound)?;
        if !entry.verified {
            return Err(AuthError::EmailNotVerified);
        }
        self.accounts.set_primary_email(account_id, email).await?;
        Ok(())
    }

    /// Detach a non-primary address.
    pub async fn remove_email(
        &self,
        account_id: AccountId,
        email: &Email,
    ) -> Result<(), AuthError> {
        self.accounts.remove_email(account_id, email).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Account deletion
    // ------------------------------------------------------------------

    /// Delete the account after re-verifying its password, along with its
    /// sessions, tokens, devices, and credentials.
    #[tracing::instrument(name = "AuthenticationService::delete_account", skip_all)]
    pub async fn delete_account(
        &self,
        account_id: AccountId,
        password: &Password,
    ) -> Result<(), AuthError> {
        if !self.credentials.verify_password(account_id, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        self.sessions.purge(account_id).await?;
        self.tokens.purge(account_id).await?;
        self.mfa.purge(account_id).await?;
        self.lockout.record_success(account_id).await?;
        self.credentials.remove(account_id).await?;
        self.accounts.delete_account(account_id).await?;

        tracing::info!(account = %account_id, "account deleted");
        Ok(())
    }

    async fn check_lockout(&self, account_id: AccountId) -> Result<(), AuthError> {
        match self.lockout.check(account_id).await {
            Ok(()) => Ok(()),
            Err(LockoutError::Locked(until)) => Err(AuthError::AccountLocked(until)),
            Err(err) => Err(err.into()),
        }
    }
}
