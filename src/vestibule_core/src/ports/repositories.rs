use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::domain::{
    account::{Account, AccountId},
    email::Email,
    mfa::{DeviceId, MfaDevice, MfaStatus},
    session::{Session, SessionId},
    token::{TokenValue, VerificationToken},
};

// AccountStore port trait and errors
#[derive(Debug, Error)]
pub enum AccountStoreError {
    #[error("Email already in use")]
    DuplicateEmail,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Email not found on account")]
    EmailNotFound,
    #[error("Primary email cannot be removed")]
    PrimaryEmailImmovable,
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl PartialEq for AccountStoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DuplicateEmail, Self::DuplicateEmail) => true,
            (Self::AccountNotFound, Self::AccountNotFound) => true,
            (Self::EmailNotFound, Self::EmailNotFound) => true,
            (Self::PrimaryEmailImmovable, Self::PrimaryEmailImmovable) => true,
            (Self::UnexpectedError(_), Self::UnexpectedError(_)) => true,
            _ => false,
        }
    }
}

/// Durable account records. Implementations enforce global email uniqueness
/// across accounts and the exactly-one-primary invariant per account.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn add_account(&self, account: Account) -> Result<(), AccountStoreError>;
    async fn get_account(&self, id: AccountId) -> Result<Account, AccountStoreError>;
    async fn find_by_email(&self, email: &Email) -> Result<Account, AccountStoreError>;
    /// Attach an unverified secondary address; `DuplicateEmail` if the
    /// address exists on any account.
    async fn add_email(&self, id: AccountId, email: Email) -> Result<(), AccountStoreError>;
    async fn mark_email_verified(
        &self,
        id: AccountId,
        email: &Email,
    ) -> Result<(), AccountStoreError>;
    /// Swap the primary flag to `email` atomically; the previous primary
    /// becomes secondary.
    async fn set_primary_email(
        &self,
        id: AccountId,
        email: &Email,
    ) -> Result<(), AccountStoreError>;
    async fn remove_email(&self, id: AccountId, email: &Email) -> Result<(), AccountStoreError>;
    async fn set_locked_until(
        &self,
        id: AccountId,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), AccountStoreError>;
    async fn set_mfa_enabled(&self, id: AccountId, enabled: bool) -> Result<(), AccountStoreError>;
    async fn set_password_set_at(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
    ) -> Result<(), AccountStoreError>;
    async fn delete_account(&self, id: AccountId) -> Result<(), AccountStoreError>;
}

// TokenStore port trait and errors
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token not found")]
    TokenNotFound,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token already used")]
    TokenAlreadyUsed,
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl PartialEq for TokenStoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::TokenNotFound, Self::TokenNotFound) => true,
            (Self::TokenExpired, Self::TokenExpired) => true,
            (Self::TokenAlreadyUsed, Self::TokenAlreadyUsed) => true,
            (Self::UnexpectedError(_), Self::UnexpectedError(_)) => true,
            _ => false,
        }
    }
}

/// Single-use verification tokens, keyed by opaque value.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a fresh token, dropping any unconsumed token with the same
    /// (account, purpose) so at most one is outstanding.
    async fn put(&self, token: VerificationToken) -> Result<(), TokenStoreError>;
    /// Peek at a token without consuming it.
    async fn get(&self, value: &TokenValue) -> Result<VerificationToken, TokenStoreError>;
    /// Atomically check-and-set `consumed`. Exactly one of two racing
    /// callers succeeds; the loser sees `TokenAlreadyUsed`. Expiry is
    /// checked against `now` under the same lock.
    async fn consume(
        &self,
        value: &TokenValue,
        now: DateTime<Utc>,
    ) -> Result<VerificationToken, TokenStoreError>;
    async fn remove_for_account(&self, id: AccountId) -> Result<(), TokenStoreError>;
}

// SessionStore port trait and errors
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl PartialEq for SessionStoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SessionNotFound, Self::SessionNotFound) => true,
            (Self::UnexpectedError(_), Self::UnexpectedError(_)) => true,
            _ => false,
        }
    }
}

/// Active and revoked sessions per account. Mutations for one account
/// serialize against each other; `revoke_all_except` and `insert` in
/// particular must not interleave.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), SessionStoreError>;
    async fn get(&self, id: SessionId) -> Result<Session, SessionStoreError>;
    /// Update `last_seen_at`; silently ignored for revoked sessions.
    async fn touch(&self, id: SessionId, at: DateTime<Utc>) -> Result<(), SessionStoreError>;
    /// All sessions for the account, most recently seen first.
    async fn list_for_account(&self, id: AccountId) -> Result<Vec<Session>, SessionStoreError>;
    /// Idempotent: revoking a revoked session is a no-op success.
    async fn revoke(&self, id: SessionId) -> Result<(), SessionStoreError>;
    /// Revoke every active session for the account except `keep`, atomically
    /// with respect to concurrent `insert` for the same account. Returns the
    /// number of sessions revoked.
    async fn revoke_all_except(
        &self,
        id: AccountId,
        keep: Option<SessionId>,
    ) -> Result<u32, SessionStoreError>;
    async fn remove_for_account(&self, id: AccountId) -> Result<(), SessionStoreError>;
}

// MfaDeviceStore port trait and errors
#[derive(Debug, Error)]
pub enum MfaDeviceStoreError {
    #[error("Device not found")]
    DeviceNotFound,
    #[error("Illegal device status transition")]
    IllegalTransition,
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl PartialEq for MfaDeviceStoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DeviceNotFound, Self::DeviceNotFound) => true,
            (Self::IllegalTransition, Self::IllegalTransition) => true,
            (Self::UnexpectedError(_), Self::UnexpectedError(_)) => true,
            _ => false,
        }
    }
}

/// Second-factor devices. The two check-and-set methods exist so challenge
/// verification stays race-free: only one caller may claim a TOTP time-step
/// or a recovery code.
#[async_trait]
pub trait MfaDeviceStore: Send + Sync {
    async fn insert(&self, device: MfaDevice) -> Result<(), MfaDeviceStoreError>;
    async fn get(&self, id: DeviceId) -> Result<MfaDevice, MfaDeviceStoreError>;
    async fn list_for_account(&self, id: AccountId) -> Result<Vec<MfaDevice>, MfaDeviceStoreError>;
    /// Apply a status transition, rejecting anything
    /// [`MfaStatus::may_become`] forbids.
    async fn set_status(&self, id: DeviceId, status: MfaStatus)
    -> Result<(), MfaDeviceStoreError>;
    /// Claim a TOTP time-step. Returns false when `step` (or a later one)
    /// was already claimed, which marks a replay.
    async fn claim_totp_step(&self, id: DeviceId, step: u64) -> Result<bool, MfaDeviceStoreError>;
    /// Consume one recovery code by hash. Returns false when the hash
    /// matches no remaining code.
    async fn consume_recovery_code(
        &self,
        id: DeviceId,
        code_hash: &str,
    ) -> Result<bool, MfaDeviceStoreError>;
    async fn remove_for_account(&self, id: AccountId) -> Result<(), MfaDeviceStoreError>;
}

// FailureWindowStore port trait and errors
#[derive(Debug, Error)]
pub enum FailureWindowStoreError {
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

/// Failed-login bookkeeping. `record_failure` is an atomic
/// append-prune-count so concurrent failures for one account never
/// undercount.
#[async_trait]
pub trait FailureWindowStore: Send + Sync {
    async fn record_failure(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
        window: Duration,
    ) -> Result<u32, FailureWindowStoreError>;
    async fn clear(&self, id: AccountId) -> Result<(), FailureWindowStoreError>;
}
