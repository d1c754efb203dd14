use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{account::AccountId, email::Email, password::Password, token::TokenPurpose};

/// Port trait for delivering verification and reset links.
///
/// Delivery, retries, and transport are entirely the dispatcher's problem;
/// callers treat `send` as fire-and-forget and never fail a flow on a
/// delivery error.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        recipient: &Email,
        purpose: TokenPurpose,
        link: &str,
    ) -> Result<(), String>;
}

// CredentialStore port trait and errors
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("Password hashing error: {0}")]
    Hash(String),
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

/// Port trait for password hashing and verification.
///
/// `verify_password` answers false for unknown accounts rather than erroring
/// so callers cannot tell absent accounts from wrong passwords.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn set_password(
        &self,
        id: AccountId,
        new_password: Password,
    ) -> Result<(), CredentialStoreError>;
    async fn verify_password(
        &self,
        id: AccountId,
        candidate: &Password,
    ) -> Result<bool, CredentialStoreError>;
    async fn remove(&self, id: AccountId) -> Result<(), CredentialStoreError>;
}
