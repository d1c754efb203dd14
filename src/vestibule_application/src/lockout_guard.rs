use chrono::{DateTime, Utc};
use vestibule_core::{
    AccountId, AccountStore, AccountStoreError, FailureWindowStore, FailureWindowStoreError,
};

use crate::SharedPolicy;

/// Error types for lockout enforcement
#[derive(Debug, thiserror::Error)]
pub enum LockoutError {
    #[error("Account locked until {0}")]
    Locked(DateTime<Utc>),
    #[error("Failure window store error: {0}")]
    FailureWindowStoreError(#[from] FailureWindowStoreError),
    #[error("Account store error: {0}")]
    AccountStoreError(#[from] AccountStoreError),
}

/// Tracks failed-login counters per account over a sliding window and
/// enforces temporary lockout once the policy threshold is reached.
pub struct LockoutGuard<F, A>
where
    F: FailureWindowStore,
    A: AccountStore,
{
    failures: F,
    accounts: A,
    policy: SharedPolicy,
}

impl<F, A> LockoutGuard<F, A>
where
    F: FailureWindowStore,
    A: AccountStore,
{
    pub fn new(failures: F, accounts: A, policy: SharedPolicy) -> Self {
        Self {
            failures,
            accounts,
            policy,
        }
    }

    /// Gate an authentication attempt. An expired lock counts as absent.
    #[tracing::instrument(name = "LockoutGuard::check", skip(self))]
    pub async fn check(&self, id: AccountId) -> Result<(), LockoutError> {
        let account = self.accounts.get_account(id).await?;
        match account.locked_at(Utc::now()) {
            Some(until) => Err(LockoutError::Locked(until)),
            None => Ok(()),
        }
    }

    /// Count one failure; lock the account when the in-window count reaches
    /// the threshold. The window is cleared on lockout so a fresh lockout
    /// needs a fresh run of failures after the current one expires.
    #[tracing::instrument(name = "LockoutGuard::record_failure", skip(self))]
    pub async fn record_failure(&self, id: AccountId) -> Result<(), LockoutError> {
        let policy = self.policy.load_full();
        let now = Utc::now();
        let count = self
            .failures
            .record_failure(id, now, policy.failure_window())
            .await?;

        if count >= policy.lockout_threshold {
            let until = now + policy.lockout_duration();
            self.accounts.set_locked_until(id, Some(until)).await?;
            self.failures.clear(id).await?;
            tracing::warn!(account = %id, %until, "lockout threshold reached");
        }
        Ok(())
    }

    /// Reset the counter after a fully completed authentication.
    #[tracing::instrument(name = "LockoutGuard::record_success", skip(self))]
    pub async fn record_success(&self, id: AccountId) -> Result<(), LockoutError> {
        self.failures.clear(id).await?;
        Ok(())
    }
}
