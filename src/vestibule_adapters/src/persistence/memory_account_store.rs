use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use chrono::{DateTime, Utc};
use vestibule_core::{
    Account, AccountId, AccountStore, AccountStoreError, Email, EmailAddress,
};

/// In-memory account table behind one `RwLock`, the simplest structure that
/// makes the cross-account email-uniqueness check race-free: every write
/// holds the table lock while it scans.
#[derive(Default, Clone)]
pub struct MemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(accounts: &HashMap<AccountId, Account>, email: &Email) -> bool {
    accounts
        .values()
        .any(|account| account.has_email(email))
}

#[async_trait::async_trait]
impl AccountStore for MemoryAccountStore {
    async fn add_account(&self, account: Account) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        for entry in &account.emails {
            if email_taken(&accounts, &entry.email) {
                return Err(AccountStoreError::DuplicateEmail);
            }
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, AccountStoreError> {
        self.accounts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AccountStoreError::AccountNotFound)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Account, AccountStoreError> {
        self.accounts
            .read()
            .await
            .values()
            .find(|account| account.has_email(email))
            .cloned()
            .ok_or(AccountStoreError::AccountNotFound)
    }

    async fn add_email(&self, id: AccountId, email: Email) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        if email_taken(&accounts, &email) {
            return Err(AccountStoreError::DuplicateEmail);
        }
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        account.emails.push(EmailAddress::secondary_unverified(email));
        Ok(())
    }

    async fn mark_email_verified(
        &self,
        id: AccountId,
        email: &Email,
    ) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        let entry = account
            .emails
            .iter_mut()
            .find(|entry| &entry.email == email)
            .ok_or(AccountStoreError::EmailNotFound)?;
        entry.verified = true;
        Ok(())
    }

    async fn set_primary_email(
        &self,
        id: AccountId,
        email: &Email,
    ) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        if !account.has_email(email) {
            return Err(AccountStoreError::EmailNotFound);
        }
        // Swap under the same lock so exactly one primary exists at any
        // observable point.
        for entry in &mut account.emails {
            entry.primary = &entry.email == email;
        }
        Ok(())
    }

    async fn remove_email(&self, id: AccountId, email: &Email) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        let entry = account
            .email_entry(email)
            .ok_or(AccountStoreError::EmailNotFound)?;
        if entry.primary {
            return Err(AccountStoreError::PrimaryEmailImmovable);
        }
        account.emails.retain(|entry| &entry.email != email);
        Ok(())
    }

    async fn set_locked_until(
        &self,
        id: AccountId,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        account.locked_until = until;
        Ok(())
    }

    async fn set_mfa_enabled(&self, id: AccountId, enabled: bool) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        account.mfa_enabled = enabled;
        Ok(())
    }

    async fn set_password_set_at(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
    ) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
        account.password_set_at = at;
        Ok(())
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), AccountStoreError> {
        self.accounts
            .write()
            .await
            .remove(&id)
            .ok_or(AccountStoreError::AccountNotFound)?;
        Ok(())
    }
}
