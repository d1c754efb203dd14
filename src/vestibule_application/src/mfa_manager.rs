use std::fmt;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use vestibule_core::{
    AccountId, AccountStore, AccountStoreError, DeviceId, DeviceMaterial, MfaDevice,
    MfaDeviceStore, MfaDeviceStoreError, MfaDeviceSummary, MfaKind, MfaStatus,
};

use crate::{SharedPolicy, recovery, totp};

/// Error types for MFA enrollment and challenges
#[derive(Debug, thiserror::Error)]
pub enum MfaError {
    #[error("Invalid MFA code")]
    InvalidCode,
    #[error("Device is not pending confirmation")]
    DeviceNotPending,
    #[error("Device is not active")]
    DeviceNotActive,
    #[error("Device belongs to another account")]
    WrongAccount,
    #[error("TOTP error: {0}")]
    Totp(String),
    #[error("MFA device store error: {0}")]
    MfaDeviceStoreError(#[from] MfaDeviceStoreError),
    #[error("Account store error: {0}")]
    AccountStoreError(#[from] AccountStoreError),
}

/// Enrollment material handed back exactly once; nothing here is
/// retrievable in plain form after confirmation.
pub enum EnrollmentSecrets {
    Totp {
        secret_base32: Secret<String>,
        otpauth_uri: String,
    },
    RecoveryCodes {
        codes: Vec<String>,
    },
    SecurityKey {
        registration: Secret<String>,
    },
}

impl fmt::Debug for EnrollmentSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::Totp { .. } => "Totp",
            Self::RecoveryCodes { .. } => "RecoveryCodes",
            Self::SecurityKey { .. } => "SecurityKey",
        };
        write!(f, "EnrollmentSecrets::{variant}([REDACTED])")
    }
}

/// Enrolls, confirms, challenges, and revokes second-factor devices.
///
/// Account-level failure counting on bad codes is the orchestrator's job;
/// this component only reports `InvalidCode`.
pub struct MfaManager<D, A>
where
    D: MfaDeviceStore,
    A: AccountStore,
{
    devices: D,
    accounts: A,
    policy: SharedPolicy,
}

impl<D, A> MfaManager<D, A>
where
    D: MfaDeviceStore,
    A: AccountStore,
{
    pub fn new(devices: D, accounts: A, policy: SharedPolicy) -> Self {
        Self {
            devices,
            accounts,
            policy,
        }
    }

    /// Create a Pending device and return its enrollment material. The
    /// material leaves this method exactly once.
    #[tracing::instrument(name = "MfaManager::enroll", skip(self))]
    pub async fn enroll(
        &self,
        account_id: AccountId,
        kind: MfaKind,
    ) -> Result<(MfaDevice, EnrollmentSecrets), MfaError> {
        let policy = self.policy.load_full();
        let now = Utc::now();

        let (material, secrets) = match kind {
            MfaKind::Totp => {
                let account = self.accounts.get_account(account_id).await?;
                let label = account.primary_email().email.as_ref().expose_secret().clone();
                let (base32, uri) =
                    totp::generate_enrollment(&policy.totp_issuer, &label).map_err(MfaError::Totp)?;
                (
                    DeviceMaterial::Totp {
                        secret_base32: Secret::from(base32.clone()),
                    },
                    EnrollmentSecrets::Totp {
                        secret_base32: Secret::from(base32),
                        otpauth_uri: uri,
                    },
                )
            }
            MfaKind::RecoveryCodes => {
                let codes = recovery::generate_codes(policy.recovery_code_count);
                let code_hashes = codes.iter().map(|c| recovery::hash_code(c)).collect();
                (
                    DeviceMaterial::RecoveryCodes { code_hashes },
                    EnrollmentSecrets::RecoveryCodes { codes },
                )
            }
            MfaKind::SecurityKey => {
                let registration: String = rand::rng()
                    .sample_iter(Alphanumeric)
                    .take(43)
                    .map(char::from)
                    .collect();
                (
                    DeviceMaterial::SecurityKey {
                        assertion_hash: hash_assertion(&registration),
                    },
                    EnrollmentSecrets::SecurityKey {
                        registration: Secret::from(registration),
                    },
                )
            }
        };

        let device = MfaDevice::pending(account_id, material, now);
        self.devices.insert(device.clone()).await?;
        Ok((device, secrets))
    }

    /// Verify the submitted code against a Pending device; on success the
    /// device becomes Active and the account's MFA requirement is switched
    /// on explicitly.
    #[tracing::instrument(name = "MfaManager::confirm", skip(self, code))]
    pub async fn confirm(&self, device_id: DeviceId, code: &str) -> Result<(), MfaError> {
        let device = self.devices.get(device_id).await?;
        if device.status != MfaStatus::Pending {
            return Err(MfaError::DeviceNotPending);
        }

        self.verify_material(&device, code, ChallengeMode::Confirm)
            .await?;

        self.devices.set_status(device_id, MfaStatus::Active).await?;
        self.accounts
            .set_mfa_enabled(device.account_id, true)
            .await?;
        tracing::info!(account = %device.account_id, device = %device_id, "MFA device activated");
        Ok(())
    }

    /// Verify a login challenge against an Active device. Codes are
    /// single-use: TOTP time-steps are claimed, recovery codes consumed.
    #[tracing::instrument(name = "MfaManager::challenge", skip(self, code))]
    pub async fn challenge(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
        code: &str,
    ) -> Result<(), MfaError> {
        let device = self.devices.get(device_id).await?;
        if device.account_id != account_id {
            return Err(MfaError::WrongAccount);
        }
        if !device.is_active() {
            return Err(MfaError::DeviceNotActive);
        }

        self.verify_material(&device, code, ChallengeMode::Challenge)
            .await
    }

    /// Retire a device. Idempotent. When the last Active device goes, the
    /// account's MFA requirement is switched off explicitly, with a warning
    /// in the log.
    #[tracing::instrument(name = "MfaManager::revoke", skip(self))]
    pub async fn revoke(&self, device_id: DeviceId) -> Result<(), MfaError> {
        let device = self.devices.get(device_id).await?;
        if device.status == MfaStatus::Revoked {
            return Ok(());
        }
        self.devices.set_status(device_id, MfaStatus::Revoked).await?;

        let remaining = self.devices.list_for_account(device.account_id).await?;
        if !remaining.iter().any(MfaDevice::is_active) {
            self.accounts
                .set_mfa_enabled(device.account_id, false)
                .await?;
            tracing::warn!(
                account = %device.account_id,
                device = %device_id,
                "last active MFA device revoked; MFA requirement disabled"
            );
        }
        Ok(())
    }

    /// Material-free device listing for account-management surfaces.
    pub async fn list(&self, account_id: AccountId) -> Result<Vec<MfaDeviceSummary>, MfaError> {
        let devices = self.devices.list_for_account(account_id).await?;
        Ok(devices.iter().map(MfaDeviceSummary::from).collect())
    }

    /// Drop every device for an account, e.g. on account deletion.
    pub async fn purge(&self, account_id: AccountId) -> Result<(), MfaError> {
        self.devices.remove_for_account(account_id).await?;
        Ok(())
    }

    async fn verify_material(
        &self,
        device: &MfaDevice,
        code: &str,
        mode: ChallengeMode,
    ) -> Result<(), MfaError> {
        match &device.material {
            DeviceMaterial::Totp { secret_base32 } => {
                let policy = self.policy.load_full();
                let account = self.accounts.get_account(device.account_id).await?;
                let label = account.primary_email().email.as_ref().expose_secret().clone();
                let timestamp = Utc::now().timestamp() as u64;

                let valid = totp::verify(
                    secret_base32.expose_secret(),
                    code,
                    &policy.totp_issuer,
                    &label,
                    timestamp,
                )
                .map_err(MfaError::Totp)?;
                if !valid {
                    return Err(MfaError::InvalidCode);
                }

                // Claim the step in both modes so the confirmation code
                // cannot be replayed as the first login challenge.
                let claimed = self
                    .devices
                    .claim_totp_step(device.id, totp::current_step(timestamp))
                    .await?;
                if !claimed {
                    return Err(MfaError::InvalidCode);
                }
                Ok(())
            }
            DeviceMaterial::RecoveryCodes { code_hashes } => {
                let hash = recovery::hash_code(code);
                match mode {
                    // Confirmation proves possession without spending a code.
                    ChallengeMode::Confirm => {
                        if code_hashes.contains(&hash) {
                            Ok(())
                        } else {
                            Err(MfaError::InvalidCode)
                        }
                    }
                    ChallengeMode::Challenge => {
                        let consumed =
                            self.devices.consume_recovery_code(device.id, &hash).await?;
                        if consumed { Ok(()) } else { Err(MfaError::InvalidCode) }
                    }
                }
            }
            DeviceMaterial::SecurityKey { assertion_hash } => {
                if hash_assertion(code.trim()) == *assertion_hash {
                    Ok(())
                } else {
                    Err(MfaError::InvalidCode)
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ChallengeMode {
    Confirm,
    Challenge,
}

fn hash_assertion(assertion: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(assertion.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use chrono::{DateTime, Utc};
    use vestibule_core::{Account, Email, SecurityPolicy};

    use crate::shared_policy;

    #[derive(Clone, Default)]
    struct MockDeviceStore {
        devices: Arc<RwLock<HashMap<DeviceId, MfaDevice>>>,
    }

    #[async_trait::async_trait]
    impl MfaDeviceStore for MockDeviceStore {
        async fn insert(&self, device: MfaDevice) -> Result<(), MfaDeviceStoreError> {
            self.devices.write().await.insert(device.id, device);
            Ok(())
        }

        async fn get(&self, id: DeviceId) -> Result<MfaDevice, MfaDeviceStoreError> {
            self.devices
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or(MfaDeviceStoreError::DeviceNotFound)
        }

        async fn list_for_account(
            &self,
            id: AccountId,
        ) -> Result<Vec<MfaDevice>, MfaDeviceStoreError> {
            Ok(self
                .devices
                .read()
                .await
                .values()
                .filter(|d| d.account_id == id)
                .cloned()
                .collect())
        }

        async fn set_status(
            &self,
            id: DeviceId,
            status: MfaStatus,
        ) -> Result<(), MfaDeviceStoreError> {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(&id).ok_or(MfaDeviceStoreError::DeviceNotFound)?;
            if !device.status.may_become(status) {
                return Err(MfaDeviceStoreError::IllegalTransition);
            }
            device.status = status;
            Ok(())
        }

        async fn claim_totp_step(
            &self,
            id: DeviceId,
            step: u64,
        ) -> Result<bool, MfaDeviceStoreError> {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(&id).ok_or(MfaDeviceStoreError::DeviceNotFound)?;
            if device.last_used_step.is_some_and(|used| used >= step) {
                return Ok(false);
            }
            device.last_used_step = Some(step);
            Ok(true)
        }

        async fn consume_recovery_code(
            &self,
            id: DeviceId,
            code_hash: &str,
        ) -> Result<bool, MfaDeviceStoreError> {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(&id).ok_or(MfaDeviceStoreError::DeviceNotFound)?;
            let DeviceMaterial::RecoveryCodes { code_hashes } = &mut device.material else {
                return Ok(false);
            };
            let before = code_hashes.len();
            code_hashes.retain(|h| h != code_hash);
            Ok(code_hashes.len() < before)
        }

        async fn remove_for_account(&self, id: AccountId) -> Result<(), MfaDeviceStoreError> {
            self.devices.write().await.retain(|_, d| d.account_id != id);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockAccountStore {
        accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    }

    #[async_trait::async_trait]
    impl AccountStore for MockAccountStore {
        async fn add_account(&self, account: Account) -> Result<(), AccountStoreError> {
            self.accounts.write().await.insert(account.id, account);
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

        async fn find_by_email(&self, _email: &Email) -> Result<Account, AccountStoreError> {
            unimplemented!()
        }

        async fn add_email(&self, _id: AccountId, _email: Email) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn mark_email_verified(
            &self,
            _id: AccountId,
            _email: &Email,
        ) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn set_primary_email(
            &self,
            _id: AccountId,
            _email: &Email,
        ) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn remove_email(
            &self,
            _id: AccountId,
            _email: &Email,
        ) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn set_locked_until(
            &self,
            _id: AccountId,
            _until: Option<DateTime<Utc>>,
        ) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn set_mfa_enabled(
            &self,
            id: AccountId,
            enabled: bool,
        ) -> Result<(), AccountStoreError> {
            let mut accounts = self.accounts.write().await;
            let account = accounts.get_mut(&id).ok_or(AccountStoreError::AccountNotFound)?;
            account.mfa_enabled = enabled;
            Ok(())
        }

        async fn set_password_set_at(
            &self,
            _id: AccountId,
            _at: DateTime<Utc>,
        ) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn delete_account(&self, _id: AccountId) -> Result<(), AccountStoreError> {
            unimplemented!()
        }
    }

    use secrecy::Secret as SecretString;

    fn email(raw: &str) -> Email {
        Email::try_from(SecretString::from(raw.to_string())).unwrap()
    }

    async fn manager_with_account()
    -> (MfaManager<MockDeviceStore, MockAccountStore>, MockAccountStore, AccountId) {
        let accounts = MockAccountStore::default();
        let account = Account::new(email("mfa@example.com"), Utc::now());
        let id = account.id;
        accounts.add_account(account).await.unwrap();

        let manager = MfaManager::new(
            MockDeviceStore::default(),
            accounts.clone(),
            shared_policy(SecurityPolicy::default()),
        );
        (manager, accounts, id)
    }

    fn totp_secret(secrets: &EnrollmentSecrets) -> String {
        match secrets {
            EnrollmentSecrets::Totp { secret_base32, .. } => {
                secret_base32.expose_secret().clone()
            }
            _ => panic!("expected TOTP enrollment"),
        }
    }

    #[tokio::test]
    async fn totp_enrollment_starts_pending() {
        let (manager, accounts, id) = manager_with_account().await;
        let (device, _) = manager.enroll(id, MfaKind::Totp).await.unwrap();
        assert_eq!(device.status, MfaStatus::Pending);
        assert!(!accounts.get_account(id).await.unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn confirm_activates_and_enables_mfa() {
        let (manager, accounts, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::Totp).await.unwrap();

        let now = Utc::now().timestamp() as u64;
        let code = totp::generate(&totp_secret(&secrets), now).unwrap();
        manager.confirm(device.id, &code).await.unwrap();

        assert!(accounts.get_account(id).await.unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn confirm_rejects_bad_code() {
        let (manager, _, id) = manager_with_account().await;
        let (device, _) = manager.enroll(id, MfaKind::Totp).await.unwrap();
        let result = manager.confirm(device.id, "000000").await;
        assert!(matches!(result, Err(MfaError::InvalidCode)));
    }

    #[tokio::test]
    async fn challenge_requires_an_active_device() {
        let (manager, _, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::Totp).await.unwrap();
        let now = Utc::now().timestamp() as u64;
        let code = totp::generate(&totp_secret(&secrets), now).unwrap();

        let result = manager.challenge(id, device.id, &code).await;
        assert!(matches!(result, Err(MfaError::DeviceNotActive)));
    }

    #[tokio::test]
    async fn totp_code_never_verifies_twice_in_one_step() {
        let (manager, _, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::Totp).await.unwrap();
        let secret = totp_secret(&secrets);

        let now = Utc::now().timestamp() as u64;
        manager
            .confirm(device.id, &totp::generate(&secret, now).unwrap())
            .await
            .unwrap();

        // The confirmation claimed this step; replaying the same code as a
        // login challenge must fail.
        let replayed = manager
            .challenge(id, device.id, &totp::generate(&secret, now).unwrap())
            .await;
        assert!(matches!(replayed, Err(MfaError::InvalidCode)));
    }

    #[tokio::test]
    async fn recovery_code_confirm_does_not_consume() {
        let (manager, _, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::RecoveryCodes).await.unwrap();
        let EnrollmentSecrets::RecoveryCodes { codes } = secrets else {
            panic!("expected recovery codes");
        };

        manager.confirm(device.id, &codes[0]).await.unwrap();
        // The same code still works as a real challenge afterwards.
        manager.challenge(id, device.id, &codes[0]).await.unwrap();
    }

    #[tokio::test]
    async fn recovery_code_challenge_consumes() {
        let (manager, _, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::RecoveryCodes).await.unwrap();
        let EnrollmentSecrets::RecoveryCodes { codes } = secrets else {
            panic!("expected recovery codes");
        };

        manager.confirm(device.id, &codes[1]).await.unwrap();
        manager.challenge(id, device.id, &codes[2]).await.unwrap();
        let replayed = manager.challenge(id, device.id, &codes[2]).await;
        assert!(matches!(replayed, Err(MfaError::InvalidCode)));
    }

    #[tokio::test]
    async fn security_key_confirms_with_registration_material() {
        let (manager, _, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::SecurityKey).await.unwrap();
        let EnrollmentSecrets::SecurityKey { registration } = secrets else {
            panic!("expected security key");
        };

        manager
            .confirm(device.id, registration.expose_secret())
            .await
            .unwrap();
        manager
            .challenge(id, device.id, registration.expose_secret())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn challenge_rejects_foreign_account() {
        let (manager, accounts, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::SecurityKey).await.unwrap();
        let EnrollmentSecrets::SecurityKey { registration } = secrets else {
            panic!("expected security key");
        };
        manager.confirm(device.id, registration.expose_secret()).await.unwrap();

        let other = Account::new(email("other@example.com"), Utc::now());
        let other_id = other.id;
        accounts.add_account(other).await.unwrap();

        let result = manager
            .challenge(other_id, device.id, registration.expose_secret())
            .await;
        assert!(matches!(result, Err(MfaError::WrongAccount)));
    }

    #[tokio::test]
    async fn revoking_last_active_device_disables_mfa() {
        let (manager, accounts, id) = manager_with_account().await;
        let (device, secrets) = manager.enroll(id, MfaKind::SecurityKey).await.unwrap();
        let EnrollmentSecrets::SecurityKey { registration } = secrets else {
            panic!("expected security key");
        };
        manager.confirm(device.id, registration.expose_secret()).await.unwrap();
        assert!(accounts.get_account(id).await.unwrap().mfa_enabled);

        manager.revoke(device.id).await.unwrap();
        assert!(!accounts.get_account(id).await.unwrap().mfa_enabled);

        // Idempotent.
        manager.revoke(device.id).await.unwrap();

        // A revoked device never satisfies a challenge, even with the right
        // material.
        let result = manager
            .challenge(id, device.id, registration.expose_secret())
            .await;
        assert!(matches!(result, Err(MfaError::DeviceNotActive)));
    }

    #[tokio::test]
    async fn revoking_one_of_two_active_devices_keeps_mfa_on() {
        let (manager, accounts, id) = manager_with_account().await;

        let (first, first_secrets) = manager.enroll(id, MfaKind::SecurityKey).await.unwrap();
        let EnrollmentSecrets::SecurityKey { registration } = first_secrets else {
            panic!("expected security key");
        };
        manager.confirm(first.id, registration.expose_secret()).await.unwrap();

        let (second, second_secrets) = manager.enroll(id, MfaKind::SecurityKey).await.unwrap();
        let EnrollmentSecrets::SecurityKey { registration } = second_secrets else {
            panic!("expected security key");
        };
        manager.confirm(second.id, registration.expose_secret()).await.unwrap();

        manager.revoke(first.id).await.unwrap();
        assert!(accounts.get_account(id).await.unwrap().mfa_enabled);
    }
}
