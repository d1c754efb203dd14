use std::sync::Arc;

use dashmap::DashMap;
use vestibule_core::{
    AccountId, DeviceId, DeviceMaterial, MfaDevice, MfaDeviceStore, MfaDeviceStoreError, MfaStatus,
};

/// In-memory device store, sharded per account. The step-claim and
/// code-consume methods are the check-and-set points that keep challenge
/// verification race-free.
#[derive(Default, Clone)]
pub struct MemoryMfaDeviceStore {
    by_account: Arc<DashMap<AccountId, Vec<MfaDevice>>>,
    index: Arc<DashMap<DeviceId, AccountId>>,
}

impl MemoryMfaDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_of(&self, id: DeviceId) -> Result<AccountId, MfaDeviceStoreError> {
        self.index
            .get(&id)
            .map(|entry| *entry.value())
            .ok_or(MfaDeviceStoreError::DeviceNotFound)
    }

    fn with_device<R>(
        &self,
        id: DeviceId,
        f: impl FnOnce(&mut MfaDevice) -> Result<R, MfaDeviceStoreError>,
    ) -> Result<R, MfaDeviceStoreError> {
        let account_id = self.owner_of(id)?;
        let mut devices = self
            .by_account
            .get_mut(&account_id)
            .ok_or(MfaDeviceStoreError::DeviceNotFound)?;
        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(MfaDeviceStoreError::DeviceNotFound)?;
        f(device)
    }
}

#[async_trait::async_trait]
impl MfaDeviceStore for MemoryMfaDeviceStore {
    async fn insert(&self, device: MfaDevice) -> Result<(), MfaDeviceStoreError> {
        let mut entry = self.by_account.entry(device.account_id).or_default();
        self.index.insert(device.id, device.account_id);
        entry.push(device);
        Ok(())
    }

    async fn get(&self, id: DeviceId) -> Result<MfaDevice, MfaDeviceStoreError> {
        let account_id = self.owner_of(id)?;
        let devices = self
            .by_account
            .get(&account_id)
            .ok_or(MfaDeviceStoreError::DeviceNotFound)?;
        devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(MfaDeviceStoreError::DeviceNotFound)
    }

    async fn list_for_account(
        &self,
        id: AccountId,
    ) -> Result<Vec<MfaDevice>, MfaDeviceStoreError> {
        Ok(self
            .by_account
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn set_status(
        &self,
        id: DeviceId,
        status: MfaStatus,
    ) -> Result<(), MfaDeviceStoreError> {
        self.with_device(id, |device| {
            if !device.status.may_become(status) {
                return Err(MfaDeviceStoreError::IllegalTransition);
            }
            device.status = status;
            Ok(())
        })
    }

    async fn claim_totp_step(&self, id: DeviceId, step: u64) -> Result<bool, MfaDeviceStoreError> {
        self.with_device(id, |device| {
            // Steps only move forward; a replay inside an already-claimed
            // step loses here.
            if device.last_used_step.is_some_and(|used| used >= step) {
                return Ok(false);
            }
            device.last_used_step = Some(step);
            Ok(true)
        })
    }

    async fn consume_recovery_code(
        &self,
        id: DeviceId,
        code_hash: &str,
    ) -> Result<bool, MfaDeviceStoreError> {
        self.with_device(id, |device| {
            let DeviceMaterial::RecoveryCodes { code_hashes } = &mut device.material else {
                return Ok(false);
            };
            let before = code_hashes.len();
            code_hashes.retain(|h| h != code_hash);
            Ok(code_hashes.len() < before)
        })
    }

    async fn remove_for_account(&self, id: AccountId) -> Result<(), MfaDeviceStoreError> {
        if let Some((_, devices)) = self.by_account.remove(&id) {
            for device in devices {
                self.index.remove(&device.id);
            }
        }
        Ok(())
    }
}
