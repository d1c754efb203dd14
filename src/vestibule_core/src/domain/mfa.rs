use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::Secret;
use uuid::Uuid;

use crate::domain::account::AccountId;

/// Opaque MFA device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaKind {
    Totp,
    RecoveryCodes,
    SecurityKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaStatus {
    Pending,
    Active,
    Revoked,
}

impl MfaStatus {
    /// Legal transitions: Pending -> Active, anything -> Revoked. A revoked
    /// or active device never returns to Pending.
    pub fn may_become(self, next: MfaStatus) -> bool {
        matches!(
            (self, next),
            (MfaStatus::Pending, MfaStatus::Active) | (_, MfaStatus::Revoked)
        )
    }
}

/// Secret material held per device. The TOTP secret must stay recoverable
/// to verify codes; recovery codes and security-key assertions are stored
/// hashed and compared by hash.
#[derive(Debug, Clone)]
pub enum DeviceMaterial {
    Totp { secret_base32: Secret<String> },
    RecoveryCodes { code_hashes: Vec<String> },
    SecurityKey { assertion_hash: String },
}

impl DeviceMaterial {
    pub fn kind(&self) -> MfaKind {
        match self {
            Self::Totp { .. } => MfaKind::Totp,
            Self::RecoveryCodes { .. } => MfaKind::RecoveryCodes,
            Self::SecurityKey { .. } => MfaKind::SecurityKey,
        }
    }
}

/// One enrolled (or enrolling, or retired) second-factor device.
#[derive(Debug, Clone)]
pub struct MfaDevice {
    pub id: DeviceId,
    pub account_id: AccountId,
    pub kind: MfaKind,
    pub status: MfaStatus,
    pub material: DeviceMaterial,
    /// Last accepted TOTP time-step, for replay suppression.
    pub last_used_step: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Material-free view of a device, safe to hand to transports and UIs.
/// Secret material never leaves the store after enrollment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MfaDeviceSummary {
    pub id: DeviceId,
    pub kind: MfaKind,
    pub status: MfaStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&MfaDevice> for MfaDeviceSummary {
    fn from(device: &MfaDevice) -> Self {
        Self {
            id: device.id,
            kind: device.kind,
            status: device.status,
            created_at: device.created_at,
        }
    }
}

impl MfaDevice {
    pub fn pending(account_id: AccountId, material: DeviceMaterial, now: DateTime<Utc>) -> Self {
        Self {
            id: DeviceId::new(),
            account_id,
            kind: material.kind(),
            status: MfaStatus::Pending,
            material,
            last_used_step: None,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MfaStatus::Active
    }
}
