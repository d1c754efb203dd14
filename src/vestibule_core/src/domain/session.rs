use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::account::AccountId;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Client descriptor recorded when a session is created, shown back to the
/// user when enumerating active sessions.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceInfo {
    /// Human-readable client label, e.g. "Firefox on Linux".
    pub client: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl DeviceInfo {
    pub fn labeled(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            ..Self::default()
        }
    }
}

/// One authenticated session. Revocation is irreversible.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub device: DeviceInfo,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Session {
    pub fn open(account_id: AccountId, device: DeviceInfo, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            account_id,
            device,
            created_at: now,
            last_seen_at: now,
            revoked: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.revoked
    }
}
