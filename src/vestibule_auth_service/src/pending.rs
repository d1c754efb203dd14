use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use vestibule_core::{AccountId, DeviceInfo, MfaAttemptId};

/// A login parked between credential success and a completed second-factor
/// challenge. No session exists yet.
#[derive(Debug, Clone)]
pub(crate) struct PendingLogin {
    pub account_id: AccountId,
    pub device: DeviceInfo,
    pub expires_at: DateTime<Utc>,
}

/// In-process ledger of pending-MFA logins. Handles are ephemeral by
/// design: short-lived, never persisted, gone on restart (the user just
/// logs in again).
#[derive(Default)]
pub(crate) struct PendingMfaLedger {
    attempts: DashMap<MfaAttemptId, PendingLogin>,
}

impl PendingMfaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account_id: AccountId, device: DeviceInfo, ttl: Duration) -> MfaAttemptId {
        let now = Utc::now();
        self.reap(now);

        let attempt_id = MfaAttemptId::new();
        self.attempts.insert(
            attempt_id,
            PendingLogin {
                account_id,
                device,
                expires_at: now + ttl,
            },
        );
        attempt_id
    }

    /// Look at a live handle without claiming it; an expired handle is
    /// dropped and reads as absent.
    pub fn peek(&self, attempt_id: MfaAttemptId, now: DateTime<Utc>) -> Option<PendingLogin> {
        let pending = {
            let entry = self.attempts.get(&attempt_id)?;
            entry.value().clone()
        };
        if now > pending.expires_at {
            drop(self.attempts.remove(&attempt_id));
            return None;
        }
        Some(pending)
    }

    /// Claim a handle. Remove-on-take: of two racing completions, exactly
    /// one gets the login.
    pub fn complete(&self, attempt_id: MfaAttemptId, now: DateTime<Utc>) -> Option<PendingLogin> {
        let (_, pending) = self.attempts.remove(&attempt_id)?;
        if now > pending.expires_at {
            return None;
        }
        Some(pending)
    }

    fn reap(&self, now: DateTime<Utc>) {
        self.attempts.retain(|_, pending| now <= pending.expires_at);
    }
}
