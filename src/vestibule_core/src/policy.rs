use chrono::Duration;

/// Tunable security policy for the whole lifecycle. Plain data; loaded from
/// layered settings by the adapters crate, swappable at runtime by the
/// service.
///
/// Durations are stored as integer seconds so the struct deserializes
/// directly from flat config sources.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Failed attempts within the window that trigger a lockout.
    pub lockout_threshold: u32,
    /// Length of the sliding failure window, in seconds.
    pub failure_window_secs: u64,
    /// How long a triggered lockout lasts, in seconds.
    pub lockout_duration_secs: u64,
    /// Email-verification token lifetime, in seconds.
    pub email_verify_ttl_secs: u64,
    /// Password-reset token lifetime, in seconds.
    pub password_reset_ttl_secs: u64,
    /// How long a pending-MFA login handle stays valid, in seconds.
    pub mfa_attempt_ttl_secs: u64,
    /// Issuer label shown in authenticator apps.
    pub totp_issuer: String,
    /// Codes generated per recovery-code device.
    pub recovery_code_count: usize,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
            failure_window_secs: 15 * 60,
            lockout_duration_secs: 15 * 60,
            email_verify_ttl_secs: 24 * 60 * 60,
            password_reset_ttl_secs: 60 * 60,
            mfa_attempt_ttl_secs: 5 * 60,
            totp_issuer: "Vestibule".into(),
            recovery_code_count: 10,
        }
    }
}

impl SecurityPolicy {
    pub fn failure_window(&self) -> Duration {
        Duration::seconds(self.failure_window_secs as i64)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(self.lockout_duration_secs as i64)
    }

    pub fn email_verify_ttl(&self) -> Duration {
        Duration::seconds(self.email_verify_ttl_secs as i64)
    }

    pub fn password_reset_ttl(&self) -> Duration {
        Duration::seconds(self.password_reset_ttl_secs as i64)
    }

    pub fn mfa_attempt_ttl(&self) -> Duration {
        Duration::seconds(self.mfa_attempt_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let policy = SecurityPolicy::default();
        assert_eq!(policy.lockout_threshold, 5);
        assert_eq!(policy.failure_window(), Duration::minutes(15));
        assert_eq!(policy.password_reset_ttl(), Duration::hours(1));
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let policy: SecurityPolicy =
            serde_json::from_str(r#"{"lockout_threshold": 3}"#).unwrap();
        assert_eq!(policy.lockout_threshold, 3);
        assert_eq!(policy.recovery_code_count, 10);
    }
}
