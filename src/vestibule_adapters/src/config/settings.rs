use config::{Config, ConfigError, Environment, File};
use vestibule_core::SecurityPolicy;

/// How notification links are built and how hard the spawning dispatcher
/// tries before giving up.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Base URL token links are anchored on.
    pub link_base: String,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            link_base: "http://localhost:8000/account".into(),
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

/// Layered settings: an optional `vestibule.{toml,json,...}` file, overridden
/// by `VESTIBULE__`-prefixed environment variables
/// (e.g. `VESTIBULE__POLICY__LOCKOUT_THRESHOLD=3`).
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct VestibuleSettings {
    pub policy: SecurityPolicy,
    pub notification: NotificationSettings,
}

impl VestibuleSettings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(File::with_name("vestibule").required(false))
            .add_source(
                Environment::with_prefix("VESTIBULE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_stand_alone() {
        let settings = VestibuleSettings::default();
        assert_eq!(settings.policy, SecurityPolicy::default());
        assert_eq!(settings.notification.max_attempts, 3);
    }

    #[test]
    fn file_source_overrides_defaults() {
        let settings: VestibuleSettings = Config::builder()
            .add_source(File::from_str(
                r#"{
                    "policy": { "lockout_threshold": 3, "totp_issuer": "Example" },
                    "notification": { "link_base": "https://example.com/a" }
                }"#,
                FileFormat::Json,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.policy.lockout_threshold, 3);
        assert_eq!(settings.policy.totp_issuer, "Example");
        // Untouched knobs keep their defaults.
        assert_eq!(settings.policy.recovery_code_count, 10);
        assert_eq!(settings.notification.link_base, "https://example.com/a");
        assert_eq!(settings.notification.retry_backoff_ms, 500);
    }
}
