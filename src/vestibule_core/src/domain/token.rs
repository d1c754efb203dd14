use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::domain::account::AccountId;
use crate::domain::email::Email;

/// What a verification token is allowed to do, encoded server-side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerify,
    PasswordReset,
}

impl TokenPurpose {
    /// URL path segment used when building notification links.
    pub fn link_segment(&self) -> &'static str {
        match self {
            Self::EmailVerify => "verify-email",
            Self::PasswordReset => "reset-password",
        }
    }
}

/// An unguessable opaque token value: 32 random bytes, base64url, no
/// padding. Carries no semantic content; everything about it is looked up
/// server-side.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenValue(String);

impl TokenValue {
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::rng().random();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TokenValue {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for TokenValue {
    // Token values are bearer secrets; never print them.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenValue([REDACTED])")
    }
}

/// A single-use, expiring token bound to one account, one address, and one
/// purpose. `consumed` is monotonic: false to true, never back.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationToken {
    pub value: TokenValue,
    pub account_id: AccountId,
    /// The address this token verifies (EmailVerify) or was delivered to
    /// (PasswordReset).
    pub email: Email,
    pub purpose: TokenPurpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl VerificationToken {
    pub fn issue(
        account_id: AccountId,
        email: Email,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            value: TokenValue::generate(),
            account_id,
            email,
            purpose,
            issued_at: now,
            expires_at: now + ttl,
            consumed: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
