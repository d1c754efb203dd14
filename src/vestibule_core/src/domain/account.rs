use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::email::Email;
use crate::domain::login_flow::LoginFlags;

/// Opaque account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One address attached to an account. Exactly one entry per account is
/// `primary`; addresses are unique across all accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailAddress {
    pub email: Email,
    pub verified: bool,
    pub primary: bool,
}

impl EmailAddress {
    pub fn primary_unverified(email: Email) -> Self {
        Self {
            email,
            verified: false,
            primary: true,
        }
    }

    pub fn secondary_unverified(email: Email) -> Self {
        Self {
            email,
            verified: false,
            primary: false,
        }
    }
}

/// The per-account security record.
///
/// The password hash itself lives behind the `CredentialStore` port; the
/// account only remembers when it was last set. `mfa_enabled` is an explicit
/// flag flipped by the MFA device lifecycle, never inferred from device
/// queries.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub emails: Vec<EmailAddress>,
    pub password_set_at: DateTime<Utc>,
    pub locked_until: Option<DateTime<Utc>>,
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A fresh account with a single unverified primary address.
    pub fn new(email: Email, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            emails: vec![EmailAddress::primary_unverified(email)],
            password_set_at: now,
            locked_until: None,
            mfa_enabled: false,
            created_at: now,
        }
    }

    pub fn primary_email(&self) -> &EmailAddress {
        self.emails
            .iter()
            .find(|entry| entry.primary)
            .expect("account invariant: exactly one primary email")
    }

    pub fn email_entry(&self, email: &Email) -> Option<&EmailAddress> {
        self.emails.iter().find(|entry| &entry.email == email)
    }

    pub fn has_email(&self, email: &Email) -> bool {
        self.email_entry(email).is_some()
    }

    /// Whether the account is locked at `now`. An expired lock counts as
    /// absent.
    pub fn locked_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.locked_until.filter(|until| *until > now)
    }

    /// The flags the login state machine derives its next step from.
    pub fn login_flags(&self) -> LoginFlags {
        LoginFlags {
            primary_email_verified: self.primary_email().verified,
            mfa_enabled: self.mfa_enabled,
        }
    }
}
