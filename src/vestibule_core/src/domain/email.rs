use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

// Deliberately loose: one '@', no whitespace, a dot in the domain part.
// Deliverability is the notification dispatcher's problem.
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Error, PartialEq)]
pub enum EmailError {
    #[error("Invalid email address")]
    Invalid,
}

/// A validated, normalized (trimmed, lowercased) email address.
///
/// Wrapped in [`Secret`] so it never leaks through `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Email(Secret<String>);

impl Email {
    pub fn as_ref(&self) -> &Secret<String> {
        &self.0
    }
}

impl TryFrom<Secret<String>> for Email {
    type Error = EmailError;

    fn try_from(value: Secret<String>) -> Result<Self, Self::Error> {
        let normalized = value.expose_secret().trim().to_lowercase();
        if !EMAIL_REGEX.is_match(&normalized) {
            return Err(EmailError::Invalid);
        }
        Ok(Self(Secret::from(normalized)))
    }
}

impl PartialEq for Email {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl Eq for Email {}

impl Hash for Email {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.expose_secret().hash(state);
    }
}

impl fmt::Display for Email {
    /// Redacted form for spans and error messages: `a***@example.com`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self.0.expose_secret();
        match address.split_once('@') {
            Some((local, domain)) => {
                let head = local.chars().next().unwrap_or('*');
                write!(f, "{head}***@{domain}")
            }
            None => write!(f, "***"),
        }
    }
}
