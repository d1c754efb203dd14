use std::fmt;

use uuid::Uuid;

/// Identifier for a login attempt parked between credential success and a
/// completed second-factor challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MfaAttemptId(Uuid);

impl MfaAttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MfaAttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MfaAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account flags the next-step derivation reads. Snapshotted from the
/// account record at credential-check time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginFlags {
    pub primary_email_verified: bool,
    pub mfa_enabled: bool,
}

/// What a login attempt still needs after credentials checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Denied until the primary address is verified; offer a re-send.
    EmailUnverified,
    /// A second factor stands between credentials and a session.
    MfaRequired,
    /// Nothing left; create the session.
    Authenticated,
}

/// Derive the next required step for an attempt whose credentials already
/// checked out. Pure: account flags in, step out, no state of its own.
/// Lockout and credential failures are handled before this runs.
pub fn next_step(flags: LoginFlags, mfa_completed: bool) -> LoginStep {
    if !flags.primary_email_verified {
        return LoginStep::EmailUnverified;
    }
    if flags.mfa_enabled && !mfa_completed {
        return LoginStep::MfaRequired;
    }
    LoginStep::Authenticated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(primary_email_verified: bool, mfa_enabled: bool) -> LoginFlags {
        LoginFlags {
            primary_email_verified,
            mfa_enabled,
        }
    }

    #[test]
    fn unverified_email_blocks_before_mfa() {
        assert_eq!(next_step(flags(false, true), false), LoginStep::EmailUnverified);
        assert_eq!(next_step(flags(false, false), false), LoginStep::EmailUnverified);
    }

    #[test]
    fn mfa_gates_until_completed() {
        assert_eq!(next_step(flags(true, true), false), LoginStep::MfaRequired);
        assert_eq!(next_step(flags(true, true), true), LoginStep::Authenticated);
    }

    #[test]
    fn plain_account_authenticates() {
        assert_eq!(next_step(flags(true, false), false), LoginStep::Authenticated);
    }

    #[test]
    fn completed_mfa_never_unblocks_unverified_email() {
        assert_eq!(next_step(flags(false, true), true), LoginStep::EmailUnverified);
    }
}
