pub mod lockout_guard;
pub mod mfa_manager;
pub mod recovery;
pub mod session_registry;
pub mod token_service;
pub mod totp;

use std::sync::Arc;

use arc_swap::ArcSwap;
use vestibule_core::SecurityPolicy;

/// Policy handle shared by every component; swapping it takes effect on the
/// next operation without restarting anything.
pub type SharedPolicy = Arc<ArcSwap<SecurityPolicy>>;

pub fn shared_policy(policy: SecurityPolicy) -> SharedPolicy {
    Arc::new(ArcSwap::from_pointee(policy))
}

pub use lockout_guard::{LockoutError, LockoutGuard};
pub use mfa_manager::{EnrollmentSecrets, MfaError, MfaManager};
pub use session_registry::SessionRegistry;
pub use token_service::TokenService;
