//! # Vestibule - Account Security Lifecycle Library
//!
//! This is a facade crate that re-exports all public APIs from the lifecycle
//! components. Use this crate to get access to the whole account security
//! lifecycle in one place.
//!
//! ## Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! vestibule = { path = "../vestibule" }
//! ```
//!
//! ## Structure
//!
//! - **Core domain types**: `Email`, `Password`, `Account`, `Session`, etc.
//! - **Port traits**: `AccountStore`, `TokenStore`, `SessionStore`,
//!   `MfaDeviceStore`, `FailureWindowStore`, `CredentialStore`,
//!   `NotificationDispatcher`
//! - **Components**: `TokenService`, `LockoutGuard`, `MfaManager`,
//!   `SessionRegistry`
//! - **Adapters**: in-memory stores, `Argon2CredentialStore`, notification
//!   dispatchers, settings loader
//! - **Service**: `AuthenticationService` - the orchestrator and main entry
//!   point

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and value objects
pub mod core {
    pub use vestibule_core::*;
}

// Re-export most commonly used core types at the root level
pub use vestibule_core::{
    Account, AccountId, DeviceId, DeviceInfo, Email, EmailAddress, EmailError, LoginFlags,
    LoginStep, MfaAttemptId, MfaDevice, MfaDeviceSummary, MfaKind, MfaStatus, Password,
    PasswordError, SecurityPolicy, Session, SessionId, TokenPurpose, TokenValue,
    VerificationToken, next_step,
};

// ============================================================================
// Port Traits
// ============================================================================

/// Port trait definitions
pub mod ports {
    pub use vestibule_core::{
        AccountStore, AccountStoreError, CredentialStore, CredentialStoreError,
        FailureWindowStore, FailureWindowStoreError, MfaDeviceStore, MfaDeviceStoreError,
        NotificationDispatcher, SessionStore, SessionStoreError, TokenStore, TokenStoreError,
    };
}

// Re-export port traits at root level
pub use vestibule_core::{
    AccountStore, AccountStoreError, CredentialStore, CredentialStoreError, FailureWindowStore,
    FailureWindowStoreError, MfaDeviceStore, MfaDeviceStoreError, NotificationDispatcher,
    SessionStore, SessionStoreError, TokenStore, TokenStoreError,
};

// ============================================================================
// Components (Application Layer)
// ============================================================================

/// Lifecycle components
pub mod components {
    pub use vestibule_application::*;
}

// Re-export components at root level
pub use vestibule_application::{
    EnrollmentSecrets, LockoutError, LockoutGuard, MfaError, MfaManager, SessionRegistry,
    SharedPolicy, TokenService, shared_policy,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Persistence implementations
    pub mod persistence {
        pub use vestibule_adapters::persistence::*;
    }

    /// Credential store implementations
    pub mod credentials {
        pub use vestibule_adapters::credentials::*;
    }

    /// Notification dispatchers
    pub mod notifications {
        pub use vestibule_adapters::notifications::*;
    }

    /// Configuration
    pub mod config {
        pub use vestibule_adapters::config::*;
    }
}

// Re-export commonly used adapters at root level
pub use vestibule_adapters::{
    Argon2CredentialStore, MemoryAccountStore, MemoryFailureWindowStore, MemoryMfaDeviceStore,
    MemorySessionStore, MemoryTokenStore, MockNotificationDispatcher, RecordingDispatcher,
    SpawningDispatcher, VestibuleSettings,
};

// ============================================================================
// Authentication Service (Main Entry Point)
// ============================================================================

pub use vestibule_auth_service::{AuthError, AuthenticationService, LoginOutcome};

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing port traits
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};

/// Re-export chrono since timestamps and TTLs appear throughout the API
pub use chrono;
