pub mod domain;
pub mod policy;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    account::{Account, AccountId, EmailAddress},
    email::{Email, EmailError},
    failure::FailureWindow,
    login_flow::{LoginFlags, LoginStep, MfaAttemptId, next_step},
    mfa::{DeviceId, DeviceMaterial, MfaDevice, MfaDeviceSummary, MfaKind, MfaStatus},
    password::{Password, PasswordError},
    session::{DeviceInfo, Session, SessionId},
    token::{TokenPurpose, TokenValue, VerificationToken},
};

pub use policy::SecurityPolicy;

pub use ports::{
    repositories::{
        AccountStore, AccountStoreError, FailureWindowStore, FailureWindowStoreError,
        MfaDeviceStore, MfaDeviceStoreError, SessionStore, SessionStoreError, TokenStore,
        TokenStoreError,
    },
    services::{CredentialStore, CredentialStoreError, NotificationDispatcher},
};
