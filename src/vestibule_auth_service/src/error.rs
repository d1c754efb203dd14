use chrono::{DateTime, Utc};
use vestibule_application::{LockoutError, MfaError};
use vestibule_core::{
    AccountStoreError, CredentialStoreError, MfaDeviceStoreError, SessionStoreError,
    TokenStoreError,
};

/// Error taxonomy for the whole authentication surface. Everything a caller
/// can act on is a distinct variant; persistence failures collapse into
/// `Storage`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account locked until {0}")]
    AccountLocked(DateTime<Utc>),
    #[error("Email not verified")]
    EmailNotVerified,
    #[error("Email already in use")]
    DuplicateEmail,
    #[error("Email not found on account")]
    EmailNotFound,
    #[error("Primary email cannot be removed")]
    PrimaryEmailImmovable,
    #[error("Token not found")]
    TokenNotFound,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token already used")]
    TokenAlreadyUsed,
    #[error("Invalid MFA code")]
    MfaInvalidCode,
    #[error("MFA device unavailable")]
    MfaDeviceUnavailable,
    #[error("Login attempt expired")]
    LoginAttemptExpired,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PartialEq for AuthError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::AccountLocked(a), Self::AccountLocked(b)) => a == b,
            (Self::EmailNotVerified, Self::EmailNotVerified) => true,
            (Self::DuplicateEmail, Self::DuplicateEmail) => true,
            (Self::EmailNotFound, Self::EmailNotFound) => true,
            (Self::PrimaryEmailImmovable, Self::PrimaryEmailImmovable) => true,
            (Self::TokenNotFound, Self::TokenNotFound) => true,
            (Self::TokenExpired, Self::TokenExpired) => true,
            (Self::TokenAlreadyUsed, Self::TokenAlreadyUsed) => true,
            (Self::MfaInvalidCode, Self::MfaInvalidCode) => true,
            (Self::MfaDeviceUnavailable, Self::MfaDeviceUnavailable) => true,
            (Self::LoginAttemptExpired, Self::LoginAttemptExpired) => true,
            (Self::SessionNotFound, Self::SessionNotFound) => true,
            (Self::Storage(_), Self::Storage(_)) => true,
            _ => false,
        }
    }
}

impl From<AccountStoreError> for AuthError {
    fn from(err: AccountStoreError) -> Self {
        match err {
            AccountStoreError::DuplicateEmail => Self::DuplicateEmail,
            AccountStoreError::EmailNotFound => Self::EmailNotFound,
            AccountStoreError::PrimaryEmailImmovable => Self::PrimaryEmailImmovable,
            AccountStoreError::AccountNotFound => Self::Storage("account not found".into()),
            AccountStoreError::UnexpectedError(msg) => Self::Storage(msg),
        }
    }
}

impl From<TokenStoreError> for AuthError {
    fn from(err: TokenStoreError) -> Self {
        match err {
            TokenStoreError::TokenNotFound => Self::TokenNotFound,
            TokenStoreError::TokenExpired => Self::TokenExpired,
            TokenStoreError::TokenAlreadyUsed => Self::TokenAlreadyUsed,
            TokenStoreError::UnexpectedError(msg) => Self::Storage(msg),
        }
    }
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::SessionNotFound => Self::SessionNotFound,
            SessionStoreError::UnexpectedError(msg) => Self::Storage(msg),
        }
    }
}

impl From<CredentialStoreError> for AuthError {
    fn from(err: CredentialStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<LockoutError> for AuthError {
    fn from(err: LockoutError) -> Self {
        match err {
            LockoutError::Locked(until) => Self::AccountLocked(until),
            LockoutError::FailureWindowStoreError(e) => Self::Storage(e.to_string()),
            LockoutError::AccountStoreError(e) => e.into(),
        }
    }
}

impl From<MfaDeviceStoreError> for AuthError {
    fn from(err: MfaDeviceStoreError) -> Self {
        match err {
            MfaDeviceStoreError::DeviceNotFound => Self::MfaDeviceUnavailable,
            MfaDeviceStoreError::IllegalTransition => {
                Self::Storage("illegal device status transition".into())
            }
            MfaDeviceStoreError::UnexpectedError(msg) => Self::Storage(msg),
        }
    }
}

impl From<MfaError> for AuthError {
    fn from(err: MfaError) -> Self {
        match err {
            MfaError::InvalidCode => Self::MfaInvalidCode,
            MfaError::DeviceNotPending | MfaError::DeviceNotActive | MfaError::WrongAccount => {
                Self::MfaDeviceUnavailable
            }
            MfaError::Totp(msg) => Self::Storage(msg),
            MfaError::MfaDeviceStoreError(e) => e.into(),
            MfaError::AccountStoreError(e) => e.into(),
        }
    }
}
