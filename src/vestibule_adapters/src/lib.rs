pub mod config;
pub mod credentials;
pub mod notifications;
pub mod persistence;

pub use config::{NotificationSettings, VestibuleSettings};
pub use credentials::Argon2CredentialStore;
pub use notifications::{
    MockNotificationDispatcher, RecordingDispatcher, SentNotification, SpawningDispatcher,
};
pub use persistence::{
    MemoryAccountStore, MemoryFailureWindowStore, MemoryMfaDeviceStore, MemorySessionStore,
    MemoryTokenStore,
};
