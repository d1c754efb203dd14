pub mod memory_account_store;
pub mod memory_failure_window_store;
pub mod memory_mfa_device_store;
pub mod memory_session_store;
pub mod memory_token_store;

pub use memory_account_store::MemoryAccountStore;
pub use memory_failure_window_store::MemoryFailureWindowStore;
pub use memory_mfa_device_store::MemoryMfaDeviceStore;
pub use memory_session_store::MemorySessionStore;
pub use memory_token_store::MemoryTokenStore;
