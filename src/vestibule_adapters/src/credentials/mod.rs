pub mod argon2_credential_store;

pub use argon2_credential_store::Argon2CredentialStore;
