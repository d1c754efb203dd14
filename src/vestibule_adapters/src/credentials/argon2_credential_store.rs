use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use dashmap::DashMap;
use secrecy::{ExposeSecret, Secret};
use vestibule_core::{AccountId, CredentialStore, CredentialStoreError, Password};

/// Argon2id credential store with an in-memory hash table. Hashing runs on
/// the blocking pool; the Argon2 parameters match production-grade cost.
#[derive(Default, Clone)]
pub struct Argon2CredentialStore {
    hashes: Arc<DashMap<AccountId, Secret<String>>>,
}

impl Argon2CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CredentialStore for Argon2CredentialStore {
    #[tracing::instrument(name = "Setting password hash", skip_all)]
    async fn set_password(
        &self,
        id: AccountId,
        new_password: Password,
    ) -> Result<(), CredentialStoreError> {
        let hash = compute_password_hash(new_password)
            .await
            .map_err(CredentialStoreError::Hash)?;
        self.hashes.insert(id, hash);
        Ok(())
    }

    #[tracing::instrument(name = "Verifying password hash", skip_all)]
    async fn verify_password(
        &self,
        id: AccountId,
        candidate: &Password,
    ) -> Result<bool, CredentialStoreError> {
        let Some(hash) = self.hashes.get(&id).map(|entry| entry.value().clone()) else {
            // Burn comparable time on unknown accounts so the caller's
            // latency does not separate "no such account" from "wrong
            // password".
            let _ = compute_password_hash(candidate.clone()).await;
            return Ok(false);
        };

        Ok(verify_password_hash(hash, candidate.clone()).await.is_ok())
    }

    async fn remove(&self, id: AccountId) -> Result<(), CredentialStoreError> {
        self.hashes.remove(&id);
        Ok(())
    }
}

#[tracing::instrument(name = "Verify password hash", skip_all)]
async fn verify_password_hash(
    expected_password_hash: Secret<String>,
    password_candidate: Password,
) -> Result<(), String> {
    let current_span: tracing::Span = tracing::Span::current();
    let result = tokio::task::spawn_blocking(move || {
        current_span.in_scope(|| {
            let expected_password_hash: PasswordHash<'_> =
                PasswordHash::new(expected_password_hash.expose_secret())
                    .map_err(|e| e.to_string())?;

            Argon2::new(
                Algorithm::Argon2id,
                Version::V0x13,
                Params::new(15000, 2, 1, None).map_err(|e| e.to_string())?,
            )
            .verify_password(
                password_candidate.as_ref().expose_secret().as_bytes(),
                &expected_password_hash,
            )
            .map_err(|e| e.to_string())
        })
    })
    .await
    .map_err(|e| e.to_string())?;

    result
}

#[tracing::instrument(name = "Computing password hash", skip_all)]
async fn compute_password_hash(password: Password) -> Result<Secret<String>, String> {
    let current_span: tracing::Span = tracing::Span::current();

    let result = tokio::task::spawn_blocking(move || {
        current_span.in_scope(move || {
            let salt: SaltString = SaltString::generate(rand_core::OsRng);
            let hasher = Argon2::new(
                Algorithm::Argon2id,
                Version::V0x13,
                Params::new(15000, 2, 1, None).map_err(|e| e.to_string())?,
            );
            hasher
                .hash_password(password.as_ref().expose_secret().as_bytes(), &salt)
                .map(|h| Secret::from(h.to_string()))
                .map_err(|e| e.to_string())
        })
    })
    .await
    .map_err(|e| e.to_string())?;

    result
}
