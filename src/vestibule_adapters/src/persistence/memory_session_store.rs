use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vestibule_core::{AccountId, Session, SessionId, SessionStore, SessionStoreError};

/// In-memory session store, sharded per account. `insert` and
/// `revoke_all_except` both run under the owning account's entry lock, so a
/// bulk revocation sweeps exactly the sessions that existed when it started
/// and a racing creation lands wholly before or wholly after it.
#[derive(Default, Clone)]
pub struct MemorySessionStore {
    by_account: Arc<DashMap<AccountId, Vec<Session>>>,
    index: Arc<DashMap<SessionId, AccountId>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_of(&self, id: SessionId) -> Result<AccountId, SessionStoreError> {
        self.index
            .get(&id)
            .map(|entry| *entry.value())
            .ok_or(SessionStoreError::SessionNotFound)
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), SessionStoreError> {
        let mut entry = self.by_account.entry(session.account_id).or_default();
        self.index.insert(session.id, session.account_id);
        entry.push(session);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Session, SessionStoreError> {
        let account_id = self.owner_of(id)?;
        let sessions = self
            .by_account
            .get(&account_id)
            .ok_or(SessionStoreError::SessionNotFound)?;
        sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(SessionStoreError::SessionNotFound)
    }

    async fn touch(&self, id: SessionId, at: DateTime<Utc>) -> Result<(), SessionStoreError> {
        let account_id = self.owner_of(id)?;
        let mut sessions = self
            .by_account
            .get_mut(&account_id)
            .ok_or(SessionStoreError::SessionNotFound)?;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionStoreError::SessionNotFound)?;
        if !session.revoked {
            session.last_seen_at = at;
        }
        Ok(())
    }

    async fn list_for_account(&self, id: AccountId) -> Result<Vec<Session>, SessionStoreError> {
        let mut sessions = self
            .by_account
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        sessions.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(sessions)
    }

    async fn revoke(&self, id: SessionId) -> Result<(), SessionStoreError> {
        let account_id = self.owner_of(id)?;
        let mut sessions = self
            .by_account
            .get_mut(&account_id)
            .ok_or(SessionStoreError::SessionNotFound)?;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionStoreError::SessionNotFound)?;
        // Idempotent: a second revoke is a no-op success.
        session.revoked = true;
        Ok(())
    }

    async fn revoke_all_except(
        &self,
        id: AccountId,
        keep: Option<SessionId>,
    ) -> Result<u32, SessionStoreError> {
        let Some(mut sessions) = self.by_account.get_mut(&id) else {
            return Ok(0);
        };
        let mut revoked = 0;
        for session in sessions.iter_mut() {
            if !session.revoked && Some(session.id) != keep {
                session.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn remove_for_account(&self, id: AccountId) -> Result<(), SessionStoreError> {
        if let Some((_, sessions)) = self.by_account.remove(&id) {
            for session in sessions {
                self.index.remove(&session.id);
            }
        }
        Ok(())
    }
}
