use chrono::Utc;
use vestibule_core::{AccountId, DeviceInfo, Session, SessionId, SessionStore, SessionStoreError};

/// Tracks authenticated sessions per account: creation, activity, listing,
/// and revocation.
pub struct SessionRegistry<S>
where
    S: SessionStore,
{
    sessions: S,
}

impl<S> SessionRegistry<S>
where
    S: SessionStore,
{
    pub fn new(sessions: S) -> Self {
        Self { sessions }
    }

    #[tracing::instrument(name = "SessionRegistry::create", skip(self, device))]
    pub async fn create(
        &self,
        account_id: AccountId,
        device: DeviceInfo,
    ) -> Result<Session, SessionStoreError> {
        let session = Session::open(account_id, device, Utc::now());
        self.sessions.insert(session.clone()).await?;
        Ok(session)
    }

    /// Record activity. A revoked session is left untouched.
    pub async fn touch(&self, id: SessionId) -> Result<(), SessionStoreError> {
        self.sessions.touch(id, Utc::now()).await
    }

    /// All sessions for the account, most recently seen first.
    pub async fn list(&self, account_id: AccountId) -> Result<Vec<Session>, SessionStoreError> {
        self.sessions.list_for_account(account_id).await
    }

    /// Idempotent: revoking an already-revoked session succeeds.
    #[tracing::instrument(name = "SessionRegistry::revoke", skip(self))]
    pub async fn revoke(&self, id: SessionId) -> Result<(), SessionStoreError> {
        self.sessions.revoke(id).await
    }

    /// Drop every session record for an account, e.g. on account deletion.
    pub async fn purge(&self, account_id: AccountId) -> Result<(), SessionStoreError> {
        self.sessions.remove_for_account(account_id).await
    }

    /// Revoke every session for the account except `keep` (all of them when
    /// `None`), as of now: concurrent creations are not swept up.
    #[tracing::instrument(name = "SessionRegistry::revoke_all_except", skip(self))]
    pub async fn revoke_all_except(
        &self,
        account_id: AccountId,
        keep: Option<SessionId>,
    ) -> Result<u32, SessionStoreError> {
        let revoked = self.sessions.revoke_all_except(account_id, keep).await?;
        tracing::info!(account = %account_id, revoked, "bulk session revocation");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use chrono::DateTime;

    #[derive(Clone, Default)]
    struct MockSessionStore {
        sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    }

    #[async_trait::async_trait]
    impl SessionStore for MockSessionStore {
        async fn insert(&self, session: Session) -> Result<(), SessionStoreError> {
            self.sessions.write().await.insert(session.id, session);
            Ok(())
        }

        async fn get(&self, id: SessionId) -> Result<Session, SessionStoreError> {
            self.sessions
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or(SessionStoreError::SessionNotFound)
        }

        async fn touch(&self, id: SessionId, at: DateTime<Utc>) -> Result<(), SessionStoreError> {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(&id).ok_or(SessionStoreError::SessionNotFound)?;
            if !session.revoked {
                session.last_seen_at = at;
            }
            Ok(())
        }

        async fn list_for_account(
            &self,
            id: AccountId,
        ) -> Result<Vec<Session>, SessionStoreError> {
            let mut sessions: Vec<Session> = self
                .sessions
                .read()
                .await
                .values()
                .filter(|s| s.account_id == id)
                .cloned()
                .collect();
            sessions.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
            Ok(sessions)
        }

        async fn revoke(&self, id: SessionId) -> Result<(), SessionStoreError> {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(&id).ok_or(SessionStoreError::SessionNotFound)?;
            session.revoked = true;
            Ok(())
        }

        async fn revoke_all_except(
            &self,
            id: AccountId,
            keep: Option<SessionId>,
        ) -> Result<u32, SessionStoreError> {
            let mut sessions = self.sessions.write().await;
            let mut revoked = 0;
            for session in sessions.values_mut() {
                if session.account_id == id && !session.revoked && Some(session.id) != keep {
                    session.revoked = true;
                    revoked += 1;
                }
            }
            Ok(revoked)
        }

        async fn remove_for_account(&self, id: AccountId) -> Result<(), SessionStoreError> {
            self.sessions.write().await.retain(|_, s| s.account_id != id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_then_list_returns_the_session() {
        let registry = SessionRegistry::new(MockSessionStore::default());
        let account_id = AccountId::new();

        let session = registry
            .create(account_id, DeviceInfo::labeled("laptop"))
            .await
            .unwrap();
        let listed = registry.list(account_id).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, session.id);
    }

    #[tokio::test]
    async fn list_orders_by_last_seen_descending() {
        let store = MockSessionStore::default();
        let registry = SessionRegistry::new(store.clone());
        let account_id = AccountId::new();

        let old = registry
            .create(account_id, DeviceInfo::labeled("old"))
            .await
            .unwrap();
        let fresh = registry
            .create(account_id, DeviceInfo::labeled("fresh"))
            .await
            .unwrap();

        // Push the second session's activity well past the first's.
        store
            .touch(fresh.id, Utc::now() + chrono::Duration::minutes(5))
            .await
            .unwrap();

        let listed = registry.list(account_id).await.unwrap();
        assert_eq!(listed[0].id, fresh.id);
        assert_eq!(listed[1].id, old.id);
    }

    #[tokio::test]
    async fn touch_is_a_noop_on_revoked_sessions() {
        let store = MockSessionStore::default();
        let registry = SessionRegistry::new(store.clone());
        let session = registry
            .create(AccountId::new(), DeviceInfo::labeled("laptop"))
            .await
            .unwrap();

        registry.revoke(session.id).await.unwrap();
        registry.touch(session.id).await.unwrap();

        let stored = store.get(session.id).await.unwrap();
        assert_eq!(stored.last_seen_at, session.last_seen_at);
    }

    #[tokio::test]
    async fn revoke_all_except_keeps_the_named_session() {
        let registry = SessionRegistry::new(MockSessionStore::default());
        let account_id = AccountId::new();

        let keep = registry
            .create(account_id, DeviceInfo::labeled("current"))
            .await
            .unwrap();
        registry
            .create(account_id, DeviceInfo::labeled("other"))
            .await
            .unwrap();
        registry
            .create(account_id, DeviceInfo::labeled("stale"))
            .await
            .unwrap();

        let revoked = registry
            .revoke_all_except(account_id, Some(keep.id))
            .await
            .unwrap();
        assert_eq!(revoked, 2);

        let listed = registry.list(account_id).await.unwrap();
        let active: Vec<_> = listed.iter().filter(|s| s.is_active()).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);
    }

    #[tokio::test]
    async fn revoke_all_with_none_clears_every_session() {
        let registry = SessionRegistry::new(MockSessionStore::default());
        let account_id = AccountId::new();
        registry
            .create(account_id, DeviceInfo::labeled("a"))
            .await
            .unwrap();
        registry
            .create(account_id, DeviceInfo::labeled("b"))
            .await
            .unwrap();

        let revoked = registry.revoke_all_except(account_id, None).await.unwrap();
        assert_eq!(revoked, 2);

        let listed = registry.list(account_id).await.unwrap();
        assert!(listed.iter().all(|s| s.revoked));
    }
}
