use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use vestibule_core::{AccountId, FailureWindow, FailureWindowStore, FailureWindowStoreError};

/// In-memory failure windows, one entry per account. Append, prune, and
/// count happen under the entry lock in one step, so concurrent failures
/// never undercount.
#[derive(Default, Clone)]
pub struct MemoryFailureWindowStore {
    windows: Arc<DashMap<AccountId, FailureWindow>>,
}

impl MemoryFailureWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FailureWindowStore for MemoryFailureWindowStore {
    async fn record_failure(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
        window: Duration,
    ) -> Result<u32, FailureWindowStoreError> {
        let mut entry = self.windows.entry(id).or_default();
        Ok(entry.record(at, window))
    }

    async fn clear(&self, id: AccountId) -> Result<(), FailureWindowStoreError> {
        self.windows.remove(&id);
        Ok(())
    }
}
