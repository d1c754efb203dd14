use std::sync::Arc;
use std::time::Duration;

use vestibule_core::{Email, NotificationDispatcher, TokenPurpose};

/// Fire-and-forget wrapper around any dispatcher: `send` returns as soon as
/// the delivery task is spawned, and the task retries with linear backoff.
/// This keeps token issuance off the delivery path entirely.
#[derive(Clone)]
pub struct SpawningDispatcher<N> {
    inner: Arc<N>,
    max_attempts: u32,
    backoff: Duration,
}

impl<N> SpawningDispatcher<N>
where
    N: NotificationDispatcher + 'static,
{
    pub fn new(inner: N, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

#[async_trait::async_trait]
impl<N> NotificationDispatcher for SpawningDispatcher<N>
where
    N: NotificationDispatcher + 'static,
{
    async fn send(
        &self,
        recipient: &Email,
        purpose: TokenPurpose,
        link: &str,
    ) -> Result<(), String> {
        let inner = Arc::clone(&self.inner);
        let recipient = recipient.clone();
        let link = link.to_string();
        let max_attempts = self.max_attempts;
        let backoff = self.backoff;

        tokio::spawn(async move {
            for attempt in 1..=max_attempts {
                match inner.send(&recipient, purpose, &link).await {
                    Ok(()) => return,
                    Err(reason) => {
                        tracing::warn!(
                            %recipient,
                            ?purpose,
                            attempt,
                            max_attempts,
                            %reason,
                            "notification delivery failed"
                        );
                    }
                }
                if attempt < max_attempts {
                    tokio::time::sleep(backoff * attempt).await;
                }
            }
            tracing::error!(%recipient, ?purpose, "notification delivery abandoned");
        });

        Ok(())
    }
}
