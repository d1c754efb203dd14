use std::sync::Arc;
use tokio::sync::RwLock;

use secrecy::ExposeSecret;
use vestibule_core::{Email, NotificationDispatcher, TokenPurpose};

/// One delivered notification, with the recipient exposed for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub recipient: String,
    pub purpose: TokenPurpose,
    pub link: String,
}

/// Dispatcher that records everything it is asked to send. Test double for
/// asserting both that links go out and that silent paths stay silent.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<RwLock<Vec<SentNotification>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// The token value embedded in the most recent link, if any.
    pub async fn last_token(&self) -> Option<String> {
        self.sent
            .read()
            .await
            .last()
            .and_then(|notification| notification.link.split("token=").nth(1))
            .map(str::to_string)
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        recipient: &Email,
        purpose: TokenPurpose,
        link: &str,
    ) -> Result<(), String> {
        self.sent.write().await.push(SentNotification {
            recipient: recipient.as_ref().expose_secret().clone(),
            purpose,
            link: link.to_string(),
        });
        Ok(())
    }
}
