use vestibule_core::{Email, NotificationDispatcher, TokenPurpose};

#[derive(Debug, Clone, Default)]
pub struct MockNotificationDispatcher;

impl MockNotificationDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for MockNotificationDispatcher {
    async fn send(
        &self,
        _recipient: &Email,
        _purpose: TokenPurpose,
        _link: &str,
    ) -> Result<(), String> {
        Ok(())
    }
}
