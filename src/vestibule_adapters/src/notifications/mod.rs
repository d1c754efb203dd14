pub mod mock_dispatcher;
pub mod recording_dispatcher;
pub mod spawning_dispatcher;

pub use mock_dispatcher::MockNotificationDispatcher;
pub use recording_dispatcher::{RecordingDispatcher, SentNotification};
pub use spawning_dispatcher::SpawningDispatcher;
