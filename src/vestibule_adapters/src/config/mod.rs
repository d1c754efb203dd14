pub mod settings;

pub use settings::{NotificationSettings, VestibuleSettings};
