pub mod errors;
pub mod events;

pub use errors::{ConfigError, EmbedError};
pub use events::{ConsentEvent, EventBus, PREFERENCES_CHANGED_EVENT};

pub type Result<T> = std::result::Result<T, EmbedError>;
