use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Name of the host-local event fired whenever consent preferences change.
pub const PREFERENCES_CHANGED_EVENT: &str = "cookiePreferencesChanged";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum ConsentEvent {
    #[serde(rename = "cookiePreferencesChanged")]
    PreferencesChanged { preferences: serde_json::Value },
    #[serde(other)]
    Unknown,
}

impl ConsentEvent {
    /// The DOM event name this maps to on the host window.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreferencesChanged { .. } => PREFERENCES_CHANGED_EVENT,
            Self::Unknown => "unknown",
        }
    }
}

/// Fan-out of host-local consent notifications to in-process observers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConsentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsentEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ConsentEvent) -> usize {
        tracing::trace!(event = event.name(), "publishing consent event");
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
