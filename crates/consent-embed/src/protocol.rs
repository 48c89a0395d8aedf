//! Message protocol between the host page and the banner iframe.
//!
//! Both directions use `window.postMessage` with a JSON object:
//! - **iframe -> host**: `{ source: "cookie-banner", action, data? }`
//! - **host -> iframe**: `{ source: "cookie-banner-parent", action, data, version }`
//!
//! Messages whose `source` tag is not the widget's are not ours and are
//! dropped before any dispatch happens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity tag the banner document stamps on every message it posts.
pub const WIDGET_SOURCE: &str = "cookie-banner";

/// Identity tag stamped on host commands.
pub const HOST_SOURCE: &str = "cookie-banner-parent";

/// Protocol version sent in the iframe URL and on every command.
pub const PROTOCOL_VERSION: &str = "1.1.1";

/// Actions the banner document can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetAction {
    Initialized,
    BannerShown,
    BannerClosed,
    ModalShown,
    ModalClosed,
    AcceptAll,
    RejectAll,
    PreferencesChanged,
    Error,
    Unknown(String),
}

impl WidgetAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "initialized" => Self::Initialized,
            "bannerShown" => Self::BannerShown,
            "bannerClosed" => Self::BannerClosed,
            "modalShown" => Self::ModalShown,
            "modalClosed" => Self::ModalClosed,
            "acceptAll" => Self::AcceptAll,
            "rejectAll" => Self::RejectAll,
            "preferencesChanged" => Self::PreferencesChanged,
            "error" => Self::Error,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialized => "initialized",
            Self::BannerShown => "bannerShown",
            Self::BannerClosed => "bannerClosed",
            Self::ModalShown => "modalShown",
            Self::ModalClosed => "modalClosed",
            Self::AcceptAll => "acceptAll",
            Self::RejectAll => "rejectAll",
            Self::PreferencesChanged => "preferencesChanged",
            Self::Error => "error",
            Self::Unknown(other) => other,
        }
    }
}

/// A message posted by the banner document.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetMessage {
    pub action: WidgetAction,
    /// Payload, `{}` when absent or falsy.
    pub data: Value,
}

impl WidgetMessage {
    /// Interpret a posted payload.
    ///
    /// Returns `None` unless the payload is an object carrying the widget's
    /// source tag. A missing `action` becomes an empty `Unknown`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("source").and_then(Value::as_str) != Some(WIDGET_SOURCE) {
            return None;
        }

        let action = object
            .get("action")
            .and_then(Value::as_str)
            .map(WidgetAction::parse)
            .unwrap_or_else(|| WidgetAction::Unknown(String::new()));

        let data = match object.get("data") {
            Some(data) if is_truthy(data) => data.clone(),
            _ => Value::Object(Map::new()),
        };

        Some(Self { action, data })
    }

    /// Build a widget message, as the banner document would post it.
    pub fn to_value(action: &str, data: Value) -> Value {
        serde_json::json!({
            "source": WIDGET_SOURCE,
            "action": action,
            "data": data,
        })
    }
}

/// Commands the host sends into the iframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Show,
    Hide,
    Reset,
}

/// A host -> iframe command, serialized as posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostCommand {
    pub source: String,
    pub action: CommandAction,
    pub data: Value,
    pub version: String,
}

impl HostCommand {
    pub fn new(action: CommandAction, data: Value) -> Self {
        Self {
            source: HOST_SOURCE.to_string(),
            action,
            data,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
