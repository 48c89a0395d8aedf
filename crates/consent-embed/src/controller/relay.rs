use consent_common::EmbedError;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::callbacks::callback_failed;
use crate::cookie;
use crate::frame::{FrameLayout, FrameStyle};
use crate::host::{EmbedHost, FrameId, HostEvent, InboundMessage};
use crate::protocol::{is_truthy, WidgetAction, WidgetMessage};

use super::Inner;

const UNKNOWN_REMOTE_ERROR: &str = "Unknown error from cookie banner";

impl<H: EmbedHost> Inner<H> {
    pub(super) fn handle_event(&self, event: HostEvent<H::Window>) {
        match event {
            HostEvent::Message(message) => self.handle_message(message),
            HostEvent::FrameLoadFailed { frame, reason } => self.handle_load_failure(frame, reason),
        }
    }

    fn handle_load_failure(&self, frame: FrameId, reason: String) {
        if self.frame_id() != Some(frame) {
            return;
        }
        warn!(frame = %frame, reason = %reason, "cookie banner iframe failed to load");
        if !self.complete_handshake(Err(EmbedError::FrameLoadFailed(reason))) {
            debug!(frame = %frame, "load failure arrived with no handshake pending");
        }
    }

    /// Validate an inbound message and hand it to the dispatch table.
    ///
    /// Accepted only when it was posted by our iframe's window, carries the
    /// widget source tag, and (same-origin mode) comes from our own origin.
    fn handle_message(&self, message: InboundMessage<H::Window>) {
        let Some(frame) = self.frame_id() else {
            return;
        };
        let Some(window) = self.host.content_window(frame) else {
            return;
        };
        if message.source.as_ref() != Some(&window) {
            trace!(origin = %message.origin, "ignoring message from another window");
            return;
        }
        if self.policy.pin_origin && message.origin != self.policy.host_origin {
            warn!(
                origin = %message.origin,
                expected = %self.policy.host_origin,
                "cookie banner message rejected: origin mismatch"
            );
            return;
        }
        let Some(widget) = WidgetMessage::from_value(&message.data) else {
            trace!("ignoring message without the cookie banner source tag");
            return;
        };

        debug!(action = widget.action.as_str(), "cookie banner message");
        if let Err(err) = self.dispatch(widget) {
            self.report(err);
        }
    }

    fn dispatch(&self, message: WidgetMessage) -> Result<(), EmbedError> {
        let WidgetMessage { action, data } = message;
        let callbacks = &self.callbacks;

        match action {
            WidgetAction::Initialized => {
                self.mark_initialized();
                let layout = if data.get("hasPreferences").is_some_and(is_truthy) {
                    FrameLayout::Collapsed
                } else {
                    FrameLayout::Overlay
                };
                self.resize(layout);
                (callbacks.on_initialized)(&data).map_err(|e| callback_failed("onInitialized", e))
            }
            WidgetAction::BannerShown => {
                self.restyle(FrameStyle::shown());
                (callbacks.on_banner_shown)().map_err(|e| callback_failed("onBannerShown", e))
            }
            WidgetAction::BannerClosed => {
                self.restyle(FrameStyle::hidden());
                (callbacks.on_banner_closed)().map_err(|e| callback_failed("onBannerClosed", e))
            }
            WidgetAction::ModalShown => {
                self.restyle(FrameStyle::shown());
                (callbacks.on_modal_shown)().map_err(|e| callback_failed("onModalShown", e))
            }
            WidgetAction::ModalClosed => {
                (callbacks.on_modal_closed)().map_err(|e| callback_failed("onModalClosed", e))
            }
            WidgetAction::AcceptAll => {
                (callbacks.on_accept_all)(&data).map_err(|e| callback_failed("onAcceptAll", e))
            }
            WidgetAction::RejectAll => {
                (callbacks.on_reject_all)(&data).map_err(|e| callback_failed("onRejectAll", e))
            }
            WidgetAction::PreferencesChanged => {
                if !data.is_object() {
                    return Err(EmbedError::MessageProcessing(format!(
                        "preferencesChanged payload must be an object, got {data}"
                    )));
                }
                (callbacks.on_preferences_changed)(&data)
                    .map_err(|e| callback_failed("onPreferencesChanged", e))?;
                (callbacks.on_save_preferences)(&data)
                    .map_err(|e| callback_failed("onSavePreferences", e))?;
                self.apply_preferences(&data)
            }
            WidgetAction::Error => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(UNKNOWN_REMOTE_ERROR);
                self.report(EmbedError::Remote(message.to_string()));
                Ok(())
            }
            WidgetAction::Unknown(name) => {
                warn!(action = %name, "unknown cookie banner action");
                Ok(())
            }
        }
    }

    /// Mirror preferences into the cookie, then notify page scripts.
    fn apply_preferences(&self, preferences: &Value) -> Result<(), EmbedError> {
        let set_cookie = cookie::set_cookie_string(preferences)?;
        self.host.set_cookie(&set_cookie)?;
        self.host.broadcast_preferences(preferences);
        debug!(preferences = %preferences, "cookie preferences stored");
        Ok(())
    }
}
