//! Host callbacks fired by the message relay.
//!
//! Every callback defaults to a no-op, except `on_error` which logs. Data
//! callbacks receive the widget's payload (`{}` when it sent none).
//! Callbacks may fail; a failure is reported through `on_error` and does
//! not stop the relay.

use consent_common::EmbedError;
use serde_json::Value;
use tracing::error;

pub type CallbackResult = Result<(), Box<dyn std::error::Error>>;

type DataCallback = Box<dyn Fn(&Value) -> CallbackResult>;
type SignalCallback = Box<dyn Fn() -> CallbackResult>;
type ErrorCallback = Box<dyn Fn(&EmbedError)>;

pub struct Callbacks {
    pub(crate) on_accept_all: DataCallback,
    pub(crate) on_reject_all: DataCallback,
    pub(crate) on_save_preferences: DataCallback,
    pub(crate) on_banner_shown: SignalCallback,
    pub(crate) on_banner_closed: SignalCallback,
    pub(crate) on_modal_shown: SignalCallback,
    pub(crate) on_modal_closed: SignalCallback,
    pub(crate) on_preferences_changed: DataCallback,
    pub(crate) on_initialized: DataCallback,
    pub(crate) on_error: ErrorCallback,
}

fn ignore_data(_: &Value) -> CallbackResult {
    Ok(())
}

fn ignore_signal() -> CallbackResult {
    Ok(())
}

fn log_error(err: &EmbedError) {
    error!(error = %err, "cookie banner error");
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            on_accept_all: Box::new(ignore_data),
            on_reject_all: Box::new(ignore_data),
            on_save_preferences: Box::new(ignore_data),
            on_banner_shown: Box::new(ignore_signal),
            on_banner_closed: Box::new(ignore_signal),
            on_modal_shown: Box::new(ignore_signal),
            on_modal_closed: Box::new(ignore_signal),
            on_preferences_changed: Box::new(ignore_data),
            on_initialized: Box::new(ignore_data),
            on_error: Box::new(log_error),
        }
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user accepted every category.
    pub fn on_accept_all(mut self, f: impl Fn(&Value) -> CallbackResult + 'static) -> Self {
        self.on_accept_all = Box::new(f);
        self
    }

    /// The user rejected every optional category.
    pub fn on_reject_all(mut self, f: impl Fn(&Value) -> CallbackResult + 'static) -> Self {
        self.on_reject_all = Box::new(f);
        self
    }

    /// Fired after `on_preferences_changed`, before the cookie is written.
    pub fn on_save_preferences(mut self, f: impl Fn(&Value) -> CallbackResult + 'static) -> Self {
        self.on_save_preferences = Box::new(f);
        self
    }

    pub fn on_banner_shown(mut self, f: impl Fn() -> CallbackResult + 'static) -> Self {
        self.on_banner_shown = Box::new(f);
        self
    }

    pub fn on_banner_closed(mut self, f: impl Fn() -> CallbackResult + 'static) -> Self {
        self.on_banner_closed = Box::new(f);
        self
    }

    pub fn on_modal_shown(mut self, f: impl Fn() -> CallbackResult + 'static) -> Self {
        self.on_modal_shown = Box::new(f);
        self
    }

    pub fn on_modal_closed(mut self, f: impl Fn() -> CallbackResult + 'static) -> Self {
        self.on_modal_closed = Box::new(f);
        self
    }

    pub fn on_preferences_changed(
        mut self,
        f: impl Fn(&Value) -> CallbackResult + 'static,
    ) -> Self {
        self.on_preferences_changed = Box::new(f);
        self
    }

    /// The widget finished its handshake; receives its `initialized` payload.
    pub fn on_initialized(mut self, f: impl Fn(&Value) -> CallbackResult + 'static) -> Self {
        self.on_initialized = Box::new(f);
        self
    }

    /// Replaces the default logging handler.
    pub fn on_error(mut self, f: impl Fn(&EmbedError) + 'static) -> Self {
        self.on_error = Box::new(f);
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

/// Map a failed callback into the error the relay reports.
pub(crate) fn callback_failed(name: &str, err: Box<dyn std::error::Error>) -> EmbedError {
    EmbedError::MessageProcessing(format!("{name} callback failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn defaults_are_noops() {
        let callbacks = Callbacks::default();
        assert!((callbacks.on_accept_all)(&json!({})).is_ok());
        assert!((callbacks.on_banner_shown)().is_ok());
        (callbacks.on_error)(&EmbedError::FrameUnavailable);
    }

    #[test]
    fn builder_replaces_handlers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callbacks = Callbacks::new().on_accept_all(move |data| {
            sink.borrow_mut().push(data.clone());
            Ok(())
        });

        (callbacks.on_accept_all)(&json!({"analytics": true})).unwrap();
        (callbacks.on_reject_all)(&json!({"analytics": false})).unwrap();
        assert_eq!(*seen.borrow(), vec![json!({"analytics": true})]);
    }

    #[test]
    fn failed_callback_message_names_the_callback() {
        let err = callback_failed("onAcceptAll", "boom".into());
        assert_eq!(
            err.to_string(),
            "error processing message: onAcceptAll callback failed: boom"
        );
    }
}
