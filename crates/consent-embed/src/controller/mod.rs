//! The embed controller: one banner iframe, its handshake, and the relay
//! between the widget and host callbacks.
//!
//! `EmbedController` is a cheap handle (`Rc`) over shared state so the
//! async methods can hand a copy of it back to callers. It is `!Send`,
//! matching the single-threaded event loop of a browser page.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use consent_common::{ConfigError, EmbedError};
use consent_config::{validate_embed, EmbedOptions};
use futures_util::future::{LocalBoxFuture, Shared};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, error};
use url::Url;

use crate::callbacks::Callbacks;
use crate::connectivity::{self, ConnectivityReport};
use crate::cookie;
use crate::frame::{FrameLayout, FrameStyle};
use crate::host::{EmbedHost, FrameId};
use crate::protocol::{CommandAction, HostCommand};

mod handshake;
mod relay;


type HandshakeFuture = Shared<LocalBoxFuture<'static, Result<(), EmbedError>>>;

/// Public view of the handshake state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeState {
    /// `init()` has not been called.
    Idle,
    /// Waiting for the widget's `initialized` message.
    Pending,
    Initialized,
    /// Timed out or the iframe failed to load.
    Failed,
}

enum Handshake {
    Idle,
    Pending(HandshakeFuture),
    Initialized,
    Failed(EmbedError),
}

impl Handshake {
    fn state(&self) -> HandshakeState {
        match self {
            Self::Idle => HandshakeState::Idle,
            Self::Pending(_) => HandshakeState::Pending,
            Self::Initialized => HandshakeState::Initialized,
            Self::Failed(_) => HandshakeState::Failed,
        }
    }
}

struct Frame {
    id: FrameId,
    url: Url,
    style: FrameStyle,
}

struct State {
    frame: Option<Frame>,
    handshake: Handshake,
    listening: bool,
    /// One-shot handshake subscription, dropped once the handshake settles.
    pending_reply: Option<oneshot::Sender<Result<(), EmbedError>>>,
}

/// Settings resolved once from the options and the host location.
struct Policy {
    host_origin: String,
    domain: String,
    target_origin: String,
    timeout: Duration,
    pin_origin: bool,
}

struct Inner<H: EmbedHost> {
    client_id: String,
    options: EmbedOptions,
    policy: Policy,
    callbacks: Callbacks,
    host: H,
    state: RefCell<State>,
}

/// Host-side controller for one embedded cookie banner.
pub struct EmbedController<H: EmbedHost> {
    inner: Rc<Inner<H>>,
}

impl<H: EmbedHost> Clone for EmbedController<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Diagnostic view of a controller.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub client_id: String,
    pub api_endpoint: Option<String>,
    pub domain: String,
    pub target_origin: String,
    pub handshake: HandshakeState,
    pub initialized: bool,
    pub frame: Option<FrameSnapshot>,
    pub options: EmbedOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub src: String,
    pub content_window: bool,
    pub width: &'static str,
    pub height: &'static str,
    pub style: FrameStyle,
}

impl<H: EmbedHost> EmbedController<H> {
    /// Create a controller. Nothing touches the page until `init()`.
    ///
    /// Fails with [`ConfigError::MissingClientId`] when `client_id` is
    /// empty or blank, and with [`ConfigError::ValidationError`] when the
    /// options do not validate.
    pub fn new(
        client_id: impl Into<String>,
        options: EmbedOptions,
        callbacks: Callbacks,
        host: H,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        validate_embed(&options)?;

        let location = host.location();
        let policy = Policy {
            domain: options.domain_or(&location.hostname).to_string(),
            target_origin: options.target_origin(&location.origin),
            timeout: options.handshake_timeout(),
            pin_origin: options.deployment_mode.requires_origin_match(),
            host_origin: location.origin,
        };

        debug!(
            client_id = %client_id,
            domain = %policy.domain,
            mode = ?options.deployment_mode,
            endpoint = ?options.api_endpoint,
            "cookie banner configured"
        );

        Ok(Self {
            inner: Rc::new(Inner {
                client_id,
                options,
                policy,
                callbacks,
                host,
                state: RefCell::new(State {
                    frame: None,
                    handshake: Handshake::Idle,
                    listening: false,
                    pending_reply: None,
                }),
            }),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    pub fn options(&self) -> &EmbedOptions {
        &self.inner.options
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn is_initialized(&self) -> bool {
        self.handshake_state() == HandshakeState::Initialized
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.inner.state.borrow().handshake.state()
    }

    /// The banner iframe, once created.
    pub fn frame(&self) -> Option<FrameId> {
        self.inner.frame_id()
    }

    /// Initialize if needed, then ask the widget to show the banner.
    ///
    /// Never fails: initialization errors go to `on_error` and the command
    /// is skipped.
    pub async fn show(&self) -> Self {
        self.ensure_then_send(CommandAction::Show).await
    }

    /// Ask the widget to hide the banner. Does not wait for initialization.
    pub fn hide(&self) -> &Self {
        self.inner.send_command(CommandAction::Hide, json!({}));
        self
    }

    /// Initialize if needed, then ask the widget to clear stored consent
    /// and show the banner again. Never fails, like [`Self::show`].
    pub async fn reset_preferences(&self) -> Self {
        self.ensure_then_send(CommandAction::Reset).await
    }

    /// Whether `category` has been explicitly allowed.
    ///
    /// Reads the preferences cookie on every call; without one only
    /// `necessary` is allowed.
    pub fn is_allowed(&self, category: &str) -> bool {
        cookie::is_allowed(&self.inner.host.cookies(), category)
    }

    /// Probe `GET {endpoint}/{clientId}/client` and log what comes back.
    ///
    /// Diagnostic only; consent state is never touched.
    pub async fn test_api_connection(&self) -> Result<ConnectivityReport, EmbedError> {
        let Some(endpoint) = self.inner.options.api_endpoint.as_deref() else {
            error!("no API endpoint configured");
            return Err(ConfigError::MissingEndpoint.into());
        };
        connectivity::probe(endpoint, &self.inner.client_id).await
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let inner = &self.inner;
        let state = inner.state.borrow();
        let frame = state.frame.as_ref().map(|frame| FrameSnapshot {
            src: frame.url.to_string(),
            content_window: inner.host.content_window(frame.id).is_some(),
            width: frame.style.layout.size(),
            height: frame.style.layout.size(),
            style: frame.style,
        });

        DebugSnapshot {
            client_id: inner.client_id.clone(),
            api_endpoint: inner.options.api_endpoint.clone(),
            domain: inner.policy.domain.clone(),
            target_origin: inner.policy.target_origin.clone(),
            handshake: state.handshake.state(),
            initialized: matches!(state.handshake, Handshake::Initialized),
            frame,
            options: inner.options.clone(),
        }
    }

    async fn ensure_then_send(&self, action: CommandAction) -> Self {
        if !self.is_initialized() {
            if let Err(err) = self.init().await {
                self.inner.report(err);
                return self.clone();
            }
        }
        debug!(action = ?action, "sending banner command");
        self.inner.send_command(action, json!({}));
        self.clone()
    }
}

impl<H: EmbedHost> Inner<H> {
    fn frame_id(&self) -> Option<FrameId> {
        self.state.borrow().frame.as_ref().map(|f| f.id)
    }

    /// Hand an error to `on_error`.
    fn report(&self, err: EmbedError) {
        debug!(error = %err, "reporting cookie banner error");
        (self.callbacks.on_error)(&err);
    }

    fn restyle(&self, style: FrameStyle) {
        let frame = {
            let mut state = self.state.borrow_mut();
            match state.frame.as_mut() {
                Some(frame) => {
                    frame.style = style;
                    frame.id
                }
                None => return,
            }
        };
        self.host.apply_style(frame, &style);
    }

    /// Change geometry only; visibility stays as it is.
    fn resize(&self, layout: FrameLayout) {
        let current = self.state.borrow().frame.as_ref().map(|f| f.style);
        if let Some(style) = current {
            self.restyle(style.with_layout(layout));
        }
    }

    fn send_command(&self, action: CommandAction, data: Value) {
        let frame = self
            .frame_id()
            .filter(|frame| self.host.content_window(*frame).is_some());
        let Some(frame) = frame else {
            self.report(EmbedError::FrameUnavailable);
            return;
        };

        let command = HostCommand::new(action, data);
        if let Err(err) = self
            .host
            .post_message(frame, &command, &self.policy.target_origin)
        {
            self.report(err);
        }
    }
}
