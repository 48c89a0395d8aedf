//! The page the banner is embedded into.
//!
//! `EmbedHost` is the controller's only view of the outside world: it
//! creates the iframe, posts into it, reads and writes cookies, fires the
//! host-local notification, and supplies the handshake timer. Inbound
//! traffic arrives as [`HostEvent`]s pushed into the registered listener.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use consent_common::EmbedError;
use futures_util::future::LocalBoxFuture;
use serde_json::Value;

use crate::frame::{FrameSpec, FrameStyle};
use crate::protocol::HostCommand;

#[cfg(not(target_arch = "wasm32"))]
pub mod memory;

/// Identifies an iframe created by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// The host page's own location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLocation {
    /// `scheme://host[:port]`
    pub origin: String,
    pub hostname: String,
}

impl HostLocation {
    pub fn new(origin: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            hostname: hostname.into(),
        }
    }
}

/// A `message` event received by the host window.
#[derive(Debug, Clone)]
pub struct InboundMessage<W> {
    /// The window that posted the message, if the host can tell.
    pub source: Option<W>,
    /// Origin of the posting document.
    pub origin: String,
    pub data: Value,
}

/// Everything a host reports back to the controller.
#[derive(Debug, Clone)]
pub enum HostEvent<W> {
    /// A cross-document message arrived on the host window.
    Message(InboundMessage<W>),
    /// The iframe element fired `error` while loading.
    FrameLoadFailed { frame: FrameId, reason: String },
}

/// Receives host events for the lifetime of the page.
pub type HostListener<W> = Rc<dyn Fn(HostEvent<W>)>;

/// The embedding page, as seen by [`crate::EmbedController`].
pub trait EmbedHost: 'static {
    /// Window identity used to check which document posted a message.
    type Window: Clone + PartialEq + fmt::Debug + 'static;

    fn location(&self) -> HostLocation;

    /// Create the iframe and attach it to the document body.
    fn create_frame(&self, spec: &FrameSpec) -> Result<FrameId, EmbedError>;

    /// The iframe's content window, `None` once it is gone.
    fn content_window(&self, frame: FrameId) -> Option<Self::Window>;

    fn apply_style(&self, frame: FrameId, style: &FrameStyle);

    /// `contentWindow.postMessage(command, target_origin)`.
    fn post_message(
        &self,
        frame: FrameId,
        command: &HostCommand,
        target_origin: &str,
    ) -> Result<(), EmbedError>;

    /// Register a listener. There is no unsubscribe.
    fn subscribe(&self, listener: HostListener<Self::Window>);

    /// `document.cookie` as read by page scripts.
    fn cookies(&self) -> String;

    /// Assign one `Set-Cookie` style string to `document.cookie`.
    fn set_cookie(&self, cookie: &str) -> Result<(), EmbedError>;

    /// Fire `cookiePreferencesChanged` with `{ preferences }` on the host window.
    fn broadcast_preferences(&self, preferences: &Value);

    /// A future that completes after `duration`.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}
