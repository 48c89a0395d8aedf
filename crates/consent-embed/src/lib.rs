//! Host side of the embedded cookie-consent banner.
//!
//! The banner UI lives in a sandboxed iframe; this crate owns everything the
//! host page does around it:
//! - Building the iframe element (URL, sandbox, hidden footprint)
//! - The `initialized` handshake, raced against a timeout
//! - Relaying widget events to host callbacks
//! - Mirroring consent decisions into the `cookie_preferences` cookie
//! - Synchronous `is_allowed` checks for other host code
//!
//! The page itself is reached through the [`EmbedHost`] trait, implemented
//! for browsers by `consent-web` and headlessly by [`MemoryHost`].

pub mod callbacks;
pub mod connectivity;
pub mod controller;
pub mod cookie;
pub mod frame;
pub mod host;
pub mod protocol;

pub use callbacks::{CallbackResult, Callbacks};
pub use connectivity::ConnectivityReport;
pub use controller::{DebugSnapshot, EmbedController, HandshakeState};
pub use frame::{FrameLayout, FrameSpec, FrameStyle};
pub use host::{EmbedHost, FrameId, HostEvent, HostListener, HostLocation, InboundMessage};
#[cfg(not(target_arch = "wasm32"))]
pub use host::memory::{MemoryHost, WindowId};
pub use protocol::{CommandAction, HostCommand, WidgetAction, WidgetMessage, PROTOCOL_VERSION};

pub use consent_common::{ConfigError, EmbedError};
pub use consent_config::{DeploymentMode, EmbedOptions};
