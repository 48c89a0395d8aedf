//! Headless host: an in-memory page with a cookie jar, an event bus, and
//! iframes that exist only as records.
//!
//! Used by tests and tooling to drive an [`crate::EmbedController`] without
//! a browser. Clones share the same page, so a test can keep one handle and
//! give the other to the controller.
//!
//! ```rust,no_run
//! use consent_embed::{Callbacks, EmbedController, EmbedOptions, MemoryHost};
//!
//! let host = MemoryHost::with_origin("https://shop.example");
//! let options = EmbedOptions::default();
//! let banner = EmbedController::new("acme", options, Callbacks::default(), host.clone())
//!     .expect("client id present");
//! assert!(!banner.is_allowed("analytics"));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use consent_common::{ConsentEvent, EmbedError, EventBus};
use futures_util::future::LocalBoxFuture;
use serde_json::Value;
use url::Url;

use crate::frame::{FrameSpec, FrameStyle};
use crate::protocol::HostCommand;

use super::{EmbedHost, FrameId, HostEvent, HostListener, HostLocation, InboundMessage};

/// Window identity inside a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// A command the controller posted into a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub frame: FrameId,
    pub command: HostCommand,
    pub target_origin: String,
}

/// A cookie as held by the in-memory jar.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub same_site: Option<String>,
}

#[derive(Debug, Clone)]
struct MemoryFrame {
    id: FrameId,
    spec: FrameSpec,
    style: FrameStyle,
    window: Option<WindowId>,
}

struct Page {
    location: HostLocation,
    next_id: Cell<u64>,
    frames: RefCell<Vec<MemoryFrame>>,
    listeners: RefCell<Vec<HostListener<WindowId>>>,
    posted: RefCell<Vec<PostedMessage>>,
    cookies: RefCell<Vec<StoredCookie>>,
    broadcasts: RefCell<Vec<Value>>,
    bus: EventBus,
}

#[derive(Clone)]
pub struct MemoryHost {
    page: Rc<Page>,
}

impl MemoryHost {
    pub fn new(location: HostLocation) -> Self {
        Self {
            page: Rc::new(Page {
                location,
                next_id: Cell::new(1),
                frames: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
                posted: RefCell::new(Vec::new()),
                cookies: RefCell::new(Vec::new()),
                broadcasts: RefCell::new(Vec::new()),
                bus: EventBus::default(),
            }),
        }
    }

    /// A page at `origin`, with the hostname taken from it.
    pub fn with_origin(origin: &str) -> Self {
        let hostname = Url::parse(origin)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Self::new(HostLocation::new(origin, hostname))
    }

    fn next_id(&self) -> u64 {
        let id = self.page.next_id.get();
        self.page.next_id.set(id + 1);
        id
    }

    /// Bus carrying `cookiePreferencesChanged` notifications.
    pub fn bus(&self) -> &EventBus {
        &self.page.bus
    }

    pub fn frame_count(&self) -> usize {
        self.page.frames.borrow().len()
    }

    pub fn listener_count(&self) -> usize {
        self.page.listeners.borrow().len()
    }

    pub fn last_frame(&self) -> Option<FrameId> {
        self.page.frames.borrow().last().map(|f| f.id)
    }

    pub fn frame_spec(&self, frame: FrameId) -> Option<FrameSpec> {
        self.with_frame(frame, |f| f.spec.clone())
    }

    pub fn frame_style(&self, frame: FrameId) -> Option<FrameStyle> {
        self.with_frame(frame, |f| f.style)
    }

    /// Simulate the iframe being removed from the document.
    pub fn detach_frame(&self, frame: FrameId) {
        if let Some(f) = self.page.frames.borrow_mut().iter_mut().find(|f| f.id == frame) {
            f.window = None;
        }
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.page.posted.borrow().clone()
    }

    pub fn broadcasts(&self) -> Vec<Value> {
        self.page.broadcasts.borrow().clone()
    }

    pub fn cookie(&self, name: &str) -> Option<StoredCookie> {
        self.page
            .cookies
            .borrow()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Push an event to every listener.
    pub fn deliver(&self, event: HostEvent<WindowId>) {
        let listeners: Vec<_> = self.page.listeners.borrow().iter().cloned().collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    /// Post `data` from inside `frame`, with the frame document's origin.
    pub fn post_from_frame(&self, frame: FrameId, data: Value) {
        let Some((window, origin)) =
            self.with_frame(frame, |f| (f.window, f.spec.url.origin().ascii_serialization()))
        else {
            return;
        };
        self.deliver(HostEvent::Message(InboundMessage {
            source: window,
            origin,
            data,
        }));
    }

    /// Post `data` from an arbitrary window.
    pub fn post_from_window(&self, window: WindowId, origin: &str, data: Value) {
        self.deliver(HostEvent::Message(InboundMessage {
            source: Some(window),
            origin: origin.to_string(),
            data,
        }));
    }

    pub fn fail_frame_load(&self, frame: FrameId, reason: &str) {
        self.deliver(HostEvent::FrameLoadFailed {
            frame,
            reason: reason.to_string(),
        });
    }

    fn with_frame<T>(&self, frame: FrameId, f: impl FnOnce(&MemoryFrame) -> T) -> Option<T> {
        self.page.frames.borrow().iter().find(|fr| fr.id == frame).map(f)
    }
}

/// Parse the `document.cookie = "..."` assignment form.
fn parse_cookie(cookie: &str) -> Option<StoredCookie> {
    let mut parts = cookie.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut stored = StoredCookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        path: None,
        max_age: None,
        same_site: None,
    };

    for part in parts {
        if let Some((k, v)) = part.trim().split_once('=') {
            match k.trim().to_ascii_lowercase().as_str() {
                "path" => stored.path = Some(v.trim().to_string()),
                "max-age" => stored.max_age = v.trim().parse().ok(),
                "samesite" => stored.same_site = Some(v.trim().to_string()),
                _ => {}
            }
        }
    }

    Some(stored)
}

impl EmbedHost for MemoryHost {
    type Window = WindowId;

    fn location(&self) -> HostLocation {
        self.page.location.clone()
    }

    fn create_frame(&self, spec: &FrameSpec) -> Result<FrameId, EmbedError> {
        let id = FrameId(self.next_id());
        let window = WindowId(self.next_id());
        self.page.frames.borrow_mut().push(MemoryFrame {
            id,
            spec: spec.clone(),
            style: spec.style,
            window: Some(window),
        });
        Ok(id)
    }

    fn content_window(&self, frame: FrameId) -> Option<WindowId> {
        self.with_frame(frame, |f| f.window).flatten()
    }

    fn apply_style(&self, frame: FrameId, style: &FrameStyle) {
        if let Some(f) = self.page.frames.borrow_mut().iter_mut().find(|f| f.id == frame) {
            f.style = *style;
        }
    }

    fn post_message(
        &self,
        frame: FrameId,
        command: &HostCommand,
        target_origin: &str,
    ) -> Result<(), EmbedError> {
        if self.content_window(frame).is_none() {
            return Err(EmbedError::FrameUnavailable);
        }
        self.page.posted.borrow_mut().push(PostedMessage {
            frame,
            command: command.clone(),
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }

    fn subscribe(&self, listener: HostListener<WindowId>) {
        self.page.listeners.borrow_mut().push(listener);
    }

    fn cookies(&self) -> String {
        self.page
            .cookies
            .borrow()
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, cookie: &str) -> Result<(), EmbedError> {
        let stored = parse_cookie(cookie).ok_or_else(|| {
            EmbedError::MessageProcessing(format!("malformed cookie assignment: {cookie}"))
        })?;

        let mut cookies = self.page.cookies.borrow_mut();
        cookies.retain(|c| c.name != stored.name);
        if stored.max_age.map_or(true, |age| age > 0) {
            cookies.push(stored);
        }
        Ok(())
    }

    fn broadcast_preferences(&self, preferences: &Value) {
        self.page.broadcasts.borrow_mut().push(preferences.clone());
        self.page.bus.publish(ConsentEvent::PreferencesChanged {
            preferences: preferences.clone(),
        });
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
