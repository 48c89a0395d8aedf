//! [`EmbedHost`] over the live DOM.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use consent_common::{EmbedError, PREFERENCES_CHANGED_EVENT};
use consent_embed::{
    EmbedHost, FrameId, FrameSpec, FrameStyle, HostCommand, HostEvent, HostListener, HostLocation,
    InboundMessage,
};
use futures_util::future::LocalBoxFuture;
use js_sys::{Object, Promise, Reflect, JSON};
use serde_json::{json, Value};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CustomEvent, CustomEventInit, Event, HtmlDocument, HtmlIFrameElement, MessageEvent, Window,
};

use crate::options::GLOBAL_CONFIG;

type Listeners = Rc<RefCell<Vec<HostListener<Object>>>>;

/// Best-effort text for a thrown JS value.
pub(crate) fn js_error(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => format!("{err:?}"),
    }
}

/// JSON view of a JS value; anything JSON cannot carry becomes `null`.
pub(crate) fn to_json(value: &JsValue) -> Value {
    JSON::stringify(value)
        .ok()
        .and_then(|text| text.as_string())
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(Value::Null)
}

pub(crate) fn from_json(value: &Value) -> Result<JsValue, EmbedError> {
    JSON::parse(&value.to_string()).map_err(|e| EmbedError::MessageProcessing(js_error(e)))
}

fn dispatch(listeners: &Listeners, event: HostEvent<Object>) {
    let current: Vec<_> = listeners.borrow().iter().cloned().collect();
    for listener in current {
        listener(event.clone());
    }
}

struct BrowserFrame {
    id: FrameId,
    element: HtmlIFrameElement,
    _on_error: Closure<dyn FnMut(Event)>,
}

pub struct BrowserHost {
    window: Window,
    document: HtmlDocument,
    next_id: Cell<u64>,
    frames: RefCell<Vec<BrowserFrame>>,
    listeners: Listeners,
    on_message: RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>,
}

impl BrowserHost {
    pub fn new() -> Result<Self, EmbedError> {
        let unavailable =
            |what: &str| EmbedError::MessageProcessing(format!("no {what} in this context"));
        let window = web_sys::window().ok_or_else(|| unavailable("window"))?;
        let document = window
            .document()
            .ok_or_else(|| unavailable("document"))?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| unavailable("HTML document"))?;

        Ok(Self {
            window,
            document,
            next_id: Cell::new(1),
            frames: RefCell::new(Vec::new()),
            listeners: Rc::new(RefCell::new(Vec::new())),
            on_message: RefCell::new(None),
        })
    }

    /// `window.CookieBannerConfig.host`, if the page set it.
    pub fn global_frame_host(&self) -> Option<String> {
        let config = Reflect::get(&self.window, &JsValue::from_str(GLOBAL_CONFIG)).ok()?;
        if config.is_undefined() || config.is_null() {
            return None;
        }
        Reflect::get(&config, &JsValue::from_str("host")).ok()?.as_string()
    }

    fn element(&self, frame: FrameId) -> Option<HtmlIFrameElement> {
        self.frames
            .borrow()
            .iter()
            .find(|f| f.id == frame)
            .map(|f| f.element.clone())
    }
}

/// Detach every closure from the page before wasm-bindgen frees it.
impl Drop for BrowserHost {
    fn drop(&mut self) {
        if let Some(closure) = self.on_message.get_mut().take() {
            if let Err(e) = self
                .window
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            {
                warn!(error = %js_error(e), "failed to remove message listener");
            }
        }
        for frame in self.frames.get_mut().drain(..) {
            frame.element.set_onerror(None);
            debug!(frame = %frame.id, "iframe error handler detached");
        }
    }
}

impl EmbedHost for BrowserHost {
    type Window = Object;

    fn location(&self) -> HostLocation {
        let location = self.window.location();
        HostLocation::new(
            location.origin().unwrap_or_default(),
            location.hostname().unwrap_or_default(),
        )
    }

    fn create_frame(&self, spec: &FrameSpec) -> Result<FrameId, EmbedError> {
        let fail = |e: JsValue| {
            EmbedError::MessageProcessing(format!("failed to create iframe: {}", js_error(e)))
        };

        let element = self
            .document
            .create_element("iframe")
            .map_err(fail)?
            .dyn_into::<HtmlIFrameElement>()
            .map_err(|_| EmbedError::MessageProcessing("created element is not an iframe".into()))?;
        element.set_src(spec.url.as_str());
        element.set_attribute("sandbox", &spec.sandbox).map_err(fail)?;
        for (name, value) in spec.attributes() {
            element.set_attribute(name, value).map_err(fail)?;
        }
        element
            .set_attribute("style", &spec.style.css_text())
            .map_err(fail)?;

        let id = FrameId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let listeners = Rc::clone(&self.listeners);
        let src = spec.url.to_string();
        let on_error = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            dispatch(
                &listeners,
                HostEvent::FrameLoadFailed {
                    frame: id,
                    reason: src.clone(),
                },
            );
        });
        element.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let body = self
            .document
            .body()
            .ok_or_else(|| EmbedError::MessageProcessing("document has no body".into()))?;
        body.append_child(&element).map_err(fail)?;

        debug!(frame = %id, src = %spec.url, "iframe attached");
        self.frames.borrow_mut().push(BrowserFrame {
            id,
            element,
            _on_error: on_error,
        });
        Ok(id)
    }

    fn content_window(&self, frame: FrameId) -> Option<Object> {
        self.element(frame)?
            .content_window()
            .map(|window| window.unchecked_into::<Object>())
    }

    fn apply_style(&self, frame: FrameId, style: &FrameStyle) {
        let Some(element) = self.element(frame) else {
            return;
        };
        let css = element.style();
        for (name, value) in style.declarations() {
            if let Err(e) = css.set_property(name, value) {
                warn!(property = name, error = %js_error(e), "failed to set iframe style");
            }
        }
    }

    fn post_message(
        &self,
        frame: FrameId,
        command: &HostCommand,
        target_origin: &str,
    ) -> Result<(), EmbedError> {
        let window = self
            .element(frame)
            .and_then(|element| element.content_window())
            .ok_or(EmbedError::FrameUnavailable)?;
        let message = JSON::parse(&command.to_json())
            .map_err(|e| EmbedError::MessageProcessing(js_error(e)))?;
        window
            .post_message(&message, target_origin)
            .map_err(|e| {
                EmbedError::MessageProcessing(format!("postMessage failed: {}", js_error(e)))
            })
    }

    fn subscribe(&self, listener: HostListener<Object>) {
        self.listeners.borrow_mut().push(listener);

        let mut on_message = self.on_message.borrow_mut();
        if on_message.is_some() {
            return;
        }

        let listeners = Rc::clone(&self.listeners);
        let closure = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let message = InboundMessage {
                source: event.source(),
                origin: event.origin(),
                data: to_json(&event.data()),
            };
            dispatch(&listeners, HostEvent::Message(message));
        });

        match self
            .window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            Ok(()) => *on_message = Some(closure),
            Err(e) => warn!(error = %js_error(e), "failed to listen for messages"),
        }
    }

    fn cookies(&self) -> String {
        self.document.cookie().unwrap_or_default()
    }

    fn set_cookie(&self, cookie: &str) -> Result<(), EmbedError> {
        self.document
            .set_cookie(cookie)
            .map_err(|e| {
                EmbedError::MessageProcessing(format!("failed to write cookie: {}", js_error(e)))
            })
    }

    fn broadcast_preferences(&self, preferences: &Value) {
        let detail = match from_json(&json!({ "preferences": preferences })) {
            Ok(detail) => detail,
            Err(e) => {
                warn!(error = %e, "preferences not broadcast");
                return;
            }
        };

        let init = CustomEventInit::new();
        init.set_detail(&detail);
        let dispatched = CustomEvent::new_with_event_init_dict(PREFERENCES_CHANGED_EVENT, &init)
            .and_then(|event| self.window.dispatch_event(&event));
        if let Err(e) = dispatched {
            warn!(error = %js_error(e), "failed to dispatch {PREFERENCES_CHANGED_EVENT}");
        }
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let window = self.window.clone();
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = Promise::new(&mut |resolve, _reject| {
            if let Err(e) =
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            {
                warn!(error = %js_error(e), "failed to schedule timer");
            }
        });
        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }
}
