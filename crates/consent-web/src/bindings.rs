//! The JavaScript class: `new CookieBannerEmbed(clientId, options)`.
//!
//! Callbacks are read off `options` by name (`onAcceptAll`, `onError`, ...).
//! Async methods return promises; `show` and `resetPreferences` always
//! resolve, `init` rejects with an `Error` on failure.

use consent_embed::{
    CallbackResult, Callbacks, EmbedController, EmbedError, PROTOCOL_VERSION,
};
use js_sys::{Function, Promise, Reflect};
use serde_json::Value;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;

use crate::browser::{from_json, js_error, to_json, BrowserHost};
use crate::options::{client_id_text, PageOptions};

fn to_js_error(err: &EmbedError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn function(options: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(options, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

fn data_handler(f: Function) -> impl Fn(&Value) -> CallbackResult {
    move |data: &Value| {
        let arg = from_json(data).map_err(|e| e.to_string())?;
        f.call1(&JsValue::NULL, &arg)
            .map(drop)
            .map_err(|e| js_error(e).into())
    }
}

fn signal_handler(f: Function) -> impl Fn() -> CallbackResult {
    move || {
        f.call0(&JsValue::NULL)
            .map(drop)
            .map_err(|e| js_error(e).into())
    }
}

fn error_handler(f: Function) -> impl Fn(&EmbedError) {
    move |err: &EmbedError| {
        if let Err(e) = f.call1(&JsValue::NULL, &to_js_error(err)) {
            warn!(error = %js_error(e), "onError callback threw");
        }
    }
}

fn bridge_callbacks(options: &JsValue) -> Callbacks {
    let mut callbacks = Callbacks::new();
    if let Some(f) = function(options, "onAcceptAll") {
        callbacks = callbacks.on_accept_all(data_handler(f));
    }
    if let Some(f) = function(options, "onRejectAll") {
        callbacks = callbacks.on_reject_all(data_handler(f));
    }
    if let Some(f) = function(options, "onSavePreferences") {
        callbacks = callbacks.on_save_preferences(data_handler(f));
    }
    if let Some(f) = function(options, "onPreferencesChanged") {
        callbacks = callbacks.on_preferences_changed(data_handler(f));
    }
    if let Some(f) = function(options, "onInitialized") {
        callbacks = callbacks.on_initialized(data_handler(f));
    }
    if let Some(f) = function(options, "onBannerShown") {
        callbacks = callbacks.on_banner_shown(signal_handler(f));
    }
    if let Some(f) = function(options, "onBannerClosed") {
        callbacks = callbacks.on_banner_closed(signal_handler(f));
    }
    if let Some(f) = function(options, "onModalShown") {
        callbacks = callbacks.on_modal_shown(signal_handler(f));
    }
    if let Some(f) = function(options, "onModalClosed") {
        callbacks = callbacks.on_modal_closed(signal_handler(f));
    }
    if let Some(f) = function(options, "onError") {
        callbacks = callbacks.on_error(error_handler(f));
    }
    callbacks
}

#[wasm_bindgen]
pub struct CookieBannerEmbed {
    controller: EmbedController<BrowserHost>,
}

#[wasm_bindgen]
impl CookieBannerEmbed {
    #[wasm_bindgen(constructor)]
    pub fn new(client_id: JsValue, options: JsValue) -> Result<CookieBannerEmbed, JsValue> {
        let host = BrowserHost::new().map_err(|e| to_js_error(&e))?;
        let embed = PageOptions::from_value(to_json(&options))
            .and_then(|page| page.into_embed_options(host.global_frame_host()))
            .map_err(|e| to_js_error(&e.into()))?;
        let client_id = client_id_text(&to_json(&client_id));
        let controller = EmbedController::new(client_id, embed, bridge_callbacks(&options), host)
            .map_err(|e| to_js_error(&e.into()))?;
        Ok(Self { controller })
    }

    pub fn init(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller
                .init()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(|e| to_js_error(&e))
        })
    }

    pub fn show(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.show().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn hide(&self) {
        self.controller.hide();
    }

    #[wasm_bindgen(js_name = resetPreferences)]
    pub fn reset_preferences(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.reset_preferences().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = isAllowed)]
    pub fn is_allowed(&self, category: &str) -> bool {
        self.controller.is_allowed(category)
    }

    #[wasm_bindgen(getter)]
    pub fn initialized(&self) -> bool {
        self.controller.is_initialized()
    }

    #[wasm_bindgen(getter, js_name = clientId)]
    pub fn client_id(&self) -> String {
        self.controller.client_id().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn version(&self) -> String {
        PROTOCOL_VERSION.to_string()
    }

    /// Resolves with `{ url, status, body_len, body }`.
    #[wasm_bindgen(js_name = testApiConnection)]
    pub fn test_api_connection(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let report = controller
                .test_api_connection()
                .await
                .map_err(|e| to_js_error(&e))?;
            let report = serde_json::to_value(report)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            from_json(&report).map_err(|e| to_js_error(&e))
        })
    }

    /// Snapshot of configuration and handshake state, for the console.
    #[wasm_bindgen(js_name = debugInfo)]
    pub fn debug_info(&self) -> Result<JsValue, JsValue> {
        let snapshot = serde_json::to_value(self.controller.debug_snapshot())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        from_json(&snapshot).map_err(|e| to_js_error(&e))
    }
}
