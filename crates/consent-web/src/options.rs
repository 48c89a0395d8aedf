//! Options as a page passes them to `new CookieBannerEmbed(clientId, options)`.
//!
//! Keys are camelCase. Callback entries are functions and never survive the
//! JSON view this module works on; the bindings pick them up separately.

use consent_common::ConfigError;
use consent_config::{validate_embed, DeploymentMode, EmbedOptions, DEFAULT_SANDBOX};
use consent_embed::protocol::is_truthy;
use serde::Deserialize;
use serde_json::Value;

/// Global a page may define before loading the script, e.g.
/// `window.CookieBannerConfig = { host: "https://consent.example/banner.html" }`.
pub const GLOBAL_CONFIG: &str = "CookieBannerConfig";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageOptions {
    pub api_endpoint: Option<String>,
    pub domain: Option<String>,
    pub sandbox: Option<String>,
    pub deployment_mode: Option<DeploymentMode>,
    pub target_origin: Option<String>,
    pub frame_host: Option<String>,
    pub handshake_timeout_ms: Option<u64>,
}

/// Client id as JS `String(clientId)` would render it; falsy ids become
/// empty so the controller rejects them.
pub fn client_id_text(value: &Value) -> String {
    if !is_truthy(value) {
        return String::new();
    }
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                Value::String(text) => text.clone(),
                other => client_id_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PageOptions {
    /// `null` (an omitted options argument) means all defaults.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Resolve against defaults. Empty strings count as absent.
    ///
    /// `global_host` is `window.CookieBannerConfig.host`; an explicit
    /// `frameHost` wins over it.
    pub fn into_embed_options(
        self,
        global_host: Option<String>,
    ) -> Result<EmbedOptions, ConfigError> {
        let options = EmbedOptions {
            api_endpoint: non_empty(self.api_endpoint),
            domain: non_empty(self.domain),
            sandbox: non_empty(self.sandbox).unwrap_or_else(|| DEFAULT_SANDBOX.to_string()),
            deployment_mode: self.deployment_mode.unwrap_or_default(),
            target_origin: non_empty(self.target_origin),
            frame_host: non_empty(self.frame_host).or_else(|| non_empty(global_host)),
            handshake_timeout_ms: self.handshake_timeout_ms,
        };
        validate_embed(&options)?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_id_coerced_like_js_string() {
        assert_eq!(client_id_text(&json!("acme")), "acme");
        assert_eq!(client_id_text(&json!(42)), "42");
        assert_eq!(client_id_text(&json!(4.5)), "4.5");
        assert_eq!(client_id_text(&json!(true)), "true");
        assert_eq!(client_id_text(&json!(["a", 1])), "a,1");
    }

    #[test]
    fn falsy_client_id_is_empty() {
        for value in [json!(null), json!(false), json!(0), json!("")] {
            assert_eq!(client_id_text(&value), "", "{value}");
        }
    }

    #[test]
    fn null_means_defaults() {
        let options = PageOptions::from_value(Value::Null)
            .unwrap()
            .into_embed_options(None)
            .unwrap();
        assert_eq!(options, EmbedOptions::default());
    }

    #[test]
    fn camel_case_keys() {
        let page = PageOptions::from_value(json!({
            "apiEndpoint": "https://api.example/v1",
            "domain": "shop.example",
            "deploymentMode": "same-origin",
            "handshakeTimeoutMs": 2000,
        }))
        .unwrap();
        let options = page.into_embed_options(None).unwrap();
        assert_eq!(options.api_endpoint.as_deref(), Some("https://api.example/v1"));
        assert_eq!(options.domain.as_deref(), Some("shop.example"));
        assert_eq!(options.deployment_mode, DeploymentMode::SameOrigin);
        assert_eq!(options.handshake_timeout_ms, Some(2000));
    }

    #[test]
    fn empty_strings_fall_back() {
        let page = PageOptions::from_value(json!({
            "apiEndpoint": "",
            "domain": "",
            "sandbox": "",
        }))
        .unwrap();
        let options = page.into_embed_options(None).unwrap();
        assert_eq!(options.api_endpoint, None);
        assert_eq!(options.domain, None);
        assert_eq!(options.sandbox, DEFAULT_SANDBOX);
    }

    #[test]
    fn unknown_keys_ignored() {
        let page = PageOptions::from_value(json!({"onAcceptAll": {}, "theme": "dark"})).unwrap();
        assert_eq!(page, PageOptions::default());
    }

    #[test]
    fn global_host_used_unless_overridden() {
        let global = Some("https://consent.example/banner.html".to_string());

        let options = PageOptions::default()
            .into_embed_options(global.clone())
            .unwrap();
        assert_eq!(options.frame_host(), "https://consent.example/banner.html");

        let page = PageOptions {
            frame_host: Some("/banner.html".into()),
            ..PageOptions::default()
        };
        let options = page.into_embed_options(global).unwrap();
        assert_eq!(options.frame_host(), "/banner.html");
    }

    #[test]
    fn invalid_values_rejected() {
        let err = PageOptions::from_value(json!({"handshakeTimeoutMs": "soon"})).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));

        let page = PageOptions {
            api_endpoint: Some("ftp://api.example".into()),
            ..PageOptions::default()
        };
        assert!(matches!(
            page.into_embed_options(None),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
