//! Config validation.
//!
//! Collects every problem into a single `ConfigError::ValidationError`
//! so one run reports all of them.

use consent_common::ConfigError;
use url::Url;

use crate::schema::{ConsentConfig, EmbedOptions};

/// Keywords accepted in an iframe `sandbox` attribute.
pub const SANDBOX_TOKENS: &[&str] = &[
    "allow-downloads",
    "allow-forms",
    "allow-modals",
    "allow-orientation-lock",
    "allow-pointer-lock",
    "allow-popups",
    "allow-popups-to-escape-sandbox",
    "allow-presentation",
    "allow-same-origin",
    "allow-scripts",
    "allow-storage-access-by-user-activation",
    "allow-top-navigation",
    "allow-top-navigation-by-user-activation",
    "allow-top-navigation-to-custom-protocols",
];

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 120_000;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ConsentConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if let Some(client_id) = &config.client_id {
        if client_id.trim().is_empty() {
            errors.push("client_id must not be empty".into());
        }
    }

    validate_options(&mut errors, &config.embed);
    finish(errors)
}

/// Validate embed options passed without a config file.
pub fn validate_embed(options: &EmbedOptions) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    validate_options(&mut errors, options);
    finish(errors)
}

fn finish(errors: Vec<String>) -> Result<(), ConfigError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

pub(crate) fn validate_options(errors: &mut Vec<String>, options: &EmbedOptions) {
    if let Some(endpoint) = &options.api_endpoint {
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "api_endpoint scheme '{}' is not http or https",
                url.scheme()
            )),
            Err(e) => errors.push(format!("api_endpoint '{endpoint}' is not a URL: {e}")),
        }
    }

    if let Some(domain) = &options.domain {
        if domain.trim().is_empty() || domain.contains('/') {
            errors.push(format!("domain '{domain}' is not a hostname"));
        }
    }

    for token in options.sandbox.split_whitespace() {
        if !SANDBOX_TOKENS.contains(&token) {
            errors.push(format!("sandbox token '{token}' is unknown"));
        }
    }

    if let Some(origin) = &options.target_origin {
        if origin != "*" && !is_origin(origin) {
            errors.push(format!("target_origin '{origin}' is neither '*' nor an origin"));
        }
    }

    if let Some(ms) = options.handshake_timeout_ms {
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&ms) {
            errors.push(format!(
                "handshake_timeout_ms = {ms} is out of range [{MIN_TIMEOUT_MS}, {MAX_TIMEOUT_MS}]"
            ));
        }
    }

    if let Some(host) = &options.frame_host {
        if host.trim().is_empty() {
            errors.push("frame_host must not be empty".into());
        }
    }
}

/// `scheme://host[:port]` with nothing after it.
fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => url.has_host() && url.origin().ascii_serialization() == value,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(embed: EmbedOptions) -> ConsentConfig {
        ConsentConfig {
            client_id: Some("acme".into()),
            embed,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&ConsentConfig::default()).is_ok());
    }

    #[test]
    fn blank_client_id_rejected() {
        let config = ConsentConfig {
            client_id: Some("   ".into()),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    fn endpoint_must_be_http_url() {
        let config = config_with(EmbedOptions {
            api_endpoint: Some("ftp://consent.example".into()),
            ..Default::default()
        });
        assert!(validate(&config).is_err());

        let config = config_with(EmbedOptions {
            api_endpoint: Some("not a url".into()),
            ..Default::default()
        });
        assert!(validate(&config).is_err());

        let config = config_with(EmbedOptions {
            api_endpoint: Some("https://consent.example/api/v1".into()),
            ..Default::default()
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn unknown_sandbox_token_rejected() {
        let config = config_with(EmbedOptions {
            sandbox: "allow-scripts allow-everything".into(),
            ..Default::default()
        });
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("allow-everything"));
    }

    #[test]
    fn empty_sandbox_is_allowed() {
        let config = config_with(EmbedOptions {
            sandbox: String::new(),
            ..Default::default()
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn target_origin_must_be_wildcard_or_origin() {
        for ok in ["*", "https://shop.example", "http://localhost:8080"] {
            let config = config_with(EmbedOptions {
                target_origin: Some(ok.into()),
                ..Default::default()
            });
            assert!(validate(&config).is_ok(), "{ok} should be accepted");
        }

        for bad in ["https://shop.example/path", "shop.example", ""] {
            let config = config_with(EmbedOptions {
                target_origin: Some(bad.into()),
                ..Default::default()
            });
            assert!(validate(&config).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn timeout_range_checked() {
        for (ms, ok) in [(99, false), (100, true), (120_000, true), (120_001, false)] {
            let config = config_with(EmbedOptions {
                handshake_timeout_ms: Some(ms),
                ..Default::default()
            });
            assert_eq!(validate(&config).is_ok(), ok, "timeout {ms}");
        }
    }

    #[test]
    fn all_errors_collected() {
        let config = ConsentConfig {
            client_id: Some(String::new()),
            embed: EmbedOptions {
                api_endpoint: Some("nope".into()),
                sandbox: "allow-nothing".into(),
                handshake_timeout_ms: Some(0),
                ..Default::default()
            },
        };
        let msg = validate(&config).unwrap_err().to_string();
        assert_eq!(msg.matches("; ").count(), 3);
    }
}
