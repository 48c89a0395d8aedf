//! Consent embed configuration.
//!
//! Options for one embedded banner: where the iframe document lives, which
//! client it belongs to, and how strictly cross-document messages are
//! checked. Every field has a default so a partial TOML file is enough.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use consent_config::{load_from_path, options_to_json};
//!
//! let config = load_from_path("consent.toml".as_ref()).expect("failed to load config");
//! println!("{}", options_to_json(&config.embed));
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config_path, load_default, load_from_path, load_from_str};
pub use schema::{
    ConsentConfig, DeploymentMode, EmbedOptions, CDN_FRAME_HOST, DEFAULT_SANDBOX,
    SAME_ORIGIN_FRAME_HOST,
};
pub use validation::{validate, validate_embed};

/// Serialize embed options to a pretty-printed JSON string.
pub fn options_to_json(options: &EmbedOptions) -> String {
    serde_json::to_string_pretty(options)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize options: {e}\"}}"))
}
