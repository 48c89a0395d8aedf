//! Browser bindings for the cookie consent banner embed.
//!
//! On `wasm32` this exports `CookieBannerEmbed` to JavaScript, backed by a
//! DOM implementation of [`consent_embed::EmbedHost`]. Option parsing does
//! not depend on the target and is tested natively.

#![forbid(unsafe_code)]

pub mod options;

#[cfg(target_arch = "wasm32")]
mod bindings;
#[cfg(target_arch = "wasm32")]
pub mod browser;

#[cfg(target_arch = "wasm32")]
pub use bindings::CookieBannerEmbed;
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserHost;
pub use options::PageOptions;
