use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sandbox attribute applied to the iframe unless overridden.
pub const DEFAULT_SANDBOX: &str = "allow-scripts allow-same-origin allow-forms";

/// Banner document served next to the host page.
pub const SAME_ORIGIN_FRAME_HOST: &str = "/cookie-banner.html";

/// Banner document served from the public CDN.
pub const CDN_FRAME_HOST: &str =
    "https://cdn.jsdelivr.net/gh/SharanuSb/cookie-cdn@v1.1.1/dist/cookie-banner.html";

/// Where the banner document is served from relative to the host page.
///
/// In `CrossOrigin` mode the serving origin is not known up front: commands
/// are posted with a `*` target origin and inbound messages are checked by
/// sender window only. `SameOrigin` pins both to the page's own origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Banner document shares the host page's origin.
    SameOrigin,
    /// Banner document comes from another origin (usually a CDN).
    #[default]
    CrossOrigin,
}

impl DeploymentMode {
    /// How long `init()` waits for the widget's `initialized` message.
    pub fn handshake_timeout(self) -> Duration {
        match self {
            Self::SameOrigin => Duration::from_secs(5),
            Self::CrossOrigin => Duration::from_secs(10),
        }
    }

    /// Target origin used when posting commands into the iframe.
    pub fn default_target_origin(self, host_origin: &str) -> String {
        match self {
            Self::SameOrigin => host_origin.to_string(),
            Self::CrossOrigin => "*".to_string(),
        }
    }

    /// Whether inbound messages must carry the host's own origin.
    pub fn requires_origin_match(self) -> bool {
        matches!(self, Self::SameOrigin)
    }

    pub fn default_frame_host(self) -> &'static str {
        match self {
            Self::SameOrigin => SAME_ORIGIN_FRAME_HOST,
            Self::CrossOrigin => CDN_FRAME_HOST,
        }
    }
}

/// Options for one embedded banner. The client id is passed separately
/// to the controller; everything here is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedOptions {
    /// Consent API the banner document talks to, forwarded as `endpoint`.
    pub api_endpoint: Option<String>,
    /// Domain reported to the banner. Defaults to the host page's hostname.
    pub domain: Option<String>,
    /// Value of the iframe `sandbox` attribute.
    pub sandbox: String,
    pub deployment_mode: DeploymentMode,
    /// Overrides the mode's target origin for outbound commands.
    pub target_origin: Option<String>,
    /// Overrides the mode's banner document location.
    pub frame_host: Option<String>,
    /// Overrides the mode's handshake timeout.
    pub handshake_timeout_ms: Option<u64>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            domain: None,
            sandbox: DEFAULT_SANDBOX.into(),
            deployment_mode: DeploymentMode::default(),
            target_origin: None,
            frame_host: None,
            handshake_timeout_ms: None,
        }
    }
}

impl EmbedOptions {
    pub fn same_origin() -> Self {
        Self {
            deployment_mode: DeploymentMode::SameOrigin,
            ..Default::default()
        }
    }

    pub fn cross_origin() -> Self {
        Self {
            deployment_mode: DeploymentMode::CrossOrigin,
            ..Default::default()
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.deployment_mode.handshake_timeout())
    }

    pub fn frame_host(&self) -> &str {
        self.frame_host
            .as_deref()
            .unwrap_or_else(|| self.deployment_mode.default_frame_host())
    }

    pub fn target_origin(&self, host_origin: &str) -> String {
        self.target_origin
            .clone()
            .unwrap_or_else(|| self.deployment_mode.default_target_origin(host_origin))
    }

    pub fn domain_or<'a>(&'a self, hostname: &'a str) -> &'a str {
        self.domain.as_deref().unwrap_or(hostname)
    }
}

/// Top-level config file: a client id plus the `[embed]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub client_id: Option<String>,
    pub embed: EmbedOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_per_mode() {
        assert_eq!(
            DeploymentMode::SameOrigin.handshake_timeout(),
            Duration::from_secs(5)
        );
        assert_eq!(
            DeploymentMode::CrossOrigin.handshake_timeout(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn target_origin_per_mode() {
        let origin = "https://shop.example";
        assert_eq!(
            DeploymentMode::SameOrigin.default_target_origin(origin),
            "https://shop.example"
        );
        assert_eq!(DeploymentMode::CrossOrigin.default_target_origin(origin), "*");
    }

    #[test]
    fn only_same_origin_pins_inbound_origin() {
        assert!(DeploymentMode::SameOrigin.requires_origin_match());
        assert!(!DeploymentMode::CrossOrigin.requires_origin_match());
    }

    #[test]
    fn overrides_win_over_mode_defaults() {
        let options = EmbedOptions {
            target_origin: Some("https://cdn.example".into()),
            frame_host: Some("https://cdn.example/banner.html".into()),
            handshake_timeout_ms: Some(750),
            ..EmbedOptions::cross_origin()
        };
        assert_eq!(options.target_origin("https://shop.example"), "https://cdn.example");
        assert_eq!(options.frame_host(), "https://cdn.example/banner.html");
        assert_eq!(options.handshake_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn defaults_follow_mode() {
        let same = EmbedOptions::same_origin();
        assert_eq!(same.frame_host(), SAME_ORIGIN_FRAME_HOST);
        assert_eq!(same.handshake_timeout(), Duration::from_secs(5));

        let cross = EmbedOptions::default();
        assert_eq!(cross.frame_host(), CDN_FRAME_HOST);
        assert_eq!(cross.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(cross.sandbox, DEFAULT_SANDBOX);
    }

    #[test]
    fn domain_falls_back_to_hostname() {
        let options = EmbedOptions::default();
        assert_eq!(options.domain_or("shop.example"), "shop.example");

        let options = EmbedOptions {
            domain: Some("example.org".into()),
            ..Default::default()
        };
        assert_eq!(options.domain_or("shop.example"), "example.org");
    }

    #[test]
    fn deployment_mode_uses_kebab_case() {
        let json = serde_json::to_string(&DeploymentMode::SameOrigin).unwrap();
        assert_eq!(json, "\"same-origin\"");
        let mode: DeploymentMode = serde_json::from_str("\"cross-origin\"").unwrap();
        assert_eq!(mode, DeploymentMode::CrossOrigin);
    }
}
