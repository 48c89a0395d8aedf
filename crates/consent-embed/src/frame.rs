//! The banner iframe: its URL, attributes, and the two layouts it toggles
//! between.

use consent_common::ConfigError;
use serde::Serialize;
use url::Url;

use crate::protocol::PROTOCOL_VERSION;

pub const FRAME_TITLE: &str = "Cookie Preferences";
pub const FRAME_ARIA_LABEL: &str = "Cookie Preferences Dialog";
pub const FRAME_Z_INDEX: &str = "2147483647";

/// Geometry of the iframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLayout {
    /// 0×0, anchored bottom-right.
    Collapsed,
    /// Full viewport, anchored top-left.
    Overlay,
}

impl FrameLayout {
    pub fn size(self) -> &'static str {
        match self {
            Self::Collapsed => "0",
            Self::Overlay => "100%",
        }
    }

    /// `(top, left, right, bottom)`.
    pub fn anchors(self) -> [&'static str; 4] {
        match self {
            Self::Collapsed => ["auto", "auto", "0", "0"],
            Self::Overlay => ["0", "0", "auto", "auto"],
        }
    }
}

/// Everything about the iframe's style that ever changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameStyle {
    pub layout: FrameLayout,
    pub visible: bool,
    pub interactive: bool,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self::hidden()
    }
}

impl FrameStyle {
    /// Initial state: no footprint, invisible, click-through.
    pub const fn hidden() -> Self {
        Self {
            layout: FrameLayout::Collapsed,
            visible: false,
            interactive: false,
        }
    }

    /// Full overlay, visible and interactive.
    pub const fn shown() -> Self {
        Self {
            layout: FrameLayout::Overlay,
            visible: true,
            interactive: true,
        }
    }

    pub fn with_layout(self, layout: FrameLayout) -> Self {
        Self { layout, ..self }
    }

    pub fn opacity(&self) -> &'static str {
        if self.visible {
            "1"
        } else {
            "0"
        }
    }

    pub fn pointer_events(&self) -> &'static str {
        if self.interactive {
            "auto"
        } else {
            "none"
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.layout == FrameLayout::Collapsed
    }

    /// The CSS properties that vary, in the order they are applied.
    pub fn declarations(&self) -> Vec<(&'static str, &'static str)> {
        let [top, left, right, bottom] = self.layout.anchors();
        vec![
            ("width", self.layout.size()),
            ("height", self.layout.size()),
            ("top", top),
            ("left", left),
            ("right", right),
            ("bottom", bottom),
            ("opacity", self.opacity()),
            ("pointer-events", self.pointer_events()),
        ]
    }

    /// Full `style` attribute, including the fixed properties.
    pub fn css_text(&self) -> String {
        let mut css = String::from("position: fixed; border: none; ");
        for (name, value) in self.declarations() {
            css.push_str(name);
            css.push_str(": ");
            css.push_str(value);
            css.push_str("; ");
        }
        css.push_str("z-index: ");
        css.push_str(FRAME_Z_INDEX);
        css.push(';');
        css
    }
}

/// Query parameters carried by the iframe URL.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams<'a> {
    pub client_id: &'a str,
    pub domain: &'a str,
    pub endpoint: Option<&'a str>,
}

/// Resolve the banner document location against the host origin.
///
/// Absolute URLs are used as-is; paths are joined onto `origin`.
pub fn resolve_frame_host(host: &str, origin: &str) -> Result<Url, ConfigError> {
    match Url::parse(host) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(origin)
            .and_then(|base| base.join(host))
            .map_err(|e| ConfigError::InvalidFrameUrl(format!("{host} (base {origin}): {e}"))),
        Err(e) => Err(ConfigError::InvalidFrameUrl(format!("{host}: {e}"))),
    }
}

/// `<host>?clientId=<id>&domain=<domain>&version=<ver>[&endpoint=<api>]`
pub fn build_frame_url(
    host: &str,
    origin: &str,
    params: FrameParams<'_>,
) -> Result<Url, ConfigError> {
    let mut url = resolve_frame_host(host, origin)?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidFrameUrl(format!(
            "{url} cannot carry query parameters"
        )));
    }

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("clientId", params.client_id);
        query.append_pair("domain", params.domain);
        query.append_pair("version", PROTOCOL_VERSION);
        if let Some(endpoint) = params.endpoint {
            query.append_pair("endpoint", endpoint);
        }
    }

    Ok(url)
}

/// What the host needs to create the iframe element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSpec {
    pub url: Url,
    pub sandbox: String,
    pub style: FrameStyle,
}

impl FrameSpec {
    pub fn new(url: Url, sandbox: impl Into<String>) -> Self {
        Self {
            url,
            sandbox: sandbox.into(),
            style: FrameStyle::hidden(),
        }
    }

    /// Accessibility attributes: a hidden, unfocusable dialog region.
    pub fn attributes(&self) -> [(&'static str, &'static str); 5] {
        [
            ("title", FRAME_TITLE),
            ("aria-hidden", "true"),
            ("tabindex", "-1"),
            ("role", "dialog"),
            ("aria-label", FRAME_ARIA_LABEL),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://shop.example";

    fn params(endpoint: Option<&str>) -> FrameParams<'_> {
        FrameParams {
            client_id: "acme",
            domain: "shop.example",
            endpoint,
        }
    }

    #[test]
    fn relative_host_joins_origin() {
        let url = build_frame_url("/cookie-banner.html", ORIGIN, params(None)).unwrap();
        assert_eq!(
            url.as_str(),
            concat!(
                "https://shop.example/cookie-banner.html",
                "?clientId=acme&domain=shop.example&version=1.1.1"
            )
        );
    }

    #[test]
    fn absolute_host_kept() {
        let url = build_frame_url(
            "https://cdn.example/banner.html",
            ORIGIN,
            params(Some("https://api.example/v1")),
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("cdn.example"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("clientId".into(), "acme".into()),
                ("domain".into(), "shop.example".into()),
                ("version".into(), PROTOCOL_VERSION.into()),
                ("endpoint".into(), "https://api.example/v1".into()),
            ]
        );
    }

    #[test]
    fn existing_query_is_preserved() {
        let url = build_frame_url("https://cdn.example/b.html?theme=dark", ORIGIN, params(None))
            .unwrap();
        assert!(url.as_str().starts_with("https://cdn.example/b.html?theme=dark&clientId=acme"));
    }

    #[test]
    fn client_id_is_escaped() {
        let url = build_frame_url(
            "/b.html",
            ORIGIN,
            FrameParams {
                client_id: "a&b=c",
                domain: "shop.example",
                endpoint: None,
            },
        )
        .unwrap();
        assert!(url.as_str().contains("clientId=a%26b%3Dc"));
    }

    #[test]
    fn relative_host_with_bad_origin_fails() {
        let err = build_frame_url("/b.html", "not an origin", params(None)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFrameUrl(_)));
    }

    #[test]
    fn unbaseable_host_fails() {
        let err = build_frame_url("mailto:dpo@shop.example", ORIGIN, params(None)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFrameUrl(_)));
    }

    #[test]
    fn hidden_style_has_no_footprint() {
        let style = FrameStyle::hidden();
        let css = style.css_text();
        assert!(css.contains("width: 0;"));
        assert!(css.contains("height: 0;"));
        assert!(css.contains("opacity: 0;"));
        assert!(css.contains("pointer-events: none;"));
        assert!(css.contains("position: fixed;"));
        assert!(css.contains("z-index: 2147483647;"));
        assert!(css.contains("bottom: 0;"));
        assert!(css.contains("right: 0;"));
    }

    #[test]
    fn overlay_anchors_top_left() {
        let style = FrameStyle::shown();
        let decls = style.declarations();
        assert!(decls.contains(&("width", "100%")));
        assert!(decls.contains(&("top", "0")));
        assert!(decls.contains(&("right", "auto")));
        assert!(decls.contains(&("opacity", "1")));
        assert!(decls.contains(&("pointer-events", "auto")));
    }

    #[test]
    fn resize_keeps_visibility() {
        let style = FrameStyle::hidden().with_layout(FrameLayout::Overlay);
        assert_eq!(style.layout, FrameLayout::Overlay);
        assert!(!style.visible);
        assert!(!style.interactive);
    }

    #[test]
    fn spec_attributes_mark_hidden_dialog() {
        let spec = FrameSpec::new(
            Url::parse("https://cdn.example/b.html").unwrap(),
            "allow-scripts",
        );
        let attrs = spec.attributes();
        assert!(attrs.contains(&("role", "dialog")));
        assert!(attrs.contains(&("aria-hidden", "true")));
        assert!(attrs.contains(&("tabindex", "-1")));
        assert_eq!(spec.style, FrameStyle::hidden());
    }
}
