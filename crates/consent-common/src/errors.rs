use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("client id is required")]
    MissingClientId,

    #[error("invalid frame url: {0}")]
    InvalidFrameUrl(String),

    #[error("no api endpoint configured")]
    MissingEndpoint,

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Every failure the embed can report through its error callback.
///
/// Errors are `Clone` because a single handshake outcome is handed to
/// every caller awaiting the same `init()`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbedError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cookie banner initialization timeout after {}ms", .0.as_millis())]
    InitializationTimeout(Duration),

    #[error("failed to load cookie banner iframe: {0}")]
    FrameLoadFailed(String),

    #[error("cookie banner iframe not available")]
    FrameUnavailable,

    #[error("error processing message: {0}")]
    MessageProcessing(String),

    #[error("cookie banner reported: {0}")]
    Remote(String),

    #[error("network error: {0}")]
    Network(String),
}

impl EmbedError {
    /// Whether the error came from the handshake rather than a later message.
    pub fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            Self::InitializationTimeout(_) | Self::FrameLoadFailed(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::MissingClientId.to_string(),
            "client id is required"
        );

        let err = ConfigError::InvalidFrameUrl("relative URL without a base".into());
        assert_eq!(
            err.to_string(),
            "invalid frame url: relative URL without a base"
        );

        let err = ConfigError::ValidationError("sandbox token 'allow-x' is unknown".into());
        assert_eq!(
            err.to_string(),
            "config validation error: sandbox token 'allow-x' is unknown"
        );
    }

    #[test]
    fn timeout_display_uses_millis() {
        let err = EmbedError::InitializationTimeout(Duration::from_secs(10));
        assert_eq!(
            err.to_string(),
            "cookie banner initialization timeout after 10000ms"
        );
    }

    #[test]
    fn embed_error_from_config() {
        let err: EmbedError = ConfigError::MissingEndpoint.into();
        assert!(matches!(err, EmbedError::Config(ConfigError::MissingEndpoint)));
        assert_eq!(err.to_string(), "no api endpoint configured");
    }

    #[test]
    fn embed_error_other_variants() {
        let err = EmbedError::FrameLoadFailed("net::ERR_BLOCKED".into());
        assert_eq!(
            err.to_string(),
            "failed to load cookie banner iframe: net::ERR_BLOCKED"
        );

        assert_eq!(
            EmbedError::FrameUnavailable.to_string(),
            "cookie banner iframe not available"
        );

        let err = EmbedError::Remote("consent service unreachable".into());
        assert_eq!(
            err.to_string(),
            "cookie banner reported: consent service unreachable"
        );

        let err = EmbedError::MessageProcessing("callback failed".into());
        assert_eq!(err.to_string(), "error processing message: callback failed");
    }

    #[test]
    fn handshake_failures_are_classified() {
        assert!(EmbedError::InitializationTimeout(Duration::from_secs(5)).is_handshake_failure());
        assert!(EmbedError::FrameLoadFailed("x".into()).is_handshake_failure());
        assert!(EmbedError::from(ConfigError::InvalidFrameUrl("x".into())).is_handshake_failure());
        assert!(!EmbedError::Remote("x".into()).is_handshake_failure());
        assert!(!EmbedError::FrameUnavailable.is_handshake_failure());
    }

    #[test]
    fn errors_clone_equal() {
        let err = EmbedError::InitializationTimeout(Duration::from_millis(250));
        assert_eq!(err.clone(), err);
    }
}
