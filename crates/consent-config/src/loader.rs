//! TOML config loading: read from a path, a string, or the platform default.

use std::path::{Path, PathBuf};

use consent_common::ConfigError;
use tracing::{info, warn};

use crate::schema::ConsentConfig;
use crate::validation;

/// Parse a config from TOML text.
///
/// Missing fields take their serde defaults. Validation problems are logged
/// and the parsed config is returned as-is; callers that need a hard failure
/// run [`validation::validate`] themselves.
pub fn load_from_str(content: &str) -> Result<ConsentConfig, ConfigError> {
    let config: ConsentConfig = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
    }

    Ok(config)
}

/// Load config from a specific TOML file path.
pub fn load_from_path(path: &Path) -> Result<ConsentConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config = load_from_str(&content)?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Platform config location.
///
/// On macOS: `~/Library/Application Support/consent-embed/config.toml`
/// On Linux: `~/.config/consent-embed/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("consent-embed").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Load config from the platform default path, falling back to defaults
/// when no file exists there.
pub fn load_default() -> Result<ConsentConfig, ConfigError> {
    let path = default_config_path()?;
    if !path.exists() {
        info!("no config found at {}, using defaults", path.display());
        return Ok(ConsentConfig::default());
    }
    load_from_path(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeploymentMode;

    #[test]
    fn load_from_nonexistent_returns_parse_error() {
        let result = load_from_path(Path::new("/tmp/nonexistent_consent_config.toml"));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn load_valid_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
client_id = "acme-shop"

[embed]
api_endpoint = "https://consent.example/api"
deployment_mode = "same-origin"
"#,
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("acme-shop"));
        assert_eq!(
            config.embed.api_endpoint.as_deref(),
            Some("https://consent.example/api")
        );
        assert_eq!(config.embed.deployment_mode, DeploymentMode::SameOrigin);
        // Defaults preserved
        assert_eq!(config.embed.sandbox, crate::DEFAULT_SANDBOX);
        assert!(config.embed.frame_host.is_none());
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, ConsentConfig::default());
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let result = load_from_str("this is not valid toml {{{");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn invalid_values_are_returned_with_warning() {
        let config = load_from_str(
            r#"
[embed]
handshake_timeout_ms = 1
"#,
        )
        .unwrap();
        assert_eq!(config.embed.handshake_timeout_ms, Some(1));
    }

    #[test]
    fn default_config_path_is_reasonable() {
        if let Ok(path) = default_config_path() {
            let path_str = path.to_string_lossy();
            assert!(path_str.contains("consent-embed"));
            assert!(path_str.ends_with("config.toml"));
        }
    }
}
