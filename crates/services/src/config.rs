//! Client configuration.
//!
//! Layered the usual way: built-in defaults, then an optional `gradtrack.toml`,
//! then `GRADTRACK_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default API base url.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Which Domain Service implementation backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory fake seeded with demo data
    #[default]
    Mock,
    /// Real HTTP API at `api_url`
    Http,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The api url does not parse
    #[error("invalid api url {url}: {reason}")]
    InvalidUrl {
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base url of the HTTP API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Backend selection, fixed for the lifetime of the process
    #[serde(default)]
    pub backend: BackendKind,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Directory holding the persisted session
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,

    /// Artificial latency of the mock backend in milliseconds
    #[serde(default)]
    pub mock_latency_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            backend: BackendKind::default(),
            request_timeout_secs: default_request_timeout(),
            session_path: default_session_path(),
            mock_latency_ms: 0,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `gradtrack.toml` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("gradtrack")
    }

    /// Load configuration from the named file (extension optional, file
    /// optional) merged with `GRADTRACK_*` environment variables.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("GRADTRACK").try_parsing(true))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the api url is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Mock latency as a duration.
    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".gradtrack")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend, BackendKind::Mock);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ClientConfig::load_from("does-not-exist-gradtrack").unwrap();
        assert_eq!(config.session_path, PathBuf::from(".gradtrack"));
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = ClientConfig {
            api_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_backend_kind_names() {
        let kind: BackendKind = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(kind, BackendKind::Http);
    }
}
