//! Backend endpoint configuration.
//!
//! The client talks to exactly one backend.  Its address is a single base
//! value (for example `ws://localhost:3000`) with the fixed path suffix `/ws`
//! appended.  [`LinkConfig::endpoint`] performs that derivation once; the
//! connection layer stores the resulting [`Url`] and never re-reads the
//! configuration, so a `reset` always reconnects to the address resolved at
//! startup.
//!
//! # File format
//!
//! Every field is optional; missing fields fall back to [`LinkConfig::default`].
//!
//! ```toml
//! backend = "wss://panda.example.com"
//! path = "/ws"
//! close_timeout_secs = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Path appended to the backend address when none is configured.
pub const DEFAULT_PATH: &str = "/ws";

/// Error type for configuration parsing and endpoint derivation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The combined backend address and path is not a valid absolute URL.
    #[error("invalid backend address '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// The backend address uses a scheme that cannot carry a WebSocket.
    #[error("unsupported backend scheme '{0}' (expected ws, wss, http or https)")]
    UnsupportedScheme(String),

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings for the real-time connection.
///
/// Build once at startup, derive the endpoint with [`LinkConfig::endpoint`],
/// and hand the result to the connection manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Base address of the backend, without the WebSocket path.
    ///
    /// `http`/`https` are accepted and mapped to `ws`/`wss`.
    pub backend: String,

    /// Fixed path suffix of the message endpoint.
    pub path: String,

    /// How long a locally initiated close waits for the server's Close frame
    /// before the transport drops the TCP stream.
    pub close_timeout_secs: u64,
}

impl Default for LinkConfig {
    /// | Field              | Default               |
    /// |--------------------|-----------------------|
    /// | backend            | `ws://localhost:3000` |
    /// | path               | `/ws`                 |
    /// | close_timeout_secs | 5                     |
    fn default() -> Self {
        Self {
            backend: "ws://localhost:3000".to_string(),
            path: DEFAULT_PATH.to_string(),
            close_timeout_secs: 5,
        }
    }
}

impl LinkConfig {
    /// Creates a config for `backend` with every other field defaulted.
    pub fn with_backend(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Self::default()
        }
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has
    /// the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its content is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// The close handshake timeout as a [`Duration`].
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    /// Derives the WebSocket endpoint: the backend address with the path
    /// suffix appended.
    ///
    /// A trailing `/` on the backend is dropped before appending so that
    /// `http://host/` and `http://host` resolve to the same endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the result does not parse as an
    /// absolute URL, and [`ConfigError::UnsupportedScheme`] for schemes other
    /// than `ws`, `wss`, `http` and `https`.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let path = self.path.trim_start_matches('/');
        let raw = format!("{}/{}", self.backend.trim_end_matches('/'), path);

        let mut url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
            value: raw.clone(),
            source,
        })?;

        let mapped = match url.scheme() {
            "ws" | "wss" => None,
            "http" => Some("ws"),
            "https" => Some("wss"),
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        if let Some(scheme) = mapped {
            url.set_scheme(scheme)
                .map_err(|()| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        }

        Ok(url)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_localhost_ws() {
        // Arrange
        let cfg = LinkConfig::default();

        // Act
        let url = cfg.endpoint().unwrap();

        // Assert
        assert_eq!(url.as_str(), "ws://localhost:3000/ws");
    }

    #[test]
    fn test_trailing_slash_on_backend_is_not_doubled() {
        let cfg = LinkConfig::with_backend("ws://panda.example.com/");
        assert_eq!(cfg.endpoint().unwrap().as_str(), "ws://panda.example.com/ws");
    }

    #[test]
    fn test_backend_with_base_path_keeps_it() {
        let cfg = LinkConfig::with_backend("wss://panda.example.com/api");
        assert_eq!(
            cfg.endpoint().unwrap().as_str(),
            "wss://panda.example.com/api/ws"
        );
    }

    #[test]
    fn test_http_maps_to_ws() {
        let cfg = LinkConfig::with_backend("http://127.0.0.1:3000");
        let url = cfg.endpoint().unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(3000));
    }

    #[test]
    fn test_https_maps_to_wss() {
        let cfg = LinkConfig::with_backend("https://panda.example.com");
        assert_eq!(cfg.endpoint().unwrap().as_str(), "wss://panda.example.com/ws");
    }

    #[test]
    fn test_custom_path_without_leading_slash() {
        let cfg = LinkConfig {
            path: "socket".to_string(),
            ..LinkConfig::default()
        };
        assert_eq!(cfg.endpoint().unwrap().path(), "/socket");
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        // Arrange
        let cfg = LinkConfig::with_backend("ftp://panda.example.com");

        // Act
        let result = cfg.endpoint();

        // Assert
        assert!(matches!(result, Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"));
    }

    #[test]
    fn test_relative_backend_is_invalid_url() {
        let cfg = LinkConfig::with_backend("not a url");
        assert!(matches!(cfg.endpoint(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_toml_missing_fields_use_defaults() {
        // Arrange: only the backend is set
        let content = r#"backend = "wss://panda.example.com""#;

        // Act
        let cfg = LinkConfig::from_toml_str(content).unwrap();

        // Assert
        assert_eq!(cfg.backend, "wss://panda.example.com");
        assert_eq!(cfg.path, DEFAULT_PATH);
        assert_eq!(cfg.close_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_toml_empty_document_equals_default() {
        let cfg = LinkConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, LinkConfig::default());
    }

    #[test]
    fn test_toml_wrong_type_is_parse_error() {
        let result = LinkConfig::from_toml_str("close_timeout_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = LinkConfig::load(Path::new("/nonexistent/panda/link.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
