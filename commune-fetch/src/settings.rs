//! Client settings.
//!
//! Settings configure the default [`ReqwestTransport`](crate::ReqwestTransport):
//! the user agent, headers sent with every request, the fallback timeout and
//! the redirect limit. They deserialize from JSON so front ends can load them
//! from a config file; every field has a default.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default redirect limit when redirects are followed.
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// User agent string for Commune.
pub const DEFAULT_USER_AGENT: &str = concat!("commune/", env!("CARGO_PKG_VERSION"));

/// Desktop Chrome user agent used by [`ClientSettings::browser_like`].
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ============================================================================
// Client Settings
// ============================================================================

/// Settings for the default transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClientSettings {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Headers sent with every request unless the request sets them.
    pub default_headers: BTreeMap<String, String>,
    /// Timeout applied when a request does not set its own (seconds).
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Maximum redirects followed for requests that follow redirects.
    pub max_redirects: usize,
    /// Skip certificate verification for every request.
    pub accept_invalid_certs: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: BTreeMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_invalid_certs: false,
        }
    }
}

impl ClientSettings {
    /// Settings that present as a desktop browser on the same origin.
    pub fn browser_like() -> Self {
        let default_headers = [
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Sec-Fetch-Dest", "empty"),
            ("Sec-Fetch-Mode", "cors"),
            ("Sec-Fetch-Site", "same-origin"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            default_headers,
            ..Self::default()
        }
    }

    /// Loads settings from a JSON file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Loaded client settings");
        Ok(settings)
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the fallback timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a default header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_redirects, 10);
        assert!(settings.user_agent.starts_with("commune/"));
        assert!(settings.default_headers.is_empty());
        assert!(!settings.accept_invalid_certs);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ClientSettings::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "user_agent": "test-agent", "accept_invalid_certs": true }"#)
            .unwrap();

        let settings = ClientSettings::load_from(&path).unwrap();
        assert_eq!(settings.user_agent, "test-agent");
        assert!(settings.accept_invalid_certs);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ClientSettings::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{ "timeout": 5, "default_headers": { "Accept-Language": "de" } }"#)
                .unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.max_redirects, 10);
        assert_eq!(
            settings.default_headers.get("Accept-Language").map(String::as_str),
            Some("de")
        );
    }

    #[test]
    fn test_browser_like() {
        let settings = ClientSettings::browser_like();
        assert!(settings.user_agent.contains("Chrome/"));
        assert_eq!(
            settings.default_headers.get("Sec-Fetch-Site").map(String::as_str),
            Some("same-origin")
        );
    }
}
