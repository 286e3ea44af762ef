//! Fetch error types.

use std::path::PathBuf;

use commune_core::{RequestError, ResponseEnvelope, TransportError, TransportErrorKind};
use thiserror::Error;

// ============================================================================
// Request Failure
// ============================================================================

/// A request that was delivered with an error.
///
/// Carries the response envelope whenever the request got far enough to
/// receive one, so callers can still inspect status and body.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct RequestFailure {
    /// The delivered error.
    #[source]
    pub error: RequestError,
    /// The response, if the transport produced one.
    pub response: Option<ResponseEnvelope>,
}

impl RequestFailure {
    /// Creates a failure with no response.
    pub fn new(error: RequestError) -> Self {
        Self {
            error,
            response: None,
        }
    }

    /// Creates a failure that carries a response.
    pub fn with_response(error: RequestError, response: ResponseEnvelope) -> Self {
        Self {
            error,
            response: Some(response),
        }
    }
}

impl From<RequestError> for RequestFailure {
    fn from(error: RequestError) -> Self {
        Self::new(error)
    }
}

// ============================================================================
// Transport setup errors
// ============================================================================

/// Error building a transport or client.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A configured default header is not valid.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Error loading [`ClientSettings`](crate::ClientSettings) from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid settings JSON.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// reqwest error mapping
// ============================================================================

/// Maps a reqwest failure onto the transport error taxonomy.
pub(crate) fn transport_error(err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_redirect() {
        TransportErrorKind::Redirect
    } else if err.is_builder() || err.is_request() {
        TransportErrorKind::Request
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Other
    };

    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_is_error_display() {
        let failure = RequestFailure::new(RequestError::NotLoggedIn);
        assert_eq!(failure.to_string(), "Not Logged In");
        assert!(failure.response.is_none());
    }
}
