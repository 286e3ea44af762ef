//! Core error types for Commune.
//!
//! [`RequestError`] is the single error taxonomy delivered to callers. It is
//! `Clone` because the same error value is both delivered to the caller and
//! recorded on the request-completed event.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Request Error
// ============================================================================

/// Error delivered for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The caller's options could not be turned into a request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The pre-request hook vetoed the request.
    #[error("Request aborted: {0}")]
    Aborted(String),

    /// The site no longer considers the session authenticated.
    #[error("Not Logged In")]
    NotLoggedIn,

    /// The account is locked behind Family View.
    #[error("Family View Restricted")]
    FamilyViewRestricted,

    /// The site answered with a status code of 400 or above.
    #[error("HTTP error {status}")]
    Http {
        /// Response status code.
        status: u16,
    },

    /// The site rendered its generic error page.
    #[error("{0}")]
    Community(String),

    /// The site rendered an inline error message.
    #[error("{0}")]
    Domain(String),

    /// A JSON body was expected but the payload was empty or undecodable.
    #[error("Malformed JSON response")]
    MalformedResponse,
}

impl RequestError {
    /// Creates a [`RequestError::Aborted`] error with the given reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }

    /// Returns the HTTP status code carried by [`RequestError::Http`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this error means the session has expired.
    pub fn is_not_logged_in(&self) -> bool {
        matches!(self, Self::NotLoggedIn)
    }

    /// Returns true if the error happened in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// What went wrong inside the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Could not connect (DNS, refused, TLS handshake).
    Connect,
    /// The transport's timeout elapsed.
    Timeout,
    /// The redirect policy rejected the response.
    Redirect,
    /// The request could not be built (bad header, bad content type).
    Request,
    /// The response body could not be read.
    Body,
    /// Anything else.
    Other,
}

impl TransportErrorKind {
    /// Returns a short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connect => "connection failed",
            Self::Timeout => "timed out",
            Self::Redirect => "redirect error",
            Self::Request => "invalid request",
            Self::Body => "body error",
            Self::Other => "transport error",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A network-level failure reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport error ({kind}): {message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Message from the underlying client.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns true if the transport gave up because of a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_site_wording() {
        assert_eq!(RequestError::NotLoggedIn.to_string(), "Not Logged In");
        assert_eq!(
            RequestError::FamilyViewRestricted.to_string(),
            "Family View Restricted"
        );
        assert_eq!(RequestError::Http { status: 502 }.to_string(), "HTTP error 502");
        assert_eq!(
            RequestError::MalformedResponse.to_string(),
            "Malformed JSON response"
        );
        assert_eq!(
            RequestError::Community("The item you requested is gone.".into()).to_string(),
            "The item you requested is gone."
        );
    }

    #[test]
    fn test_status_code() {
        assert_eq!(RequestError::Http { status: 429 }.status_code(), Some(429));
        assert_eq!(RequestError::NotLoggedIn.status_code(), None);
    }

    #[test]
    fn test_transport_conversion() {
        let err: RequestError = TransportError::new(TransportErrorKind::Timeout, "deadline").into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Transport error (timed out): deadline");
    }
}
