//! Normalized request types.
//!
//! A [`RequestDescriptor`] is the transport-agnostic form of one outgoing
//! request. It is produced from caller options by the descriptor builder
//! and consumed by the transport.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::Deserialize;
use url::Url;

// ============================================================================
// Payload
// ============================================================================

/// Body content supplied by the caller, either text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PayloadRepr")]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
}

impl Payload {
    /// Returns the payload as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Returns true if the payload has no content.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Returns the number of bytes in the payload.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

/// Loose JSON shapes accepted for a payload. Scalars are stringified.
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadRepr {
    Text(String),
    Bytes(Vec<u8>),
    Number(serde_json::Number),
    Bool(bool),
}

impl From<PayloadRepr> for Payload {
    fn from(repr: PayloadRepr) -> Self {
        match repr {
            PayloadRepr::Text(text) => Self::Text(text),
            PayloadRepr::Bytes(bytes) => Self::Bytes(Bytes::from(bytes)),
            PayloadRepr::Number(number) => Self::Text(number.to_string()),
            PayloadRepr::Bool(flag) => Self::Text(flag.to_string()),
        }
    }
}

// ============================================================================
// Multipart Part
// ============================================================================

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    content: Payload,
    content_type: Option<String>,
    filename: Option<String>,
}

impl MultipartPart {
    /// Creates a part with content only.
    pub fn new(content: impl Into<Payload>) -> Self {
        Self {
            content: content.into(),
            content_type: None,
            filename: None,
        }
    }

    /// Creates a part with content, content type and filename.
    pub fn with_details(
        content: impl Into<Payload>,
        content_type: Option<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            content: content.into(),
            content_type,
            filename,
        }
    }

    /// The part content.
    pub fn content(&self) -> &Payload {
        &self.content
    }

    /// The declared content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The declared filename, if any.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

// ============================================================================
// Request Body
// ============================================================================

/// The body variant of a request. Exactly one is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Raw body sent as-is.
    Raw(Payload),
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// `multipart/form-data` parts keyed by field name.
    Multipart(Vec<(String, MultipartPart)>),
}

impl RequestBody {
    /// Returns true if there is no body.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Raw(_) => "raw",
            Self::Form(_) => "form",
            Self::Multipart(_) => "multipart",
        }
    }
}

// ============================================================================
// Response Format
// ============================================================================

/// How the caller wants the response body represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    /// Decode the body as JSON.
    Json,
    /// Keep the raw bytes.
    Bytes,
    /// Decode as text, falling back to bytes.
    #[default]
    Text,
}

// ============================================================================
// Request Descriptor
// ============================================================================

/// Normalized, transport-agnostic representation of one outgoing request.
///
/// Unset optional fields (`timeout`) fall back to the transport's defaults.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Resolved target URL.
    pub url: Url,
    /// Request headers (case-insensitive keys).
    pub headers: HeaderMap,
    /// Query string pairs appended to the URL.
    pub query: Vec<(String, String)>,
    /// Body variant.
    pub body: RequestBody,
    /// Whether redirects are followed.
    pub follow_redirects: bool,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Whether the TLS certificate must verify.
    pub verify_tls: bool,
}

impl RequestDescriptor {
    /// Creates a descriptor with no headers, no body and transport defaults.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::None,
            follow_redirects: true,
            timeout: None,
            verify_tls: true,
        }
    }

    /// Returns the value of a header as text, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_loose_json() {
        let text: Payload = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(text, Payload::Text("hello".into()));

        let number: Payload = serde_json::from_str("730").unwrap();
        assert_eq!(number, Payload::Text("730".into()));

        let bytes: Payload = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(bytes, Payload::Bytes(Bytes::from_static(&[1, 2, 3])));
    }

    #[test]
    fn test_descriptor_defaults() {
        let url = Url::parse("https://example.com/").unwrap();
        let descriptor = RequestDescriptor::new(Method::GET, url);
        assert!(descriptor.follow_redirects);
        assert!(descriptor.verify_tls);
        assert!(descriptor.body.is_none());
        assert!(descriptor.header("origin").is_none());
    }
}
