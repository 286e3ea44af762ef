//! Transport adapter.
//!
//! The [`Transport`] trait is the seam to the HTTP client. The adapter side
//! of this module turns whatever the transport returned into a
//! [`ResponseEnvelope`] with the body in the caller's requested
//! representation. No status interpretation happens here.

use async_trait::async_trait;
use bytes::Bytes;
use commune_core::{
    RequestDescriptor, ResponseBody, ResponseEnvelope, ResponseFormat, TransportError,
};
use http::HeaderMap;
use tracing::{debug, trace};
use url::Url;

// ============================================================================
// Transport Response
// ============================================================================

/// Raw response as produced by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_message: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: Url,
    /// Undecoded body bytes.
    pub body: Bytes,
}

impl TransportResponse {
    /// Creates a response with the canonical reason phrase for `status`.
    pub fn new(status: u16, url: Url, body: impl Into<Bytes>) -> Self {
        let status_message = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            status_message,
            headers: HeaderMap::new(),
            url,
            body: body.into(),
        }
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// An HTTP client capable of sending a [`RequestDescriptor`].
///
/// Implementations must honour method, headers, query, redirect flag,
/// timeout, TLS verification and every body variant. They must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the raw response.
    async fn send(&self, descriptor: &RequestDescriptor) -> Result<TransportResponse, TransportError>;
}

// ============================================================================
// Adapter
// ============================================================================

/// Sends a descriptor through the transport and wraps the result.
pub async fn perform(
    transport: &dyn Transport,
    descriptor: &RequestDescriptor,
    format: ResponseFormat,
) -> Result<ResponseEnvelope, TransportError> {
    debug!(method = %descriptor.method, url = %descriptor.url, body = descriptor.body.kind(), "Sending request");

    let response = transport.send(descriptor).await?;

    debug!(status = response.status, url = %response.url, bytes = response.body.len(), "Response received");
    Ok(into_envelope(response, format))
}

/// Converts a transport response into an envelope.
///
/// JSON that fails to decode becomes `ResponseBody::Json(None)` so the
/// malformed-payload classifier can report it later.
pub fn into_envelope(response: TransportResponse, format: ResponseFormat) -> ResponseEnvelope {
    let body = decode_body(response.body, format);

    ResponseEnvelope {
        status: response.status,
        status_message: response.status_message,
        headers: response.headers,
        body,
        url: response.url,
    }
}

fn decode_body(raw: Bytes, format: ResponseFormat) -> ResponseBody {
    match format {
        ResponseFormat::Json => match serde_json::from_slice(&raw) {
            Ok(value) => ResponseBody::Json(Some(value)),
            Err(e) => {
                trace!(error = %e, "Response body is not JSON");
                ResponseBody::Json(None)
            }
        },
        ResponseFormat::Bytes => ResponseBody::Bytes(raw),
        ResponseFormat::Text => match std::str::from_utf8(&raw) {
            Ok(text) => ResponseBody::Text(text.to_owned()),
            Err(_) => ResponseBody::Bytes(raw),
        },
    }
}
