//! Uniform response envelope handed to callers and classifiers.

use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;
use url::Url;

// ============================================================================
// Response Body
// ============================================================================

/// Response body in the representation the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Decoded JSON. `None` when the payload did not decode.
    Json(Option<Value>),
    /// Raw bytes.
    Bytes(Bytes),
    /// Decoded text.
    Text(String),
}

impl ResponseBody {
    /// Returns the body as text, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the decoded JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Returns the raw bytes, if the body was kept binary.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns true if the JSON payload is missing or falsy
    /// (`null`, `false`, `0`, `""`).
    ///
    /// Empty arrays and objects count as present.
    pub fn is_falsy_json(&self) -> bool {
        match self {
            Self::Json(None) => true,
            Self::Json(Some(value)) => json_is_falsy(value),
            _ => false,
        }
    }
}

fn json_is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

/// Status, headers and body of a completed response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// Status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_message: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body in the caller's requested representation.
    pub body: ResponseBody,
    /// Final URL after redirects.
    pub url: Url,
}

impl ResponseEnvelope {
    /// Returns a header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Location` header, if present.
    pub fn location(&self) -> Option<&str> {
        self.header(http::header::LOCATION.as_str())
    }

    /// Returns true for 3xx responses.
    pub fn is_redirect(&self) -> bool {
        (300..=399).contains(&self.status)
    }

    /// Returns true for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Returns the body text, if the body is textual.
    pub fn text(&self) -> Option<&str> {
        self.body.as_text()
    }

    /// Returns the decoded JSON body, if any.
    pub fn json(&self) -> Option<&Value> {
        self.body.as_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_json() {
        assert!(ResponseBody::Json(None).is_falsy_json());
        assert!(ResponseBody::Json(Some(Value::Null)).is_falsy_json());
        assert!(ResponseBody::Json(Some(json!(false))).is_falsy_json());
        assert!(ResponseBody::Json(Some(json!(0))).is_falsy_json());
        assert!(ResponseBody::Json(Some(json!(""))).is_falsy_json());
        assert!(ResponseBody::Json(Some(json!(0.0))).is_falsy_json());
        assert!(!ResponseBody::Json(Some(json!(1e-20))).is_falsy_json());
        assert!(!ResponseBody::Json(Some(json!(-1))).is_falsy_json());

        assert!(!ResponseBody::Json(Some(json!({}))).is_falsy_json());
        assert!(!ResponseBody::Json(Some(json!([]))).is_falsy_json());
        assert!(!ResponseBody::Json(Some(json!({"success": 1}))).is_falsy_json());
        assert!(!ResponseBody::Text(String::new()).is_falsy_json());
    }
}
