//! Caller-facing request options.
//!
//! [`RequestOptions`] is the loosely-typed options bag callers hand to the
//! client. It deserializes from the camelCase JSON shape community scripts
//! already use (`formData`, `followRedirect`, `checkHttpError`, ...) and can
//! also be built in code with the chained setters.
//!
//! Nothing here is validated; the descriptor builder in `commune-fetch`
//! decides what the options mean.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::request::Payload;

// ============================================================================
// Form Field
// ============================================================================

/// Extra options for a structured multipart field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldOptions {
    /// Content type of the part.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Filename reported for the part.
    #[serde(default)]
    pub filename: Option<String>,
}

/// A multipart field value: a plain scalar, or `{ value, options }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormField {
    /// Content plus part options.
    Detailed {
        /// Part content.
        value: Payload,
        /// Part options.
        #[serde(default)]
        options: FormFieldOptions,
    },
    /// Content only.
    Scalar(Payload),
}

impl FormField {
    /// Creates a file-like field with a filename and content type.
    pub fn file(
        value: impl Into<Payload>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::Detailed {
            value: value.into(),
            options: FormFieldOptions {
                content_type: Some(content_type.into()),
                filename: Some(filename.into()),
            },
        }
    }
}

impl From<Payload> for FormField {
    fn from(value: Payload) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for FormField {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for FormField {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<Vec<u8>> for FormField {
    fn from(value: Vec<u8>) -> Self {
        Self::Scalar(value.into())
    }
}

// ============================================================================
// Body Encoding
// ============================================================================

/// How a non-JSON response body should be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Decode as text when possible.
    #[default]
    Text,
    /// Keep raw bytes (`"encoding": null` in JSON options).
    Binary,
}

fn deserialize_encoding<'de, D>(deserializer: D) -> Result<BodyEncoding, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(match value.as_deref() {
        None | Some("binary") => BodyEncoding::Binary,
        Some(_) => BodyEncoding::Text,
    })
}

// ============================================================================
// Loose field helpers
// ============================================================================

/// Keeps booleans and ignores anything else.
fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Some(flag),
        _ => None,
    })
}

/// Timeout given in milliseconds.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

/// String map whose values may be any JSON scalar. `null` entries are dropped.
fn deserialize_scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_scalar_map(deserializer)?.unwrap_or_default())
}

/// Like [`deserialize_scalar_map`], but a `null` map stays absent.
fn deserialize_optional_scalar_map<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw.map(|map| {
        map.into_iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key, v)))
            .collect()
    }))
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Request Options
// ============================================================================

/// Options for a single request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Target URL (primary name).
    #[serde(default)]
    pub uri: Option<String>,
    /// Target URL (alias).
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP method, case-insensitive. Defaults to GET.
    #[serde(default)]
    pub method: Option<String>,
    /// Request headers.
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub headers: BTreeMap<String, String>,
    /// Query string parameters.
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub qs: BTreeMap<String, String>,
    /// Multipart form fields.
    #[serde(default)]
    pub form_data: Option<BTreeMap<String, FormField>>,
    /// URL-encoded form fields.
    #[serde(default, deserialize_with = "deserialize_optional_scalar_map")]
    pub form: Option<BTreeMap<String, String>>,
    /// Raw request body. An empty body is treated as absent.
    #[serde(default)]
    pub body: Option<Payload>,
    /// Expect a JSON response.
    #[serde(default)]
    pub json: bool,
    /// Response decoding for non-JSON bodies.
    #[serde(default, deserialize_with = "deserialize_encoding")]
    pub encoding: BodyEncoding,
    /// Legacy redirect flag.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub follow_redirect: Option<bool>,
    /// Legacy redirect flag; wins over `follow_redirect` when both are set.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub follow_all_redirects: Option<bool>,
    /// Per-request timeout (milliseconds in JSON).
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub timeout: Option<Duration>,
    /// Reject invalid TLS certificates. Defaults to true.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub reject_unauthorized: Option<bool>,
    /// Set to `false` to skip the HTTP/transport classifier.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub check_http_error: Option<bool>,
    /// Set to `false` to skip the generic error-page classifier.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub check_community_error: Option<bool>,
    /// Set to `false` to skip the inline error-message classifier.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub check_trade_error: Option<bool>,
    /// Set to `false` to skip the malformed-JSON classifier.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub check_json_error: Option<bool>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options targeting the given URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self::new().url(url)
    }

    /// Parses options from a JSON value in the camelCase options shape.
    ///
    /// # Errors
    ///
    /// Returns an error if a field has a shape that cannot be interpreted.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Returns the target URL, preferring `uri` over `url`.
    pub fn target(&self) -> Option<&str> {
        self.uri.as_deref().or(self.url.as_deref())
    }

    /// Sets both `uri` and `url` to the given target.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.uri = Some(url.clone());
        self.url = Some(url);
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query string parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qs.insert(key.into(), value.into());
        self
    }

    /// Adds a URL-encoded form field.
    #[must_use]
    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Adds a multipart form field.
    #[must_use]
    pub fn multipart_field(mut self, key: impl Into<String>, field: impl Into<FormField>) -> Self {
        self.form_data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), field.into());
        self
    }

    /// Sets a raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Expects a JSON response.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Keeps non-JSON response bodies as raw bytes.
    #[must_use]
    pub fn binary(mut self) -> Self {
        self.encoding = BodyEncoding::Binary;
        self
    }

    /// Sets whether redirects are followed.
    #[must_use]
    pub fn follow_redirect(mut self, follow: bool) -> Self {
        self.follow_redirect = Some(follow);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets whether invalid TLS certificates are rejected.
    #[must_use]
    pub fn reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = Some(reject);
        self
    }

    /// Enables or disables the HTTP/transport classifier.
    #[must_use]
    pub fn check_http_error(mut self, enabled: bool) -> Self {
        self.check_http_error = Some(enabled);
        self
    }

    /// Enables or disables the generic error-page classifier.
    #[must_use]
    pub fn check_community_error(mut self, enabled: bool) -> Self {
        self.check_community_error = Some(enabled);
        self
    }

    /// Enables or disables the inline error-message classifier.
    #[must_use]
    pub fn check_trade_error(mut self, enabled: bool) -> Self {
        self.check_trade_error = Some(enabled);
        self
    }

    /// Enables or disables the malformed-JSON classifier.
    #[must_use]
    pub fn check_json_error(mut self, enabled: bool) -> Self {
        self.check_json_error = Some(enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_camel_case() {
        let options = RequestOptions::from_json(json!({
            "uri": "https://steamcommunity.com/market/",
            "method": "post",
            "headers": { "Referer": "https://steamcommunity.com/" },
            "qs": { "count": 100, "l": "english" },
            "form": { "sessionid": "abc", "amount": 3 },
            "json": true,
            "followRedirect": false,
            "timeout": 5000,
            "checkTradeError": false
        }))
        .unwrap();

        assert_eq!(options.target(), Some("https://steamcommunity.com/market/"));
        assert_eq!(options.method.as_deref(), Some("post"));
        assert_eq!(options.qs.get("count").map(String::as_str), Some("100"));
        assert_eq!(
            options.form.as_ref().and_then(|f| f.get("amount")).map(String::as_str),
            Some("3")
        );
        assert!(options.json);
        assert_eq!(options.follow_redirect, Some(false));
        assert_eq!(options.timeout, Some(Duration::from_millis(5000)));
        assert_eq!(options.check_trade_error, Some(false));
        assert_eq!(options.check_http_error, None);
    }

    #[test]
    fn test_non_boolean_flags_are_ignored() {
        let options = RequestOptions::from_json(json!({
            "url": "https://example.com",
            "followRedirect": "no",
            "followAllRedirects": 0
        }))
        .unwrap();

        assert_eq!(options.follow_redirect, None);
        assert_eq!(options.follow_all_redirects, None);
    }

    #[test]
    fn test_null_encoding_means_binary() {
        let options = RequestOptions::from_json(json!({
            "url": "https://example.com/avatar.jpg",
            "encoding": null
        }))
        .unwrap();
        assert_eq!(options.encoding, BodyEncoding::Binary);

        let options = RequestOptions::from_json(json!({ "url": "https://example.com" })).unwrap();
        assert_eq!(options.encoding, BodyEncoding::Text);

        let options =
            RequestOptions::from_json(json!({ "url": "https://example.com", "encoding": "utf8" }))
                .unwrap();
        assert_eq!(options.encoding, BodyEncoding::Text);
    }

    #[test]
    fn test_form_data_shapes() {
        let options = RequestOptions::from_json(json!({
            "url": "https://example.com/upload",
            "formData": {
                "sessionid": "abc",
                "count": 2,
                "avatar": {
                    "value": "binary-ish",
                    "options": { "filename": "a.txt", "contentType": "text/plain" }
                }
            }
        }))
        .unwrap();

        let form_data = options.form_data.unwrap();
        assert_eq!(form_data["sessionid"], FormField::Scalar(Payload::Text("abc".into())));
        assert_eq!(form_data["count"], FormField::Scalar(Payload::Text("2".into())));
        assert_eq!(
            form_data["avatar"],
            FormField::file("binary-ish", "a.txt", "text/plain")
        );
    }

    #[test]
    fn test_target_prefers_uri() {
        let options = RequestOptions {
            uri: Some("https://a.example".into()),
            url: Some("https://b.example".into()),
            ..Default::default()
        };
        assert_eq!(options.target(), Some("https://a.example"));

        let options = RequestOptions {
            url: Some("https://b.example".into()),
            ..Default::default()
        };
        assert_eq!(options.target(), Some("https://b.example"));
    }
}
