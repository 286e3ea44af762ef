//! Request descriptor builder.
//!
//! Turns a caller's [`RequestOptions`] into a [`RequestDescriptor`] the
//! transport can send, together with the response format the caller expects
//! and the classifiers enabled for this request.

use commune_core::{
    BodyEncoding, FormField, MultipartPart, RequestBody, RequestDescriptor, RequestError,
    RequestOptions, ResponseFormat,
};
use http::header::{HeaderName, HeaderValue, ORIGIN};
use http::{HeaderMap, Method};
use url::Url;

use crate::classify::ClassifierToggles;

// ============================================================================
// Prepared Request
// ============================================================================

/// A normalized request ready for the hook gate and transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// What to send.
    pub descriptor: RequestDescriptor,
    /// How the caller wants the body.
    pub format: ResponseFormat,
    /// Which classifiers run for this request.
    pub checks: ClassifierToggles,
}

/// Builds a descriptor from caller options.
///
/// # Errors
///
/// Returns [`RequestError::InvalidRequest`] when no URL is given, the URL
/// does not parse or is not http(s), the method is not a valid token, or a
/// header name or value is invalid.
pub fn build_descriptor(options: &RequestOptions) -> Result<PreparedRequest, RequestError> {
    let url = resolve_url(options)?;
    let method = resolve_method(options.method.as_deref())?;
    let mut headers = build_headers(options)?;

    if method != Method::GET && !headers.contains_key(ORIGIN) {
        let origin = url.origin().ascii_serialization();
        let value = HeaderValue::from_str(&origin)
            .map_err(|e| RequestError::InvalidRequest(format!("origin {origin}: {e}")))?;
        headers.insert(ORIGIN, value);
    }

    let follow_redirects = options
        .follow_all_redirects
        .or(options.follow_redirect)
        .unwrap_or(true);

    let descriptor = RequestDescriptor {
        method,
        url,
        headers,
        query: options
            .qs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        body: select_body(options),
        follow_redirects,
        timeout: options.timeout,
        verify_tls: options.reject_unauthorized.unwrap_or(true),
    };

    Ok(PreparedRequest {
        descriptor,
        format: response_format(options),
        checks: ClassifierToggles::from_options(options),
    })
}

/// Returns the body representation the caller expects.
pub fn response_format(options: &RequestOptions) -> ResponseFormat {
    if options.json {
        ResponseFormat::Json
    } else if options.encoding == BodyEncoding::Binary {
        ResponseFormat::Bytes
    } else {
        ResponseFormat::Text
    }
}

fn resolve_url(options: &RequestOptions) -> Result<Url, RequestError> {
    let target = options
        .target()
        .ok_or_else(|| RequestError::InvalidRequest("no uri or url given".to_string()))?;

    let url = Url::parse(target)
        .map_err(|e| RequestError::InvalidRequest(format!("invalid url {target}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RequestError::InvalidRequest(format!(
            "unsupported scheme {scheme} in {target}"
        ))),
    }
}

fn resolve_method(method: Option<&str>) -> Result<Method, RequestError> {
    let Some(method) = method else {
        return Ok(Method::GET);
    };

    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RequestError::InvalidRequest(format!("invalid method {method}")))
}

fn build_headers(options: &RequestOptions) -> Result<HeaderMap, RequestError> {
    let mut headers = HeaderMap::with_capacity(options.headers.len() + 1);

    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RequestError::InvalidRequest(format!("header name {name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| RequestError::InvalidRequest(format!("header {name}: {e}")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Picks the body variant. `formData` beats `form`, which beats `body`.
fn select_body(options: &RequestOptions) -> RequestBody {
    if let Some(fields) = &options.form_data {
        let parts = fields
            .iter()
            .map(|(name, field)| (name.clone(), multipart_part(field)))
            .collect();
        return RequestBody::Multipart(parts);
    }

    if let Some(form) = &options.form {
        let pairs = form.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        return RequestBody::Form(pairs);
    }

    match &options.body {
        Some(body) if !body.is_empty() => RequestBody::Raw(body.clone()),
        _ => RequestBody::None,
    }
}

fn multipart_part(field: &FormField) -> MultipartPart {
    match field {
        FormField::Scalar(content) => MultipartPart::new(content.clone()),
        FormField::Detailed { value, options } => MultipartPart::with_details(
            value.clone(),
            options.content_type.clone(),
            options.filename.clone(),
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use commune_core::Payload;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_get_has_no_origin() {
        let prepared = build_descriptor(&RequestOptions::for_url("https://example.com/a/b")).unwrap();
        assert_eq!(prepared.descriptor.method, Method::GET);
        assert!(prepared.descriptor.header("origin").is_none());
    }

    #[test]
    fn test_post_gets_origin() {
        let options = RequestOptions::for_url("https://example.com/a/b").method("post");
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(prepared.descriptor.method, Method::POST);
        assert_eq!(prepared.descriptor.header("origin"), Some("https://example.com"));
    }

    #[test]
    fn test_origin_keeps_non_default_port() {
        let options = RequestOptions::for_url("http://localhost:8080/x").method("DELETE");
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(prepared.descriptor.header("origin"), Some("http://localhost:8080"));
    }

    #[test]
    fn test_existing_origin_is_kept_case_insensitively() {
        let options = RequestOptions::for_url("https://example.com/a")
            .method("POST")
            .header("Origin", "https://steamcommunity.com");
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(
            prepared.descriptor.header("origin"),
            Some("https://steamcommunity.com")
        );
        assert_eq!(prepared.descriptor.headers.get_all(ORIGIN).iter().count(), 1);
    }

    #[test]
    fn test_missing_url_is_invalid() {
        let err = build_descriptor(&RequestOptions::new()).unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));
    }

    #[test]
    fn test_unsupported_scheme_is_invalid() {
        let err = build_descriptor(&RequestOptions::for_url("ftp://example.com/file")).unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));
    }

    #[test]
    fn test_url_alias() {
        let options = RequestOptions {
            url: Some("https://example.com/alias".into()),
            ..Default::default()
        };
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(prepared.descriptor.url.as_str(), "https://example.com/alias");
    }

    #[test]
    fn test_form_data_wins_over_form_and_body() {
        let options = RequestOptions::for_url("https://example.com/")
            .method("POST")
            .multipart_field("a", "1")
            .form_field("b", "2")
            .body("raw");
        let prepared = build_descriptor(&options).unwrap();
        assert!(matches!(prepared.descriptor.body, RequestBody::Multipart(_)));

        let options = RequestOptions::for_url("https://example.com/")
            .method("POST")
            .form_field("b", "2")
            .body("raw");
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(
            prepared.descriptor.body,
            RequestBody::Form(vec![("b".into(), "2".into())])
        );

        let options = RequestOptions::for_url("https://example.com/")
            .method("POST")
            .body("raw");
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(prepared.descriptor.body, RequestBody::Raw(Payload::from("raw")));
    }

    #[test]
    fn test_null_form_falls_through_to_body() {
        let options = RequestOptions::from_json(json!({
            "url": "https://example.com/",
            "method": "POST",
            "form": null,
            "formData": null,
            "body": "raw"
        }))
        .unwrap();
        assert!(options.form.is_none());

        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(prepared.descriptor.body, RequestBody::Raw(Payload::from("raw")));
    }

    #[test]
    fn test_empty_body_is_no_body() {
        let options = RequestOptions::for_url("https://example.com/")
            .method("POST")
            .body("");
        let prepared = build_descriptor(&options).unwrap();
        assert!(prepared.descriptor.body.is_none());
    }

    #[test]
    fn test_structured_multipart_field() {
        let bytes = vec![0x89, 0x50, 0x4e, 0x47];
        let options = RequestOptions::for_url("https://example.com/upload")
            .method("POST")
            .multipart_field("file", FormField::file(bytes.clone(), "a.txt", "text/plain"))
            .multipart_field("sessionid", "abc");
        let prepared = build_descriptor(&options).unwrap();

        let RequestBody::Multipart(parts) = prepared.descriptor.body else {
            panic!("expected multipart body");
        };
        let (_, file) = parts.iter().find(|(name, _)| name == "file").unwrap();
        assert_eq!(file.content(), &Payload::from(bytes));
        assert_eq!(file.filename(), Some("a.txt"));
        assert_eq!(file.content_type(), Some("text/plain"));

        let (_, session) = parts.iter().find(|(name, _)| name == "sessionid").unwrap();
        assert_eq!(session.content(), &Payload::from("abc"));
        assert!(session.filename().is_none());
        assert!(session.content_type().is_none());
    }

    #[test]
    fn test_redirect_flags() {
        let base = || RequestOptions::for_url("https://example.com/");
        assert!(build_descriptor(&base()).unwrap().descriptor.follow_redirects);

        let options = base().follow_redirect(false);
        assert!(!build_descriptor(&options).unwrap().descriptor.follow_redirects);

        let mut options = base().follow_redirect(false);
        options.follow_all_redirects = Some(true);
        assert!(build_descriptor(&options).unwrap().descriptor.follow_redirects);

        let options = RequestOptions::from_json(json!({
            "url": "https://example.com/",
            "followRedirect": false,
            "followAllRedirects": "yes"
        }))
        .unwrap();
        assert!(!build_descriptor(&options).unwrap().descriptor.follow_redirects);
    }

    #[test]
    fn test_passthrough_fields_and_format() {
        let options = RequestOptions::for_url("https://example.com/")
            .query("l", "english")
            .timeout(Duration::from_secs(3))
            .reject_unauthorized(false)
            .json();
        let prepared = build_descriptor(&options).unwrap();
        assert_eq!(prepared.descriptor.query, vec![("l".into(), "english".into())]);
        assert_eq!(prepared.descriptor.timeout, Some(Duration::from_secs(3)));
        assert!(!prepared.descriptor.verify_tls);
        assert_eq!(prepared.format, ResponseFormat::Json);

        let binary = RequestOptions::for_url("https://example.com/").binary();
        assert_eq!(response_format(&binary), ResponseFormat::Bytes);
        let text = RequestOptions::for_url("https://example.com/");
        assert_eq!(response_format(&text), ResponseFormat::Text);
    }

    #[test]
    fn test_invalid_method() {
        let options = RequestOptions::for_url("https://example.com/").method("NOT A METHOD");
        assert!(matches!(
            build_descriptor(&options),
            Err(RequestError::InvalidRequest(_))
        ));
    }
}
