//! reqwest-backed transport with a shared cookie jar.
//!
//! reqwest fixes the redirect policy and certificate verification per
//! client, so the transport keeps one client for each combination and picks
//! the right one per request. All of them share the same cookie jar, which
//! is where the community session lives.

use std::sync::Arc;

use async_trait::async_trait;
use commune_core::{MultipartPart, Payload, RequestBody, RequestDescriptor, TransportError};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{transport_error, SetupError};
use crate::settings::ClientSettings;
use crate::transport::{Transport, TransportResponse};

// ============================================================================
// Reqwest Transport
// ============================================================================

/// Default [`Transport`] built on reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Indexed by `[follow_redirects][verify_tls]`.
    clients: [[Client; 2]; 2],
    jar: Arc<Jar>,
    settings: ClientSettings,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, SetupError> {
        Self::with_settings(ClientSettings::default())
    }

    /// Creates a transport with custom settings and a fresh cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if a default header is invalid or the TLS backend
    /// cannot be initialized.
    pub fn with_settings(settings: ClientSettings) -> Result<Self, SetupError> {
        Self::with_cookie_jar(settings, Arc::new(Jar::default()))
    }

    /// Creates a transport that stores cookies in the given jar.
    ///
    /// # Errors
    ///
    /// Returns an error if a default header is invalid or the TLS backend
    /// cannot be initialized.
    pub fn with_cookie_jar(settings: ClientSettings, jar: Arc<Jar>) -> Result<Self, SetupError> {
        let headers = default_headers(&settings)?;

        let build = |follow: bool, verify: bool| -> Result<Client, SetupError> {
            let policy = if follow {
                Policy::limited(settings.max_redirects)
            } else {
                Policy::none()
            };

            Ok(Client::builder()
                .user_agent(settings.user_agent.clone())
                .default_headers(headers.clone())
                .redirect(policy)
                .danger_accept_invalid_certs(!verify)
                .cookie_provider(Arc::clone(&jar))
                .build()?)
        };

        let clients = [
            [build(false, false)?, build(false, true)?],
            [build(true, false)?, build(true, true)?],
        ];

        Ok(Self {
            clients,
            jar,
            settings,
        })
    }

    /// Stores `Set-Cookie` style strings for the given URL.
    ///
    /// Used to seed a session (`sessionid`, `steamLoginSecure`, ...) before
    /// the first request.
    pub fn set_cookies<I, S>(&self, cookies: I, url: &Url)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for cookie in cookies {
            self.jar.add_cookie_str(cookie.as_ref(), url);
        }
    }

    /// Returns the shared cookie jar.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Returns the settings the transport was built with.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn client_for(&self, descriptor: &RequestDescriptor) -> &Client {
        let verify = descriptor.verify_tls && !self.settings.accept_invalid_certs;
        &self.clients[usize::from(descriptor.follow_redirects)][usize::from(verify)]
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, url = %descriptor.url))]
    async fn send(&self, descriptor: &RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let client = self.client_for(descriptor);

        let mut builder = client
            .request(descriptor.method.clone(), descriptor.url.clone())
            .headers(descriptor.headers.clone())
            .timeout(descriptor.timeout.unwrap_or(self.settings.timeout));

        if !descriptor.query.is_empty() {
            builder = builder.query(&descriptor.query);
        }

        builder = match &descriptor.body {
            RequestBody::None => builder,
            RequestBody::Raw(payload) => builder.body(payload_body(payload)),
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::Multipart(parts) => {
                builder.multipart(multipart_form(parts).map_err(|e| transport_error(&e))?)
            }
        };

        let response = builder.send().await.map_err(|e| transport_error(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        debug!(status = %status, "Transport response");

        let body = response.bytes().await.map_err(|e| transport_error(&e))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            url,
            body,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_headers(settings: &ClientSettings) -> Result<HeaderMap, SetupError> {
    let mut headers = HeaderMap::with_capacity(settings.default_headers.len());

    for (name, value) in &settings.default_headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| SetupError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| SetupError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn payload_body(payload: &Payload) -> reqwest::Body {
    match payload {
        Payload::Text(text) => reqwest::Body::from(text.clone()),
        Payload::Bytes(bytes) => reqwest::Body::from(bytes.clone()),
    }
}

fn multipart_form(parts: &[(String, MultipartPart)]) -> Result<Form, reqwest::Error> {
    let mut form = Form::new();

    for (name, part) in parts {
        let mut body = match part.content() {
            Payload::Text(text) => Part::text(text.clone()),
            Payload::Bytes(bytes) => Part::bytes(bytes.to_vec()),
        };
        if let Some(filename) = part.filename() {
            body = body.file_name(filename.to_string());
        }
        if let Some(content_type) = part.content_type() {
            body = body.mime_str(content_type)?;
        }
        form = form.part(name.clone(), body);
    }

    Ok(form)
}

// ============================================================================
// Tests
// ============================================================================
