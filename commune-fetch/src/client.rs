//! Community client.
//!
//! [`CommunityClient`] runs every request through the same stages:
//!
//! 1. build and validate the descriptor
//! 2. assign a request id
//! 3. pass the pre-request hook gate
//! 4. call the transport
//! 5. run the classification cascade and pick the delivered result
//! 6. deliver, then emit session-expiry and request-completed events

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use commune_core::{RequestError, RequestOptions, ResponseEnvelope, TransportError};
use tracing::{debug, field, info, instrument, warn};

use crate::classify::{self, CascadeReport};
use crate::context::RequestContext;
use crate::descriptor::{build_descriptor, PreparedRequest};
use crate::error::{RequestFailure, SetupError};
use crate::events::{ClientListener, Diagnostics, EventEmitter, RequestCompleted};
use crate::hook::{self, PreRequestHook};
use crate::host::ReqwestTransport;
use crate::settings::ClientSettings;
use crate::transport::{self, Transport};

/// What the caller receives for one request.
pub type Delivery = Result<ResponseEnvelope, RequestFailure>;

// ============================================================================
// Publication
// ============================================================================

/// Events owed for a request that received an id.
struct Publication {
    request_id: u64,
    expirations: Vec<RequestError>,
    event: RequestCompleted,
}

// ============================================================================
// Community Client
// ============================================================================

/// Client for community-site requests.
///
/// Cheap to share behind an `Arc`; any number of requests may be in flight.
pub struct CommunityClient {
    transport: Arc<dyn Transport>,
    hook: RwLock<Option<Arc<dyn PreRequestHook>>>,
    events: EventEmitter,
    last_id: AtomicU64,
}

impl CommunityClient {
    /// Creates a client over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            hook: RwLock::new(None),
            events: EventEmitter::new(),
            last_id: AtomicU64::new(0),
        }
    }

    /// Creates a client over a default [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be built.
    pub fn with_settings(settings: ClientSettings) -> Result<Self, SetupError> {
        Ok(Self::new(Arc::new(ReqwestTransport::with_settings(settings)?)))
    }

    /// Creates a builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Registers the pre-request hook, replacing any existing one.
    pub fn set_pre_request_hook(&self, hook: impl PreRequestHook + 'static) {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Removes the pre-request hook.
    pub fn clear_pre_request_hook(&self) {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Registers an event listener.
    pub fn add_listener(&self, listener: Arc<dyn ClientListener>) {
        self.events.add(listener);
    }

    /// The id assigned to the most recent request, 0 before the first.
    pub fn last_request_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst)
    }

    /// Sends a request and returns its result.
    ///
    /// Events are emitted before this returns.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestFailure`] carrying the classified error and, when
    /// the transport produced one, the response.
    pub async fn http_request(&self, options: RequestOptions, source: Option<&str>) -> Delivery {
        let (delivery, publication) = self.execute(options, source.unwrap_or_default(), false).await;
        self.publish(publication);
        delivery
    }

    /// Sends a request and hands its result to `callback`.
    ///
    /// The callback runs at most once, before any event is emitted.
    pub async fn http_request_with_callback<F>(
        &self,
        options: RequestOptions,
        source: Option<&str>,
        callback: Option<F>,
    ) where
        F: FnOnce(Delivery),
    {
        let (delivery, publication) = self
            .execute(options, source.unwrap_or_default(), callback.is_some())
            .await;

        if let Some(callback) = callback {
            callback(delivery);
        }

        self.publish(publication);
    }

    /// Sends a request to `url`, overriding any URL in `options`.
    ///
    /// # Errors
    ///
    /// See [`http_request`](Self::http_request).
    pub async fn request_url(
        &self,
        url: &str,
        options: RequestOptions,
        source: Option<&str>,
    ) -> Delivery {
        self.http_request(options.url(url), source).await
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// See [`http_request`](Self::http_request).
    pub async fn get(&self, url: &str, options: RequestOptions, source: Option<&str>) -> Delivery {
        self.request_url(url, options.method("GET"), source).await
    }

    /// Sends a POST request.
    ///
    /// # Errors
    ///
    /// See [`http_request`](Self::http_request).
    pub async fn post(&self, url: &str, options: RequestOptions, source: Option<&str>) -> Delivery {
        self.request_url(url, options.method("POST"), source).await
    }

    /// Runs a request up to delivery. Returns `None` for the events when the
    /// request was rejected before an id was assigned.
    #[instrument(
        skip(self, options),
        fields(request_id = field::Empty, method = field::Empty, url = field::Empty)
    )]
    async fn execute(
        &self,
        options: RequestOptions,
        source: &str,
        has_callback: bool,
    ) -> (Delivery, Option<Publication>) {
        let PreparedRequest {
            descriptor,
            format,
            checks,
        } = match build_descriptor(&options) {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(error = %error, "Rejected request");
                return (Err(RequestFailure::new(error)), None);
            }
        };

        let ctx = RequestContext::new(self.last_id.fetch_add(1, Ordering::SeqCst) + 1, source);
        let span = tracing::Span::current();
        span.record("request_id", ctx.id);
        span.record("method", descriptor.method.as_str());
        span.record("url", descriptor.url.as_str());
        debug!("Request started");

        let hook = self
            .hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Err(error) = hook::pass(hook.as_deref(), &ctx, &descriptor).await {
            let event = RequestCompleted {
                request_id: ctx.id,
                source: ctx.source.clone(),
                descriptor,
                error: Some(error.clone()),
                response: None,
                diagnostics: Diagnostics {
                    has_callback,
                    verdicts: CascadeReport::default(),
                },
                started_at: ctx.started_at,
                duration: ctx.elapsed(),
            };
            let publication = Publication {
                request_id: ctx.id,
                expirations: Vec::new(),
                event,
            };
            return (Err(RequestFailure::new(error)), Some(publication));
        }

        let result = transport::perform(self.transport.as_ref(), &descriptor, format).await;
        let verdicts = classify::run_cascade(result.as_ref(), format, checks);
        let expirations = verdicts.session_expirations().cloned().collect();
        let delivery = decide(result, &verdicts);

        match &delivery {
            Ok(response) => info!(status = response.status, "Request succeeded"),
            Err(failure) => warn!(error = %failure.error, "Request failed"),
        }

        let (error, response) = match &delivery {
            Ok(response) => (None, Some(response.clone())),
            Err(failure) => (Some(failure.error.clone()), failure.response.clone()),
        };

        let event = RequestCompleted {
            request_id: ctx.id,
            source: ctx.source.clone(),
            descriptor,
            error,
            response,
            diagnostics: Diagnostics {
                has_callback,
                verdicts,
            },
            started_at: ctx.started_at,
            duration: ctx.elapsed(),
        };

        let publication = Publication {
            request_id: ctx.id,
            expirations,
            event,
        };
        (delivery, Some(publication))
    }

    fn publish(&self, publication: Option<Publication>) {
        let Some(publication) = publication else {
            return;
        };
        for error in &publication.expirations {
            self.events.session_expired(publication.request_id, error);
        }
        self.events.request_completed(&publication.event);
    }
}

impl std::fmt::Debug for CommunityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunityClient")
            .field("last_request_id", &self.last_request_id())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Picks the single result delivered to the caller.
///
/// A classified error wins. Otherwise a transport error that classifier 1
/// did not see is passed through, and anything else is a success.
fn decide(result: Result<ResponseEnvelope, TransportError>, verdicts: &CascadeReport) -> Delivery {
    match (verdicts.outcome().into_error(), result) {
        (Some(error), Ok(response)) => Err(RequestFailure::with_response(error, response)),
        (Some(error), Err(_)) => Err(RequestFailure::new(error)),
        (None, Ok(response)) => Ok(response),
        (None, Err(transport)) => Err(RequestFailure::new(transport.into())),
    }
}

// ============================================================================
// Client Builder
// ============================================================================

/// Builder for [`CommunityClient`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    settings: ClientSettings,
    hook: Option<Arc<dyn PreRequestHook>>,
    listeners: Vec<Arc<dyn ClientListener>>,
}

impl ClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom transport. Settings are then ignored.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the settings for the default transport.
    #[must_use]
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the pre-request hook.
    #[must_use]
    pub fn hook(mut self, hook: impl PreRequestHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Adds an event listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn ClientListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport was given and the default one cannot
    /// be built.
    pub fn build(self) -> Result<CommunityClient, SetupError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_settings(self.settings)?),
        };

        let client = CommunityClient::new(transport);
        *client.hook.write().unwrap_or_else(PoisonError::into_inner) = self.hook;
        for listener in self.listeners {
            client.add_listener(listener);
        }
        Ok(client)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
