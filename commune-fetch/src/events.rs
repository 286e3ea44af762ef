//! Session-expiry and request-completed events.
//!
//! Listeners are registered on the client and called synchronously, in
//! registration order. Both channels are mirrored to `tracing`.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use commune_core::{RequestDescriptor, RequestError, ResponseEnvelope};
use tracing::{debug, warn};

use crate::classify::CascadeReport;

// ============================================================================
// Event payloads
// ============================================================================

/// Classifier verdicts and delivery details for a completed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Whether the caller supplied a completion callback.
    pub has_callback: bool,
    /// What each classifier found. All `None` for hook-aborted requests.
    pub verdicts: CascadeReport,
}

/// Emitted once for every request that received an id.
#[derive(Debug, Clone)]
pub struct RequestCompleted {
    /// Request id.
    pub request_id: u64,
    /// Caller-supplied label.
    pub source: String,
    /// What was (or would have been) sent.
    pub descriptor: RequestDescriptor,
    /// The delivered error, if any.
    pub error: Option<RequestError>,
    /// The response, if the transport produced one.
    pub response: Option<ResponseEnvelope>,
    /// Classifier verdicts.
    pub diagnostics: Diagnostics,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
    /// Time from id assignment to delivery.
    pub duration: Duration,
}

impl RequestCompleted {
    /// Returns true if the request was delivered without an error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Observer of client events. Both methods default to no-ops.
pub trait ClientListener: Send + Sync {
    /// The site reported that the session is no longer valid.
    fn on_session_expired(&self, _error: &RequestError) {}

    /// A request finished.
    fn on_request_completed(&self, _event: &RequestCompleted) {}
}

// ============================================================================
// Emitter
// ============================================================================

/// Ordered fan-out to registered listeners.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<Arc<dyn ClientListener>>>,
}

impl EventEmitter {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener after all existing ones.
    pub fn add(&self, listener: Arc<dyn ClientListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signals session expiry.
    pub fn session_expired(&self, request_id: u64, error: &RequestError) {
        warn!(request_id, error = %error, "Session expired");
        for listener in self.snapshot() {
            listener.on_session_expired(error);
        }
    }

    /// Signals a completed request.
    pub fn request_completed(&self, event: &RequestCompleted) {
        debug!(
            request_id = event.request_id,
            source = %event.source,
            status = event.response.as_ref().map(|r| r.status),
            error = event.error.as_ref().map(ToString::to_string),
            duration = ?event.duration,
            "Request completed"
        );
        for listener in self.snapshot() {
            listener.on_request_completed(event);
        }
    }

    // Listeners run without the lock held so they may register others.
    fn snapshot(&self) -> Vec<Arc<dyn ClientListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ClientListener for Recorder {
        fn on_session_expired(&self, error: &RequestError) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}: expired {error}", self.name));
        }

        fn on_request_completed(&self, event: &RequestCompleted) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}: completed {}", self.name, event.request_id));
        }
    }

    struct Silent;
    impl ClientListener for Silent {}

    fn event(request_id: u64) -> RequestCompleted {
        RequestCompleted {
            request_id,
            source: String::new(),
            descriptor: RequestDescriptor::new(
                http::Method::GET,
                url::Url::parse("https://steamcommunity.com/").unwrap(),
            ),
            error: None,
            response: None,
            diagnostics: Diagnostics::default(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let emitter = EventEmitter::new();
        emitter.add(Arc::new(Recorder { name: "a", log: Arc::clone(&log) }));
        emitter.add(Arc::new(Silent));
        emitter.add(Arc::new(Recorder { name: "b", log: Arc::clone(&log) }));

        emitter.session_expired(1, &RequestError::NotLoggedIn);
        emitter.request_completed(&event(1));

        assert_eq!(emitter.len(), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a: expired Not Logged In",
                "b: expired Not Logged In",
                "a: completed 1",
                "b: completed 1",
            ]
        );
    }

    #[test]
    fn test_no_listeners() {
        let emitter = EventEmitter::new();
        assert!(emitter.is_empty());
        emitter.request_completed(&event(2));
    }
}
