//! Per-request bookkeeping.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Identity and timing of one in-flight request.
///
/// Created once a request has passed descriptor validation and received its
/// id. The continuation latch lives with the hook gate for the duration of
/// the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Monotonic per-client request id, starting at 1.
    pub id: u64,
    /// Caller-supplied label, empty when none was given.
    pub source: String,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl RequestContext {
    /// Starts the clock for a request.
    pub fn new(id: u64, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Time since the request started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
