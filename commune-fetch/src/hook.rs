//! Pre-flight hook gate.
//!
//! A single optional hook sees every request after its descriptor is built
//! and before the transport is called. The hook either lets the request
//! through immediately (returns `false`) or takes ownership of the
//! [`Continuation`] (returns `true`) and resumes or aborts it later, from any
//! task or thread.
//!
//! The continuation is backed by a latch: only the first call has an effect.

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use commune_core::{RequestDescriptor, RequestError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::context::RequestContext;

// ============================================================================
// Hook Trait
// ============================================================================

/// Interceptor that may delay or veto a request before it is sent.
pub trait PreRequestHook: Send + Sync {
    /// Inspects a request about to be sent.
    ///
    /// Return `false` to let it through. Return `true` to take over: the
    /// request then waits until `continuation` is fired.
    fn intercept(
        &self,
        request_id: u64,
        source: &str,
        descriptor: &RequestDescriptor,
        continuation: Continuation,
    ) -> bool;
}

impl<F> PreRequestHook for F
where
    F: Fn(u64, &str, &RequestDescriptor, Continuation) -> bool + Send + Sync,
{
    fn intercept(
        &self,
        request_id: u64,
        source: &str,
        descriptor: &RequestDescriptor,
        continuation: Continuation,
    ) -> bool {
        self(request_id, source, descriptor, continuation)
    }
}

// ============================================================================
// Latch
// ============================================================================

type GateResult = Result<(), RequestError>;

enum LatchState {
    Pending(oneshot::Sender<GateResult>),
    Fired,
}

struct Latch {
    state: Mutex<LatchState>,
}

impl Latch {
    fn fire(&self, result: GateResult) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match mem::replace(&mut *state, LatchState::Fired) {
            LatchState::Pending(sender) => {
                // The receiver is gone only if the request future was dropped.
                let _ = sender.send(result);
                true
            }
            LatchState::Fired => false,
        }
    }

    fn is_fired(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, LatchState::Fired)
    }
}

// ============================================================================
// Continuation
// ============================================================================

/// Handle that releases a request held by a [`PreRequestHook`].
///
/// Clones share one latch. The first of [`resume`](Self::resume),
/// [`abort`](Self::abort) or [`complete`](Self::complete) decides the
/// request; every later call is ignored and returns `false`.
#[derive(Clone)]
pub struct Continuation {
    request_id: u64,
    latch: Arc<Latch>,
}

impl Continuation {
    fn new(request_id: u64) -> (Self, oneshot::Receiver<GateResult>) {
        let (sender, receiver) = oneshot::channel();
        let continuation = Self {
            request_id,
            latch: Arc::new(Latch {
                state: Mutex::new(LatchState::Pending(sender)),
            }),
        };
        (continuation, receiver)
    }

    /// Lets the request proceed to the transport.
    pub fn resume(&self) -> bool {
        self.complete(Ok(()))
    }

    /// Aborts the request. The caller receives `error` with no response.
    pub fn abort(&self, error: RequestError) -> bool {
        self.complete(Err(error))
    }

    /// Resumes on `Ok`, aborts on `Err`.
    ///
    /// Returns `true` if this call decided the request, `false` if an
    /// earlier call already had.
    pub fn complete(&self, result: GateResult) -> bool {
        let fired = self.latch.fire(result);
        if !fired {
            debug!(request_id = self.request_id, "Continuation already fired, ignoring");
        }
        fired
    }

    /// Returns true once the request has been resumed or aborted.
    pub fn is_fired(&self) -> bool {
        self.latch.is_fired()
    }

    /// The request this continuation belongs to.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("request_id", &self.request_id)
            .field("fired", &self.is_fired())
            .finish()
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Runs the hook (if any) and waits for the request to be released.
///
/// # Errors
///
/// Returns the error the hook aborted with, or [`RequestError::Aborted`]
/// if every continuation handle was dropped without firing.
pub(crate) async fn pass(
    hook: Option<&dyn PreRequestHook>,
    ctx: &RequestContext,
    descriptor: &RequestDescriptor,
) -> GateResult {
    let (continuation, receiver) = Continuation::new(ctx.id);

    let delayed = hook.is_some_and(|hook| {
        hook.intercept(ctx.id, &ctx.source, descriptor, continuation.clone())
    });

    if delayed {
        debug!(request_id = ctx.id, "Request held by pre-request hook");
    } else {
        continuation.resume();
    }
    drop(continuation);

    match receiver.await {
        Ok(result) => {
            if let Err(error) = &result {
                debug!(request_id = ctx.id, error = %error, "Request aborted by pre-request hook");
            }
            result
        }
        Err(_) => Err(RequestError::aborted("continuation dropped")),
    }
}

// ============================================================================
// Tests
// ============================================================================
