//! Success/failure handler pair for one call attempt.

use super::error::CallError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type SuccessHandler<T> = Box<dyn FnOnce(T) + Send + 'static>;
type FailureHandler = Box<dyn FnOnce(CallError) + Send + 'static>;

/// Handlers registered by a wrapper's `block`.
///
/// Either handler may be left unset, in which case that outcome is discarded.
///
/// Only the service call runs inside the wrapper's failure boundary. The
/// `block` itself, and handlers for outcomes known before the wrapper returns
/// (response and bare value shapes), run outside it: a panic there unwinds
/// into the caller instead of being reported through `on_fail`. The busy sink
/// is still cleared while unwinding.
pub struct Continuation<T> {
    on_success: Option<SuccessHandler<T>>,
    on_fail: Option<FailureHandler>,
}

impl<T> Default for Continuation<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_fail: None,
        }
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("on_success", &self.on_success.is_some())
            .field("on_fail", &self.on_fail.is_some())
            .finish()
    }
}

impl<T> Continuation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the success handler, replacing any earlier one
    pub fn on_success<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_success = Some(Box::new(handler));
        self
    }

    /// Register the failure handler, replacing any earlier one
    pub fn on_fail<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(CallError) + Send + 'static,
    {
        self.on_fail = Some(Box::new(handler));
        self
    }

    /// Deliver the terminal outcome. Consumes the continuation, so at most one
    /// handler can ever run.
    pub fn complete(self, outcome: Result<T, CallError>) {
        match outcome {
            Ok(value) => {
                if let Some(handler) = self.on_success {
                    handler(value);
                }
            }
            Err(error) => {
                if let Some(handler) = self.on_fail {
                    handler(error);
                }
            }
        }
    }

    /// Share between the dispatcher and a completion callback
    pub fn shared(self) -> SharedContinuation<T> {
        SharedContinuation {
            inner: Arc::new(Mutex::new(Some(self))),
        }
    }
}

/// A continuation that may be completed from several places, of which only
/// the first takes effect.
pub struct SharedContinuation<T> {
    inner: Arc<Mutex<Option<Continuation<T>>>>,
}

impl<T> Clone for SharedContinuation<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for SharedContinuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContinuation")
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<T> SharedContinuation<T> {
    /// Complete with `outcome`; false if already completed.
    pub fn complete(&self, outcome: Result<T, CallError>) -> bool {
        // Handlers run after the lock is released so they may touch this
        // continuation again without deadlocking.
        let taken = self.inner.lock().take();
        match taken {
            Some(continuation) => {
                continuation.complete(outcome);
                true
            }
            None => false,
        }
    }

    /// Fail with an error raised by the dispatch after it may already have
    /// delivered an outcome, e.g. a handler that panicked while a call
    /// completed inline. Such an error has no handler left, so it is logged.
    pub fn fail_dispatch(&self, error: CallError) -> bool {
        let taken = self.inner.lock().take();
        match taken {
            Some(continuation) => {
                continuation.complete(Err(error));
                true
            }
            None => {
                tracing::warn!(%error, "Call failed after its outcome was delivered");
                false
            }
        }
    }

    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    pub fn fail(&self, error: CallError) -> bool {
        self.complete(Err(error))
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().is_none()
    }
}
