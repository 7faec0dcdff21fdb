//! Call and response wrappers returned by service operations.

use super::error::CallError;
use std::fmt;
use std::future::Future;
use tokio::runtime::Handle;

/// Completed response with a status code, a reason phrase and an optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<T> {
    code: u16,
    message: String,
    body: Option<T>,
}

impl<T> Response<T> {
    pub fn new(code: u16, message: impl Into<String>, body: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            body,
        }
    }

    /// `200 OK` carrying `body`
    pub fn success(body: T) -> Self {
        Self::new(200, "OK", Some(body))
    }

    /// A body-less response, typically an error status
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::new(code, message, None)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status in `200..300`
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }
}

/// Callback receiving the outcome of an enqueued call
pub type Completion<T> = Box<dyn FnOnce(Result<Response<T>, CallError>) + Send + 'static>;

type Dispatch<T> = Box<dyn FnOnce(Completion<T>) + Send + 'static>;

/// A call that has not been started. Enqueueing hands it a completion
/// callback and returns immediately; the callback runs wherever the transport
/// finishes.
pub struct Call<T> {
    dispatch: Dispatch<T>,
}

impl<T> fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Call<T> {
    /// Build from a dispatcher that is given the completion callback
    pub fn new<F>(dispatch: F) -> Self
    where
        F: FnOnce(Completion<T>) + Send + 'static,
    {
        Self {
            dispatch: Box::new(dispatch),
        }
    }

    /// A call whose outcome is already known; it completes on enqueue
    pub fn ready(outcome: Result<Response<T>, CallError>) -> Self {
        Self::new(move |completion| completion(outcome))
    }

    /// A call driven by `future` on `handle`
    pub fn spawn<F>(handle: Handle, future: F) -> Self
    where
        F: Future<Output = Result<Response<T>, CallError>> + Send + 'static,
    {
        Self::new(move |completion| {
            handle.spawn(async move {
                completion(future.await);
            });
        })
    }

    pub fn enqueue<F>(self, callback: F)
    where
        F: FnOnce(Result<Response<T>, CallError>) + Send + 'static,
    {
        (self.dispatch)(Box::new(callback));
    }

    /// Block the current thread until the call completes.
    ///
    /// Must not be called from within an async context driving this call.
    pub fn execute(self) -> Result<Response<T>, CallError> {
        let (sender, receiver) = std::sync::mpsc::sync_channel(1);
        self.enqueue(move |outcome| {
            let _ = sender.send(outcome);
        });
        // A dispatcher that drops its completion never answers
        receiver.recv().unwrap_or(Err(CallError::Cancelled))
    }
}
