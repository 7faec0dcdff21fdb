use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Failure delivered to a continuation's failure handler.
///
/// Generated wrappers never return or propagate this; it only ever reaches
/// `on_fail`.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// The transport failed before a response was received
    #[error(transparent)]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// A response arrived with a non-successful status
    #[error("{message}")]
    Http { code: u16, message: String },

    /// A successful response carried no body
    #[error("response body was empty")]
    EmptyBody,

    #[error("call panicked: {0}")]
    Panicked(String),

    /// No implementation is bound for the requested service
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A deferred call was made outside any tokio runtime
    #[error("no tokio runtime available for deferred call")]
    NoRuntime,

    #[error("deferred call was cancelled")]
    Cancelled,
}

impl CallError {
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Arc::new(error))
    }

    /// Failure for a non-successful status, formatted `HTTP Error: <code> - <message>`
    pub fn http(code: u16, message: &str) -> Self {
        Self::Http {
            code,
            message: format!("HTTP Error: {} - {}", code, message),
        }
    }

    /// Convert a caught panic payload into a failure
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// HTTP status, for failures that have one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { code, .. } => Some(*code),
            _ => None,
        }
    }
}
