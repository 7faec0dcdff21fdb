//! Error types for the generator side of svcwrap.
//!
//! Generator errors are always scoped to one interface: the processor logs
//! them and moves on to the next declaration, so no variant here aborts a
//! whole round. Runtime failures raised by generated code live in
//! [`crate::runtime::CallError`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for generator operations
#[derive(Debug, Error)]
pub enum GenError {
    /// Rendering or classification failed for one interface
    #[error("generation aborted for {interface}: {reason}")]
    GenerationAborted { interface: String, reason: String },

    /// Persisting a generated unit failed
    #[error("failed to write {unit}: {source}")]
    WriteFailed {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be parsed
    #[error("parse error in {path}:{line}:{column}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors walking the source tree
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GenError {
    /// Create a generation-aborted error for an interface
    pub fn aborted(interface: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GenerationAborted {
            interface: interface.into(),
            reason: reason.into(),
        }
    }

    /// Create a write failure for a unit
    pub fn write_failed(unit: impl Into<String>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            unit: unit.into(),
            source,
        }
    }

    /// Build a parse error from a syn error, keeping the span location
    pub fn parse(path: impl Into<PathBuf>, error: &syn::Error) -> Self {
        let start = error.span().start();
        Self::Parse {
            path: path.into(),
            line: start.line,
            column: start.column + 1,
            message: error.to_string(),
        }
    }

    /// Whether this error only affects the interface it was raised for
    pub fn is_interface_scoped(&self) -> bool {
        matches!(self, Self::GenerationAborted { .. } | Self::WriteFailed { .. })
    }
}

/// Result type alias using the generator error type
pub type Result<T> = std::result::Result<T, GenError>;
