//! Runtime support for generated `*DslExtensions` units.
//!
//! Generated wrappers only name items from this module (through the
//! configured runtime path), so everything here is part of the contract
//! between the generator and the code it emits.

mod call;
mod continuation;
mod dsl;
mod error;

pub use call::{Call, Completion, Response};
pub use continuation::{Continuation, SharedContinuation};
pub use dsl::{service_dsl, BusyGuard, BusySink, DslError, ServiceClient, ServiceClientBuilder, ServiceDsl};
pub use error::CallError;

use std::panic::{self, AssertUnwindSafe};

/// Failure boundary around a wrapper's dispatch. Both `Err` returns and
/// panics come back as `Err`.
///
/// Wrappers return the service's result from here and deliver it afterwards,
/// so a panicking success handler is not mistaken for a failed call.
pub fn attempt<T, F>(dispatch: F) -> Result<T, CallError>
where
    F: FnOnce() -> Result<T, CallError>,
{
    panic::catch_unwind(AssertUnwindSafe(dispatch))
        .unwrap_or_else(|payload| Err(CallError::from_panic(payload)))
}

/// Include a generated unit from `OUT_DIR`.
///
/// ```ignore
/// svcwrap::include_dsl!("api/github_service_dsl_extensions.rs");
/// ```
#[macro_export]
macro_rules! include_dsl {
    ($path:literal) => {
        include!(concat!(env!("OUT_DIR"), "/", $path));
    };
}
