//! Compile-time generator of callback-style wrappers for remote service traits.
//!
//! Traits marked `#[remote_service]` are scanned from source, each operation's
//! return type is classified, and one `*DslExtensions` unit per trait is
//! emitted. The generated code targets [`runtime`], re-exported at the crate
//! root.

pub mod builder;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod emitter;
pub mod errors;
pub mod io;
pub mod model;
pub mod processor;
pub mod resolver;
pub mod runtime;
pub mod scanner;
pub mod tracker;
pub mod universe;
pub mod writer;

pub use crate::builder::Builder;
pub use crate::config::GeneratorConfig;
pub use crate::errors::{GenError, Result};
pub use crate::model::{InterfaceDescriptor, OperationDescriptor, ParamDescriptor, ResultShape};
pub use crate::processor::{BuildReport, ProcessingRound, Processor, RoundOutput};
pub use crate::runtime::{
    service_dsl, BusySink, Call, CallError, Continuation, DslError, Response, ServiceClient,
    ServiceDsl, SharedContinuation,
};
pub use crate::writer::{CodeGenerator, FileCodeGenerator, WriteOutcome};

pub use svcwrap_macros::remote_service;
