//! Diagnostic sink used by the generator.
//!
//! The processor never prints directly. It reports through [`Diagnostics`] so
//! a build script can surface warnings as cargo directives while the CLI and
//! tests route the same messages elsewhere.

use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        f.write_str(label)
    }
}

/// Host-provided log sink. Messages have no behavioral effect.
pub trait Diagnostics {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &D {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Forwards every message to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "svcwrap", "{}", message),
            Level::Info => tracing::info!(target: "svcwrap", "{}", message),
            Level::Warn => tracing::warn!(target: "svcwrap", "{}", message),
            Level::Error => tracing::error!(target: "svcwrap", "{}", message),
        }
    }
}

/// Build-script sink: warnings and errors become `cargo:warning` lines
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoDiagnostics;

impl Diagnostics for CargoDiagnostics {
    fn log(&self, level: Level, message: &str) {
        if level >= Level::Warn {
            // cargo only understands single-line warnings
            for line in message.lines() {
                println!("cargo:warning=svcwrap {}: {}", level, line);
            }
        }
        TracingDiagnostics.log(level, message);
    }
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn log(&self, level: Level, message: &str) {
        self.entries.lock().push((level, message.to_string()));
    }
}
