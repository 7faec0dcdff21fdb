//! Build-script entry point.
//!
//! ```ignore
//! // build.rs
//! fn main() -> anyhow::Result<()> {
//!     svcwrap::Builder::new().source_dir("src").compile()?;
//!     Ok(())
//! }
//! ```

use crate::config::{load_config_file, locate_config_from, GeneratorConfig};
use crate::diagnostics::{CargoDiagnostics, Diagnostics, TracingDiagnostics};
use crate::processor::{BuildReport, Processor};
use crate::universe::Universe;
use crate::writer::FileCodeGenerator;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info_span;

#[derive(Debug)]
pub struct Builder {
    source_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    config: Option<GeneratorConfig>,
    config_path: Option<PathBuf>,
    cargo_directives: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            source_dir: None,
            out_dir: None,
            config: None,
            config_path: None,
            cargo_directives: true,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of the sources to scan. Defaults to `$CARGO_MANIFEST_DIR/src`.
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Output root. Defaults to `$OUT_DIR`.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read configuration from this file instead of searching for `svcwrap.toml`
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Print cargo directives and warnings (on by default)
    pub fn cargo_directives(mut self, enabled: bool) -> Self {
        self.cargo_directives = enabled;
        self
    }

    pub fn compile(self) -> Result<BuildReport> {
        let source_dir = match &self.source_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(
                std::env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR is not set")?,
            )
            .join("src"),
        };
        let out_dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(
                std::env::var("OUT_DIR").context("OUT_DIR is not set; call out_dir()")?,
            ),
        };
        let (config, config_file) = self.resolve_config(&source_dir)?;

        let _span = info_span!("compile", source = %source_dir.display()).entered();
        if self.cargo_directives {
            println!("cargo:rerun-if-changed={}", source_dir.display());
            if let Some(path) = &config_file {
                println!("cargo:rerun-if-changed={}", path.display());
            }
            generate(&source_dir, &out_dir, config, true, CargoDiagnostics)
        } else {
            generate(&source_dir, &out_dir, config, false, TracingDiagnostics)
        }
    }

    /// The config to generate with and the file it came from, if any.
    /// An explicit config wins over an explicit path, which wins over
    /// discovery from `source_dir` upwards.
    fn resolve_config(&self, source_dir: &Path) -> Result<(GeneratorConfig, Option<PathBuf>)> {
        match (&self.config, &self.config_path) {
            (Some(config), _) => Ok((config.clone(), None)),
            (None, Some(path)) => {
                let config = load_config_file(path).map_err(|e| anyhow!(e))?;
                Ok((config, Some(path.clone())))
            }
            (None, None) => Ok(locate_config_from(source_dir)),
        }
    }
}

/// Load the universe under `source_dir`, run rounds to fixpoint and write the
/// manifest.
pub fn generate<D: Diagnostics>(
    source_dir: &Path,
    out_dir: &Path,
    config: GeneratorConfig,
    cargo_directives: bool,
    diagnostics: D,
) -> Result<BuildReport> {
    let universe = Universe::load(source_dir, &config.sources.exclude)
        .with_context(|| format!("Failed to load sources from {}", source_dir.display()))?;

    let writer = FileCodeGenerator::new(out_dir).with_cargo_directives(cargo_directives);
    let mut processor = Processor::new(config, writer, diagnostics);
    let report = processor.run_to_fixpoint(&universe);

    processor
        .generator()
        .finish()
        .with_context(|| format!("Failed to write manifest to {}", out_dir.display()))?;
    Ok(report)
}
