//! Persisting generated units.
//!
//! Units land at `<out_dir>/<module path without crate>/<snake unit name>.rs`
//! so a `build.rs` can hand `OUT_DIR` to the writer and the declaring module
//! can `include!` the result. Each unit is tagged with its originating
//! source, both in the manifest and as a cargo rerun directive.

use crate::errors::{GenError, Result};
use heck::ToSnakeCase;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE_NAME: &str = "svcwrap-manifest.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// Existing file already had identical content
    UpToDate(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::UpToDate(path) => path,
        }
    }
}

/// Host interface for persisting generated source
pub trait CodeGenerator {
    fn write_unit(
        &mut self,
        package_name: &str,
        unit_name: &str,
        source: &str,
        depends_on: &Path,
    ) -> Result<WriteOutcome>;
}

/// Location of a unit relative to the output root
pub fn unit_relative_path(package_name: &str, unit_name: &str) -> PathBuf {
    let mut path: PathBuf = package_name
        .split("::")
        .filter(|segment| !segment.is_empty() && *segment != "crate")
        .collect();
    path.push(format!("{}.rs", unit_name.to_snake_case()));
    path
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub unit: String,
    pub package: String,
    pub path: PathBuf,
    pub origin: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    generator: &'static str,
    version: &'static str,
    units: Vec<&'a ManifestEntry>,
}

/// Writes units beneath an output directory
#[derive(Debug)]
pub struct FileCodeGenerator {
    out_dir: PathBuf,
    cargo_directives: bool,
    entries: BTreeMap<PathBuf, ManifestEntry>,
}

impl FileCodeGenerator {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            cargo_directives: false,
            entries: BTreeMap::new(),
        }
    }

    /// Print `cargo:rerun-if-changed` for each origin (build-script mode)
    pub fn with_cargo_directives(mut self, enabled: bool) -> Self {
        self.cargo_directives = enabled;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Write the manifest of every unit handled so far
    pub fn finish(&self) -> Result<PathBuf> {
        let manifest = Manifest {
            generator: "svcwrap",
            version: env!("CARGO_PKG_VERSION"),
            units: self.entries.values().collect(),
        };
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        debug!(path = %path.display(), units = self.entries.len(), "Wrote manifest");
        Ok(path)
    }
}

impl CodeGenerator for FileCodeGenerator {
    fn write_unit(
        &mut self,
        package_name: &str,
        unit_name: &str,
        source: &str,
        depends_on: &Path,
    ) -> Result<WriteOutcome> {
        let relative = unit_relative_path(package_name, unit_name);
        let target = self.out_dir.join(&relative);
        let sha256 = content_hash(source);

        let unchanged = fs::read_to_string(&target)
            .map(|existing| content_hash(&existing) == sha256)
            .unwrap_or(false);

        let outcome = if unchanged {
            debug!(unit = unit_name, path = %target.display(), "Unit up to date");
            WriteOutcome::UpToDate(target)
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| GenError::write_failed(unit_name, e))?;
            }
            fs::write(&target, source).map_err(|e| GenError::write_failed(unit_name, e))?;
            info!(unit = unit_name, path = %target.display(), "Wrote unit");
            WriteOutcome::Written(target)
        };

        if self.cargo_directives {
            println!("cargo:rerun-if-changed={}", depends_on.display());
        }
        self.entries.insert(
            relative.clone(),
            ManifestEntry {
                unit: unit_name.to_string(),
                package: package_name.to_string(),
                path: relative,
                origin: depends_on.to_path_buf(),
                sha256,
            },
        );
        Ok(outcome)
    }
}

/// In-memory generator for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryCodeGenerator {
    pub units: BTreeMap<PathBuf, (String, PathBuf)>,
    /// Unit name whose write fails with `PermissionDenied`
    pub fail_on: Option<String>,
    pub writes: usize,
}

impl MemoryCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(unit_name: impl Into<String>) -> Self {
        Self {
            fail_on: Some(unit_name.into()),
            ..Self::default()
        }
    }

    pub fn source(&self, package_name: &str, unit_name: &str) -> Option<&str> {
        self.units
            .get(&unit_relative_path(package_name, unit_name))
            .map(|(source, _)| source.as_str())
    }
}

impl CodeGenerator for MemoryCodeGenerator {
    fn write_unit(
        &mut self,
        package_name: &str,
        unit_name: &str,
        source: &str,
        depends_on: &Path,
    ) -> Result<WriteOutcome> {
        if self.fail_on.as_deref() == Some(unit_name) {
            return Err(GenError::write_failed(
                unit_name,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "write refused"),
            ));
        }
        let relative = unit_relative_path(package_name, unit_name);
        if let Some((existing, _)) = self.units.get(&relative) {
            if existing == source {
                return Ok(WriteOutcome::UpToDate(relative));
            }
        }
        self.writes += 1;
        self.units.insert(
            relative.clone(),
            (source.to_string(), depends_on.to_path_buf()),
        );
        Ok(WriteOutcome::Written(relative))
    }
}
