//! The symbol universe: every parsed source file visible to one round.
//!
//! Module paths are derived from file positions under the source root the
//! same way rustc maps `mod` declarations to files, so a trait in
//! `src/api/mod.rs` or `src/api.rs` lives in `crate::api`.

use crate::errors::{GenError, Result};
use crate::io::walker::find_rust_sources;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, debug_span, warn};

/// One parsed file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path as loaded (absolute for on-disk trees)
    pub path: PathBuf,
    /// Module the file's top-level items belong to
    pub module_path: String,
    pub syntax: syn::File,
}

#[derive(Debug, Default)]
pub struct Universe {
    files: Vec<SourceFile>,
    parse_failures: Vec<GenError>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every Rust file under `root`. Files that fail to parse are kept
    /// aside in [`Universe::parse_failures`] instead of failing the load.
    pub fn load(root: &Path, exclude: &[String]) -> Result<Self> {
        let _span = debug_span!("load_universe", root = %root.display()).entered();
        let mut universe = Self::new();

        for path in find_rust_sources(root, exclude)? {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            let content = fs::read_to_string(&path)?;
            match parse_source(&path, &content) {
                Ok(syntax) => universe.push(path, &relative, syntax),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unparsable source");
                    universe.parse_failures.push(err);
                }
            }
        }

        debug!(
            files = universe.files.len(),
            failures = universe.parse_failures.len(),
            "Universe loaded"
        );
        Ok(universe)
    }

    /// Build a universe from in-memory sources keyed by their path relative to
    /// the source root.
    pub fn from_sources<'a, I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut universe = Self::new();
        for (relative, content) in sources {
            universe.add_source(relative, content)?;
        }
        Ok(universe)
    }

    /// Add one file, e.g. a unit produced by another generator between rounds
    pub fn add_source(&mut self, relative: impl AsRef<Path>, content: &str) -> Result<()> {
        let relative = relative.as_ref();
        let syntax = parse_source(relative, content)?;
        self.files.retain(|f| f.path.as_path() != relative);
        self.push(relative.to_path_buf(), relative, syntax);
        Ok(())
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn parse_failures(&self) -> &[GenError] {
        &self.parse_failures
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn push(&mut self, path: PathBuf, relative: &Path, syntax: syn::File) {
        let module_path = module_path_for(relative);
        self.files.push(SourceFile {
            path,
            module_path,
            syntax,
        });
    }
}

fn parse_source(path: &Path, content: &str) -> Result<syn::File> {
    syn::parse_file(content).map_err(|e| GenError::parse(path, &e))
}

/// Map a path relative to the source root onto its module path
pub fn module_path_for(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
        let is_root = segments.is_empty() && (stem == "lib" || stem == "main");
        if !is_root && stem != "mod" {
            segments.push(stem);
        }
    }

    std::iter::once("crate".to_string())
        .chain(segments)
        .collect::<Vec<_>>()
        .join("::")
}
