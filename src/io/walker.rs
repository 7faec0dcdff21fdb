use crate::errors::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Collects the Rust sources under a root, honoring `.gitignore` and
/// caller-supplied exclude globs.
pub struct FileWalker {
    root: PathBuf,
    exclude_patterns: Vec<glob::Pattern>,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            exclude_patterns: vec![],
        }
    }

    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude_patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    /// Sorted so universes built from the same tree scan in the same order
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        if path.extension().map_or(true, |ext| ext != "rs") {
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative_str = relative.to_string_lossy();
        !self
            .exclude_patterns
            .iter()
            .any(|p| p.matches(&relative_str) || p.matches_path(path))
    }
}

pub fn find_rust_sources(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    FileWalker::new(root.to_path_buf())
        .with_exclude_patterns(exclude)?
        .walk()
}
