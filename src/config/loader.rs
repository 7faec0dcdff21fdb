use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::GeneratorConfig;
use super::validation::validate_config;

pub const CONFIG_FILE_NAME: &str = "svcwrap.toml";

/// Pure function to read config file contents
pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse and validate config from a TOML string
pub fn parse_and_validate_config(contents: &str) -> Result<GeneratorConfig, String> {
    let config = toml::from_str::<GeneratorConfig>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?;

    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(format!(
            "Invalid {}: {}",
            CONFIG_FILE_NAME,
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        ));
    }

    Ok(config)
}

/// Try loading config from a specific path
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<GeneratorConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            None
        }
    }
}

/// Only log actual errors, not "file not found"
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Directory ancestors up to a depth limit, starting with `start`
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Search `start` and its ancestors for `svcwrap.toml`
pub fn load_config_from(start: &Path) -> GeneratorConfig {
    locate_config_from(start).0
}

/// Like [`load_config_from`], also returning the file the config was read
/// from. `None` when the defaults were used.
pub fn locate_config_from(start: &Path) -> (GeneratorConfig, Option<PathBuf>) {
    const MAX_TRAVERSAL_DEPTH: usize = 10;

    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path).map(|config| (config, Some(path))))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            (GeneratorConfig::default(), None)
        })
}

pub fn load_config() -> GeneratorConfig {
    match std::env::current_dir() {
        Ok(dir) => load_config_from(&dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            GeneratorConfig::default()
        }
    }
}

/// Load an explicitly named config file; unlike discovery, problems are errors
pub fn load_config_file(path: &Path) -> Result<GeneratorConfig, String> {
    let contents = read_config_file(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_and_validate_config(&contents)
}
