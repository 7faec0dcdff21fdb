pub mod generate;
pub mod init;
pub mod scan;

use crate::config::{load_config_file, load_config_from, GeneratorConfig};
use anyhow::{anyhow, Result};
use std::path::Path;

/// Explicit config file if given, otherwise the nearest `svcwrap.toml`
pub(crate) fn resolve_config(source: &Path, explicit: Option<&Path>) -> Result<GeneratorConfig> {
    match explicit {
        Some(path) => load_config_file(path).map_err(|e| anyhow!(e)),
        None => Ok(load_config_from(source)),
    }
}
