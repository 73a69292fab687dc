//! Config file location and loading

use anyhow::{Context, Result};
use autosave_core::{example_config, SyncConfig};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "profile-sync";
const CONFIG_FILE: &str = "config.toml";

/// Default config file path (`<config dir>/profile-sync/config.toml`)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Where a loaded config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Load the config
///
/// An explicit path must exist. The default path is optional and falls back
/// to built-in defaults when missing.
pub fn load(explicit: Option<&Path>) -> Result<(SyncConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = load_from(path)?;
        return Ok((config, ConfigSource::File(path.to_path_buf())));
    }

    match config_file_path() {
        Some(path) if path.exists() => {
            let config = load_from(&path)?;
            Ok((config, ConfigSource::File(path)))
        }
        _ => Ok((SyncConfig::default(), ConfigSource::Defaults)),
    }
}

/// Read and validate a config file
pub fn load_from(path: &Path) -> Result<SyncConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    SyncConfig::from_toml_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Write the annotated example config to `path` unless a file is there
///
/// Returns `true` if the file was created.
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, example_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
