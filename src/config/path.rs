//! Path helpers for settings files.
//!
//! Paths inside a settings file may be absolute, `~`-prefixed or relative
//! to the file's own directory.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{ApkgError, Result};

/// File name of the default settings file.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Resolve a path written in a settings file located in `config_dir`.
pub fn resolve_path(path: &Path, config_dir: &Path) -> Result<PathBuf> {
    trace!(
        path = %path.display(),
        config_dir = %config_dir.display(),
        "Resolving path"
    );

    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let resolved = match path_str.strip_prefix("~/") {
            Some(rest) if !rest.is_empty() => home.join(rest),
            _ => home,
        };
        debug!(resolved = %resolved.display(), "Expanded home directory path");
        return Ok(resolved);
    }

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(config_dir.join(path))
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        ApkgError::ConfigParse("Could not determine home directory".to_string())
    })
}

/// `<config_dir>/apkg/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("apkg").join(DEFAULT_CONFIG_FILE))
}
