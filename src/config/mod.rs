//! User settings for opening and exporting packages.
//!
//! Settings are read from a YAML or TOML file, picked by extension. Every
//! key is optional.

mod path;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::error::{ApkgError, Result};
use crate::package::{Compression, OpenOptions, OpenStrategy};
use crate::store::Scratch;

pub use path::{DEFAULT_CONFIG_FILE, default_config_path, home_dir, resolve_path};

/// Supported settings file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn of(path: &Path) -> Result<Self> {
        Self::from_extension(path).ok_or_else(|| {
            ApkgError::ConfigParse(format!(
                "Unknown config format for '{}': expected .yaml, .yml, or .toml",
                path.display()
            ))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub open: OpenSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSettings {
    pub strategy: OpenStrategy,
    /// Parent directory for scratch files; the system temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub compression: Compression,
    /// Rewrite the opened package on close when it was modified.
    pub write_back: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            write_back: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.open.scratch_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(ApkgError::ConfigParse(format!(
                    "open.scratch_dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            strategy: self.open.strategy,
            scratch: Scratch::new(self.open.scratch_dir.clone()),
            compression: self.export.compression,
            write_back: self.export.write_back,
        }
    }
}

/// Load settings from a file. Relative paths inside are resolved against
/// the file's directory.
#[instrument(fields(path = %path.as_ref().display()), skip(path))]
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let format = ConfigFormat::of(path)?;
    debug!(format = ?format, "Detected config format");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApkgError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            ApkgError::Io(e)
        }
    })?;

    let mut settings = load_settings_from_str(&content, format)?;
    if let Some(dir) = settings.open.scratch_dir.take() {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        settings.open.scratch_dir = Some(resolve_path(&dir, base)?);
    }
    settings.validate()?;
    info!(strategy = ?settings.open.strategy, "Settings loaded");
    Ok(settings)
}

pub fn load_settings_from_str(content: &str, format: ConfigFormat) -> Result<Settings> {
    trace!("Parsing settings");
    let settings: Settings = match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| ApkgError::ConfigParse(format!("YAML: {e}")))?
        }
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ApkgError::ConfigParse(format!("TOML: {e}")))?
        }
    };
    Ok(settings)
}

/// Settings from an explicit file, else the default file if it exists,
/// else defaults. A missing explicit file is an error.
pub fn resolve_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_settings(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_settings(path),
        _ => {
            debug!("No settings file; using defaults");
            Ok(Settings::default())
        }
    }
}

pub fn save_settings(settings: &Settings, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = match ConfigFormat::of(path)? {
        ConfigFormat::Yaml => serde_yaml::to_string(settings)
            .map_err(|e| ApkgError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => toml::to_string_pretty(settings)
            .map_err(|e| ApkgError::ConfigParse(format!("TOML: {e}")))?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Settings saved");
    Ok(())
}
