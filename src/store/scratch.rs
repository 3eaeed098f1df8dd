//! Private scratch files and directories for database materialization.

use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::trace;

use crate::error::{ApkgError, Result};

const PREFIX: &str = "apkg-";

/// Where scratch files are created: a configured root or the system temp dir.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratch {
    root: Option<PathBuf>,
}

impl Scratch {
    pub const fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// A named temp file, deleted when dropped.
    pub fn file(&self, suffix: &str) -> Result<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(PREFIX).suffix(suffix);
        let file = match &self.root {
            Some(root) => builder.tempfile_in(root),
            None => builder.tempfile(),
        }
        .map_err(|e| ApkgError::Storage(format!("Failed to create scratch file: {e}")))?;
        trace!(path = %file.path().display(), "Created scratch file");
        Ok(file)
    }

    /// A private directory, removed recursively when dropped.
    pub fn dir(&self) -> Result<TempDir> {
        let mut builder = Builder::new();
        builder.prefix(PREFIX);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ApkgError::Storage(format!("Failed to create scratch directory: {e}")))?;
        trace!(path = %dir.path().display(), "Created scratch directory");
        Ok(dir)
    }
}
