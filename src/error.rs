//! Error types for package, store and rendering operations.

use thiserror::Error;

/// Primary error type for apkg operations.
#[derive(Error, Debug)]
pub enum ApkgError {
    // Container errors
    #[error("Invalid package container: {0}")]
    InvalidContainer(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // Data errors
    #[error("Malformed {what} data: {reason}")]
    MalformedData { what: &'static str, reason: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ApkgError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidContainer(_)
                | Self::NotFound { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::InvalidArgument(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidContainer(_) => {
                Some("Check that the file is an .apkg export containing collection.anki21 or collection.anki2")
            }
            Self::NotFound { .. } => Some("List available ids with: apkg notes / apkg cards"),
            Self::ConfigNotFound { .. } => Some("Run: apkg init-config <PATH>"),
            Self::Storage(_) => Some("Check free space and permissions of the scratch directory"),
            _ => None,
        }
    }

    pub(crate) fn malformed(what: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedData {
            what,
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for Results using ApkgError.
pub type Result<T> = std::result::Result<T, ApkgError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| ApkgError::Other(format!("{}: {e}", f().into())))
    }
}
