//! Error types for gemchat

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gemchat operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors, including a missing API credential
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Session file errors
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A specialized Result type for gemchat operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Failure reading or writing a session file.
///
/// I/O failures and format failures are separate variants so callers can
/// report them differently.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session file {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a gemchat session file: {reason}", path.display())]
    FormatMismatch { path: PathBuf, reason: String },

    #[error("session file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to encode session: {0}")]
    Encode(String),

    #[error("invalid session name `{0}`")]
    InvalidName(String),
}

impl StoreError {
    /// Whether the failure came from the file system rather than the content
    pub fn is_io(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::Io { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound { path }
        } else {
            StoreError::Io { path, source }
        }
    }
}

/// Failure restoring a binary snapshot
pub type LoadError = StoreError;
/// Failure writing a binary snapshot
pub type SaveError = StoreError;
/// Failure writing a JSON export
pub type ExportError = StoreError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err = StoreError::io(
            "missing.cht",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.is_io());
    }

    #[test]
    fn test_format_failures_are_not_io() {
        let err = StoreError::Corrupt {
            path: PathBuf::from("a.cht"),
            reason: "unexpected end".to_string(),
        };
        assert!(!err.is_io());
        assert!(err.to_string().contains("a.cht"));
    }
}
