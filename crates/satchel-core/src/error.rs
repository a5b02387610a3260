//! Error types for Satchel

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Satchel operations
#[derive(Debug, Error)]
pub enum SatchelError {
    /// Invalid or contradictory descriptor parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Content failed declared validation before anything was written
    #[error("Requirements not met: {0}")]
    Requirements(String),

    /// Content could not be decoded or encoded
    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path segment for {kind}: {value:?}")]
    InvalidSegment { kind: &'static str, value: String },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SatchelError {
    /// Wrap an IO error with the path it happened at
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SatchelError::Storage {
            path: path.into(),
            source,
        }
    }

    /// True for filesystem-level failures (the storage class of errors)
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            SatchelError::Storage { .. }
                | SatchelError::InvalidSegment { .. }
                | SatchelError::IoError(_)
        )
    }
}

/// Result type alias for Satchel operations
pub type Result<T> = std::result::Result<T, SatchelError>;

impl From<toml::de::Error> for SatchelError {
    fn from(err: toml::de::Error) -> Self {
        SatchelError::Metadata(err.to_string())
    }
}

impl From<toml::ser::Error> for SatchelError {
    fn from(err: toml::ser::Error) -> Self {
        SatchelError::Metadata(err.to_string())
    }
}
