//! Error types for Folio core operations.
//!
//! Only the edges of the library can fail: loading datasets and reading or
//! writing configuration. The engine itself (filtering, sorting, windowing,
//! state decoding) is total and never returns these errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

/// Core error types for Folio operations.
#[derive(Error, Debug)]
pub enum FolioError {
    // === Dataset Errors ===
    /// A dataset file is missing
    #[error("dataset not found at {path}")]
    DatasetNotFound { path: PathBuf },

    /// A dataset file exists but could not be parsed
    #[error("failed to parse dataset {path}: {reason}")]
    DatasetParse { path: PathBuf, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl FolioError {
    /// Returns true if the error points at missing or unreadable input data
    pub fn is_dataset_error(&self) -> bool {
        matches!(
            self,
            FolioError::DatasetNotFound { .. } | FolioError::DatasetParse { .. }
        )
    }

    /// Create a dataset parse error
    pub fn dataset_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        FolioError::DatasetParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        FolioError::Serialization(reason.into())
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Serialization(err.to_string())
    }
}
