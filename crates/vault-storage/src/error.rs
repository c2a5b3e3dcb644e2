//! Storage layer error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state exists but cannot be parsed
    #[error("Corrupt state file {path}: {message}")]
    CorruptState { path: PathBuf, message: String },

    /// A line of the index log cannot be parsed
    #[error("Corrupt index record at line {line}: {message}")]
    CorruptRecord { line: usize, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
