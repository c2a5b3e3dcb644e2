//! Error types for the indexing pipeline.

use thiserror::Error;
use vault_storage::StorageError;

/// Errors that can occur in the indexing pipeline
#[derive(Error, Debug)]
pub enum IndexingError {
    /// State or index log operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Reading a note or writing an export failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Note enumeration failed
    #[error("Note source error: {0}")]
    Source(String),

    /// Note is missing, not markdown, or excluded
    #[error("Not eligible for indexing: {0}")]
    NotEligible(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IndexingError {
    fn from(err: serde_json::Error) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexingError::NotEligible("Canvas/board.canvas".to_string());
        assert_eq!(
            err.to_string(),
            "Not eligible for indexing: Canvas/board.canvas"
        );

        let err = IndexingError::Source("walk failed".to_string());
        assert_eq!(err.to_string(), "Note source error: walk failed");
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let indexing_err: IndexingError = json_err.into();
        assert!(matches!(indexing_err, IndexingError::Serialization(_)));
    }
}
