//! Persistence for the single [`IndexState`] record.
//!
//! Every operation loads the state fresh, mutates it, and saves it back.
//! Nothing is cached between calls. Callers that may run concurrently
//! must serialize their read-modify-write cycles themselves.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use vault_types::{IndexState, Settings};

use crate::error::StorageError;

/// JSON file store for the index state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the configured state file location.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.state_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, or a fresh default state if none was saved yet.
    ///
    /// Fields missing from the file take their default values. A file
    /// that exists but does not parse is an error.
    pub async fn load(&self) -> Result<IndexState, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file, using defaults");
                return Ok(IndexState::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| StorageError::CorruptState {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Persist the full state, replacing the previous file.
    pub async fn save(&self, state: &IndexState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(
            path = %self.path.display(),
            tracked = state.last_processed_hash.len(),
            retry = state.retry_queue.len(),
            "Saved index state"
        );
        Ok(())
    }

    /// Delete the state file. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
