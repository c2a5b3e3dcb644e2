//! Append-only JSONL content index.
//!
//! Provides:
//! - Record append (one JSON object per line, append order preserved)
//! - Compaction keeping the latest record per note id
//! - Lenient record reads for exports

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vault_types::{IndexRecord, Settings};

use crate::error::StorageError;

/// Outcome of a compaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Non-empty lines read from the log
    pub lines_before: usize,
    /// Lines written back (one per note id)
    pub records_after: usize,
}

/// Writer for the line-delimited content index.
///
/// `append` and `compact` share one lock, so a compaction never
/// interleaves with an append through the same handle.
#[derive(Debug)]
pub struct IndexLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl IndexLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a log at the configured index file location.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.index_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub async fn append(&self, record: &IndexRecord) -> Result<(), StorageError> {
        let mut line = record.to_line()?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(note_id = %record.note_id, status = ?record.summary_status, "Appended index record");
        Ok(())
    }

    /// Rewrite the log keeping only the last record per note id.
    ///
    /// Each note keeps the position where it first appeared, with the
    /// content of its last record. A missing log is left missing; an empty
    /// result leaves an empty file. Any unparseable line aborts the pass
    /// without touching the file.
    pub async fn compact(&self) -> Result<CompactionStats, StorageError> {
        let _guard = self.lock.lock().await;

        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No index log to compact");
                return Ok(CompactionStats::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut order: Vec<IndexRecord> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();
        let mut lines_before = 0;

        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            lines_before += 1;
            let record = IndexRecord::from_line(line).map_err(|e| StorageError::CorruptRecord {
                line: idx + 1,
                message: e.to_string(),
            })?;
            match position.get(&record.note_id) {
                Some(&slot) => order[slot] = record,
                None => {
                    position.insert(record.note_id.clone(), order.len());
                    order.push(record);
                }
            }
        }

        let mut output = String::new();
        for record in &order {
            output.push_str(&record.to_line()?);
            output.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, output).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        let stats = CompactionStats {
            lines_before,
            records_after: order.len(),
        };
        info!(
            before = stats.lines_before,
            after = stats.records_after,
            "Compacted index log"
        );
        Ok(stats)
    }

    /// Read every parseable record in append order.
    ///
    /// Malformed lines are skipped with a warning. A missing log reads as
    /// empty.
    pub async fn read_records(&self) -> Result<Vec<IndexRecord>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match IndexRecord::from_line(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = idx + 1, error = %e, "Skipping malformed index line"),
            }
        }
        Ok(records)
    }

    /// Delete the log file. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
