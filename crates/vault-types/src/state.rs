//! The persisted index state aggregate.
//!
//! One instance exists per vault. It is loaded fresh for every operation,
//! mutated, and saved before the operation returns. Every field has a
//! default so that state written by older versions merges over defaults
//! on load.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error_code::ErrorCode;
use crate::record::SummaryStatus;

/// Schema version stamped on the state file.
pub const STATE_SCHEMA_VERSION: &str = "1.0.0";

/// A note whose last summarization attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryQueueItem {
    pub note_id: String,
    pub path: String,
    pub failed_at: DateTime<Utc>,
    pub error_code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<DateTime<Utc>>,
}

/// Progress marker for a full rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildCheckpoint {
    pub in_progress: bool,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub processed_count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processed_files: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl RebuildCheckpoint {
    /// Start a new checkpoint for `total_files` files.
    pub fn start(total_files: usize) -> Self {
        let now = Utc::now();
        Self {
            in_progress: true,
            total_files,
            processed_count: 0,
            processed_files: Vec::new(),
            started_at: now,
            last_updated_at: now,
        }
    }

    /// Record progress up to `processed_count`, marking `paths` as done.
    ///
    /// `processed_count` never regresses.
    pub fn advance(&mut self, paths: &[String], processed_count: usize) {
        self.processed_count = self.processed_count.max(processed_count);
        self.processed_files.extend(paths.iter().cloned());
        self.last_updated_at = Utc::now();
    }

    /// `processed/total` label.
    pub fn progress_label(&self) -> String {
        format!("{}/{}", self.processed_count, self.total_files)
    }
}

/// Aggregate counters kept alongside the state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexStats {
    pub total_notes: usize,
    pub summarized_notes: usize,
    pub failed_notes: usize,
    pub pending_notes: usize,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The single persisted state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexState {
    pub schema_version: String,
    /// note id -> fingerprint of the last successfully processed content
    #[serde(deserialize_with = "null_as_default")]
    pub last_processed_hash: BTreeMap<String, String>,
    /// At most one item per note id
    #[serde(deserialize_with = "null_as_default")]
    pub retry_queue: Vec<RetryQueueItem>,
    pub last_success_at: DateTime<Utc>,
    pub stats: Option<IndexStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuild_checkpoint: Option<RebuildCheckpoint>,
}

impl Default for IndexState {
    fn default() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION.to_string(),
            last_processed_hash: BTreeMap::new(),
            retry_queue: Vec::new(),
            // Unix epoch
            last_success_at: DateTime::<Utc>::default(),
            stats: Some(IndexStats::default()),
            rebuild_checkpoint: None,
        }
    }
}

impl IndexState {
    /// Stored fingerprint for a note, if tracked.
    pub fn hash_of(&self, note_id: &str) -> Option<&str> {
        self.last_processed_hash.get(note_id).map(String::as_str)
    }

    /// Stop tracking a note and stamp the success time.
    pub fn forget_note(&mut self, note_id: &str) {
        self.last_processed_hash.remove(note_id);
        self.touch();
    }

    /// Stamp `last_success_at` with the current time.
    pub fn touch(&mut self) {
        self.last_success_at = Utc::now();
    }

    /// Retry count the next failure for `note_id` should carry.
    pub fn next_retry_count(&self, note_id: &str) -> u32 {
        self.retry_queue
            .iter()
            .find(|item| item.note_id == note_id)
            .map(|item| item.retry_count)
            .unwrap_or(0)
            + 1
    }

    /// Insert or replace the retry item for `item.note_id`.
    ///
    /// Fields absent on the new item keep their previous values.
    pub fn upsert_retry_item(&mut self, mut item: RetryQueueItem) {
        match self
            .retry_queue
            .iter_mut()
            .find(|existing| existing.note_id == item.note_id)
        {
            Some(existing) => {
                if item.error_message.is_none() {
                    item.error_message = existing.error_message.take();
                }
                if item.last_retry_at.is_none() {
                    item.last_retry_at = existing.last_retry_at;
                }
                *existing = item;
            }
            None => self.retry_queue.push(item),
        }
    }

    /// Drop the retry item for `note_id`, if any.
    pub fn remove_retry_item(&mut self, note_id: &str) {
        self.retry_queue.retain(|item| item.note_id != note_id);
    }

    /// Record a freshly processed note: store its fingerprint, drop the
    /// old path on rename, and refresh the aggregate counters.
    pub fn record_processed(
        &mut self,
        note_id: &str,
        hash: &str,
        status: SummaryStatus,
        renamed_from: Option<&str>,
    ) {
        if let Some(old_path) = renamed_from {
            self.last_processed_hash.remove(old_path);
        }
        self.last_processed_hash
            .insert(note_id.to_string(), hash.to_string());
        self.touch();

        let previous = self.stats.clone().unwrap_or_default();
        self.stats = Some(IndexStats {
            total_notes: self.last_processed_hash.len(),
            summarized_notes: previous.summarized_notes
                + usize::from(status == SummaryStatus::Ok),
            failed_notes: self.retry_queue.len(),
            pending_notes: previous.pending_notes + usize::from(status == SummaryStatus::Pending),
        });
    }

    /// Whether a rebuild was interrupted and can be resumed.
    pub fn has_active_rebuild(&self) -> bool {
        self.rebuild_checkpoint
            .as_ref()
            .is_some_and(|checkpoint| checkpoint.in_progress)
    }
}
