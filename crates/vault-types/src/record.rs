//! Records written to the append-only content index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version stamped on every index record.
pub const INDEX_SCHEMA_VERSION: &str = "1.0.0";

/// Outcome of the summarization step for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    /// Summary generated
    Ok,
    /// Gateway returned a failure; the note sits in the retry queue
    Failed,
    /// No API configuration, summary not attempted
    Pending,
    /// Summarization deliberately skipped
    Skipped,
}

/// Metadata about the provider call that produced (or failed to produce) a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMeta {
    /// Provider identifier (e.g., "openai-compatible")
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_input: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_output: Option<u64>,
    pub generated_at: DateTime<Utc>,
}

/// One fact about a note at one content state.
///
/// Multiple records may exist for the same note id; the latest one is
/// current. Serialized as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub schema_version: String,
    pub note_id: String,
    pub path: String,
    /// File name without extension
    pub title: String,
    pub tags: Vec<String>,
    /// Outbound wikilink targets
    pub outlinks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub summary_status: SummaryStatus,
    /// Fingerprint of the normalized content
    pub hash: String,
    pub mtime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_meta: Option<ProviderMeta>,
}

impl IndexRecord {
    /// Serialize to a single JSON line (without the trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a single JSON line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
