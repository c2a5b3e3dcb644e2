//! Operational status snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vault_types::IndexState;

use crate::queue::QueueStats;
use crate::rebuild::CheckpointStatus;

/// Queue counters plus retry and checkpoint state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpsSnapshot {
    pub queue: QueueStats,
    /// Failed notes per the stored stats, else the retry queue length
    pub failed_count: usize,
    pub retry_count: usize,
    pub last_success_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuild: Option<CheckpointStatus>,
}

impl OpsSnapshot {
    pub fn build(queue: QueueStats, state: &IndexState) -> Self {
        let retry_count = state.retry_queue.len();
        Self {
            queue,
            failed_count: state
                .stats
                .as_ref()
                .map(|stats| stats.failed_notes)
                .unwrap_or(retry_count),
            retry_count,
            last_success_at: state.last_success_at,
            rebuild: state
                .rebuild_checkpoint
                .as_ref()
                .map(|checkpoint| CheckpointStatus {
                    in_progress: checkpoint.in_progress,
                    progress: checkpoint.progress_label(),
                }),
        }
    }

    /// One-line summary, e.g. `Queued:0 Processed:3 Failed:1 Retry:1`.
    pub fn summary_line(&self) -> String {
        format!(
            "Queued:{} Processed:{} Failed:{} Retry:{}",
            self.queue.queued, self.queue.processed, self.failed_count, self.retry_count
        )
    }
}
