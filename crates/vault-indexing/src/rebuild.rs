//! Full rebuild with resumable checkpoints.
//!
//! A fresh rebuild persists a checkpoint before touching any file, then
//! force-processes every eligible note. Every `checkpoint_interval` files
//! (and after the last one) the paths processed since the previous
//! checkpoint are appended to the checkpoint. An interrupted rebuild can be
//! resumed: notes already listed in the checkpoint are skipped, so at most
//! `checkpoint_interval - 1` notes are processed twice.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use vault_types::RebuildCheckpoint;

use crate::error::IndexingError;
use crate::pipeline::IndexingPipeline;
use crate::progress::ProgressCallback;

/// How a rebuild call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Every remaining note was processed and the checkpoint closed
    Completed {
        /// Notes processed by this call
        processed: usize,
        /// Notes in the whole rebuild, including earlier runs
        total: usize,
    },
    /// Fresh start with nothing to index
    NoEligibleFiles,
    /// Resume requested without an interrupted rebuild
    NothingToResume,
}

/// Snapshot of the persisted checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointStatus {
    pub in_progress: bool,
    /// `processed/total`
    pub progress: String,
}

/// Drives full rebuilds through [`IndexingPipeline::force_process`].
pub struct RebuildCoordinator {
    pipeline: Arc<IndexingPipeline>,
    checkpoint_interval: usize,
}

impl RebuildCoordinator {
    pub fn new(pipeline: Arc<IndexingPipeline>, checkpoint_interval: usize) -> Self {
        Self {
            pipeline,
            checkpoint_interval: checkpoint_interval.max(1),
        }
    }

    /// Start a fresh rebuild over every eligible note.
    pub async fn rebuild(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<RebuildOutcome, IndexingError> {
        self.run(false, progress).await
    }

    /// Continue an interrupted rebuild.
    pub async fn resume_rebuild(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<RebuildOutcome, IndexingError> {
        let state = self.pipeline.load_state().await?;
        if !state.has_active_rebuild() {
            self.pipeline.notifier().notify("No interrupted rebuild found");
            return Ok(RebuildOutcome::NothingToResume);
        }
        self.run(true, progress).await
    }

    /// Mark the checkpoint as no longer in progress. Returns whether one existed.
    pub async fn clear_checkpoint(&self) -> Result<bool, IndexingError> {
        let cleared = self
            .pipeline
            .update_state(|state| match state.rebuild_checkpoint.as_mut() {
                Some(checkpoint) => {
                    checkpoint.in_progress = false;
                    true
                }
                None => false,
            })
            .await?;
        if cleared {
            self.pipeline.notifier().notify("Rebuild checkpoint cleared");
        }
        Ok(cleared)
    }

    /// Current checkpoint, if any rebuild ever started.
    pub async fn checkpoint_status(&self) -> Result<Option<CheckpointStatus>, IndexingError> {
        let state = self.pipeline.load_state().await?;
        Ok(state.rebuild_checkpoint.map(|checkpoint| CheckpointStatus {
            in_progress: checkpoint.in_progress,
            progress: checkpoint.progress_label(),
        }))
    }

    async fn run(
        &self,
        resume: bool,
        progress: &dyn ProgressCallback,
    ) -> Result<RebuildOutcome, IndexingError> {
        let notifier = self.pipeline.notifier();
        let state = self.pipeline.load_state().await?;
        let all = self.pipeline.eligible_notes().await?;

        let active = state
            .rebuild_checkpoint
            .as_ref()
            .filter(|checkpoint| resume && checkpoint.in_progress);

        let (files, start, total) = match active {
            Some(checkpoint) => {
                let done: HashSet<&str> = checkpoint
                    .processed_files
                    .iter()
                    .map(String::as_str)
                    .collect();
                let remaining: Vec<_> = all
                    .into_iter()
                    .filter(|note| !done.contains(note.path.as_str()))
                    .collect();
                let total = if checkpoint.total_files > 0 {
                    checkpoint.total_files
                } else {
                    remaining.len()
                };
                notifier.notify(&format!(
                    "Resuming rebuild: {} files already processed",
                    checkpoint.progress_label()
                ));
                info!(
                    processed = checkpoint.processed_count,
                    remaining = remaining.len(),
                    "Resuming rebuild"
                );
                (remaining, checkpoint.processed_count, total)
            }
            None => {
                if all.is_empty() {
                    notifier.notify("No eligible markdown files for rebuild");
                    return Ok(RebuildOutcome::NoEligibleFiles);
                }
                let total = all.len();
                notifier.notify(&format!("Starting full rebuild of {total} files..."));
                info!(total, "Starting full rebuild");
                self.pipeline
                    .update_state(|state| {
                        state.rebuild_checkpoint = Some(RebuildCheckpoint::start(total));
                    })
                    .await?;
                (all, 0, total)
            }
        };

        progress.on_progress(start, total);

        let mut since_checkpoint: Vec<String> = Vec::new();
        let last = files.len().saturating_sub(1);
        for (i, note) in files.iter().enumerate() {
            self.pipeline.force_process(note).await?;
            since_checkpoint.push(note.path.clone());

            let current = start + i + 1;
            progress.on_progress(current, total);

            if (i + 1) % self.checkpoint_interval == 0 || i == last {
                let batch = std::mem::take(&mut since_checkpoint);
                self.pipeline
                    .update_state(move |state| {
                        if let Some(checkpoint) = state.rebuild_checkpoint.as_mut() {
                            checkpoint.advance(&batch, current);
                        }
                    })
                    .await?;
            }
        }

        self.pipeline
            .update_state(|state| {
                if let Some(checkpoint) = state.rebuild_checkpoint.as_mut() {
                    checkpoint.in_progress = false;
                }
            })
            .await?;

        notifier.notify(&format!("Rebuild complete: {total} files processed"));
        info!(processed = files.len(), total, "Rebuild complete");
        Ok(RebuildOutcome::Completed {
            processed: files.len(),
            total,
        })
    }
}
