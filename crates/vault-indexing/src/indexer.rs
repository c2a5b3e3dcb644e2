//! Application context wiring the pipeline, queue and rebuild coordinator.
//!
//! One [`VaultIndexer`] is built per vault and handed to every front end.
//! It also turns raw change notifications into queue events.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use vault_storage::{CompactionStats, IndexLog, StateStore};
use vault_summarizer::{OpenAiGateway, SummaryGateway, SummaryRequest};
use vault_types::{ErrorCode, IndexEvent, IndexEventType, Settings};

use crate::error::IndexingError;
use crate::notifier::Notifier;
use crate::ops::OpsSnapshot;
use crate::pipeline::{IndexingPipeline, ProcessOutcome};
use crate::progress::ProgressCallback;
use crate::queue::EventQueue;
use crate::rebuild::{CheckpointStatus, RebuildCoordinator, RebuildOutcome};
use crate::source::{FsNoteSource, NoteSource};
use crate::tags::{export_tags_json, export_tags_markdown};

const API_NOT_CONFIGURED: &str = "Set API Base URL and API Token in settings first";

/// Kind of a raw change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
    Deleted,
}

/// A raw change notification from the host file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteChange {
    pub kind: ChangeKind,
    /// Vault-relative path
    pub path: String,
    /// Previous path, for renames
    pub old_path: Option<String>,
}

impl NoteChange {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
        }
    }

    pub fn renamed(path: impl Into<String>, old_path: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Renamed,
            path: path.into(),
            old_path: Some(old_path.into()),
        }
    }
}

/// Result of the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCheck {
    NotConfigured,
    Ok { model: String, latency_ms: u64 },
    Failed(ErrorCode),
}

/// Result of a model catalog refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRefresh {
    NotConfigured,
    /// Settings were updated with this many models
    Discovered(usize),
    /// Endpoint has no model listing
    Unsupported,
    Failed(ErrorCode),
}

/// Explicit application context for one vault.
pub struct VaultIndexer {
    settings: Settings,
    pipeline: Arc<IndexingPipeline>,
    queue: EventQueue,
    rebuild: RebuildCoordinator,
    gateway: Option<Arc<dyn SummaryGateway>>,
}

impl VaultIndexer {
    pub fn new(
        settings: Settings,
        source: Arc<dyn NoteSource>,
        gateway: Option<Arc<dyn SummaryGateway>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let pipeline = Arc::new(IndexingPipeline::new(
            &settings,
            source,
            StateStore::from_settings(&settings),
            Arc::new(IndexLog::from_settings(&settings)),
            gateway.clone(),
            notifier,
        ));
        let queue = EventQueue::new(
            pipeline.clone(),
            Duration::from_millis(settings.debounce_ms),
        );
        let rebuild = RebuildCoordinator::new(pipeline.clone(), settings.checkpoint_interval);

        Self {
            settings,
            pipeline,
            queue,
            rebuild,
            gateway,
        }
    }

    /// Build against the vault directory, with the HTTP gateway when an
    /// API endpoint and token are configured.
    pub fn from_settings(settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
        let source = Arc::new(FsNoteSource::new(settings.vault_root.clone()));
        let gateway: Option<Arc<dyn SummaryGateway>> = settings
            .has_api_config()
            .then(|| Arc::new(OpenAiGateway::from_settings(&settings)) as Arc<dyn SummaryGateway>);
        Self::new(settings, source, gateway, notifier)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pipeline(&self) -> &Arc<IndexingPipeline> {
        &self.pipeline
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    fn notify(&self, message: &str) {
        self.pipeline.notifier().notify(message);
    }

    /// Convert a raw notification into a queue event if the path is eligible.
    ///
    /// Returns whether an event was enqueued.
    pub fn handle_change(&self, change: NoteChange) -> bool {
        if !self.pipeline.is_eligible(&change.path) {
            debug!(path = %change.path, "Ignoring change to ineligible path");
            return false;
        }
        let timestamp_ms = Utc::now().timestamp_millis();
        let event = match (change.kind, change.old_path) {
            (ChangeKind::Renamed, Some(old_path)) => {
                IndexEvent::renamed(change.path, old_path, timestamp_ms)
            }
            (kind, _) => {
                let event_type = match kind {
                    ChangeKind::Created => IndexEventType::Create,
                    ChangeKind::Modified => IndexEventType::Modify,
                    ChangeKind::Renamed => IndexEventType::Rename,
                    ChangeKind::Deleted => IndexEventType::Delete,
                };
                IndexEvent::new(event_type, change.path, timestamp_ms)
            }
        };
        self.queue.enqueue(event);
        true
    }

    /// Fresh full rebuild, then the automatic tag export if enabled.
    pub async fn rebuild(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<RebuildOutcome, IndexingError> {
        let outcome = self.rebuild.rebuild(progress).await?;
        self.after_rebuild(outcome).await?;
        Ok(outcome)
    }

    pub async fn resume_rebuild(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<RebuildOutcome, IndexingError> {
        let outcome = self.rebuild.resume_rebuild(progress).await?;
        self.after_rebuild(outcome).await?;
        Ok(outcome)
    }

    async fn after_rebuild(&self, outcome: RebuildOutcome) -> Result<(), IndexingError> {
        if matches!(outcome, RebuildOutcome::Completed { .. }) && self.settings.auto_export_tags {
            self.export_tags_markdown().await?;
        }
        Ok(())
    }

    pub async fn clear_rebuild_checkpoint(&self) -> Result<bool, IndexingError> {
        self.rebuild.clear_checkpoint().await
    }

    pub async fn rebuild_checkpoint_status(
        &self,
    ) -> Result<Option<CheckpointStatus>, IndexingError> {
        self.rebuild.checkpoint_status().await
    }

    /// Force-process one note. Ineligible paths only produce a notification.
    pub async fn reindex_file(&self, path: &str) -> Result<Option<ProcessOutcome>, IndexingError> {
        match self.pipeline.force_process_path(path).await {
            Ok(outcome) => {
                self.notify(&format!("Reindex complete: {path}"));
                Ok(Some(outcome))
            }
            Err(IndexingError::NotEligible(_)) => {
                self.notify("File is not eligible for indexing");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Force-process every eligible note under `folder`. Returns how many.
    pub async fn reindex_folder(&self, folder: &str) -> Result<usize, IndexingError> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let notes: Vec<_> = self
            .pipeline
            .eligible_notes()
            .await?
            .into_iter()
            .filter(|note| note.path.starts_with(&prefix))
            .collect();

        if notes.is_empty() {
            self.notify("No eligible markdown files in folder");
            return Ok(0);
        }

        self.notify(&format!("Reindexing {} files in {}", notes.len(), folder));
        for note in &notes {
            self.pipeline.force_process(note).await?;
        }
        self.notify(&format!("Reindex complete: {} files processed", notes.len()));
        Ok(notes.len())
    }

    /// Re-queue every note in the retry queue, empty it, and drain.
    ///
    /// Notes that fail again re-enter the retry queue with a count of 1.
    pub async fn retry_failed(&self) -> Result<usize, IndexingError> {
        if self.pipeline.load_state().await?.retry_queue.is_empty() {
            self.notify("No failed summaries to retry");
            return Ok(0);
        }

        let items = self
            .pipeline
            .update_state(|state| std::mem::take(&mut state.retry_queue))
            .await?;

        let timestamp_ms = Utc::now().timestamp_millis();
        for item in &items {
            let mut event = IndexEvent::new(IndexEventType::Modify, item.path.clone(), timestamp_ms);
            event.note_id = item.note_id.clone();
            self.queue.enqueue(event);
        }
        self.queue.flush_now().await;
        info!(count = items.len(), "Retried failed summaries");
        self.notify("Retry queue processed");
        Ok(items.len())
    }

    pub async fn compact(&self) -> Result<CompactionStats, IndexingError> {
        let stats = self.pipeline.log().compact().await?;
        self.notify("Index compacted");
        Ok(stats)
    }

    pub async fn ops_snapshot(&self) -> Result<OpsSnapshot, IndexingError> {
        let state = self.pipeline.load_state().await?;
        Ok(OpsSnapshot::build(self.queue.stats(), &state))
    }

    /// Summarize a fixed probe note to check endpoint and credentials.
    pub async fn test_api(&self) -> ApiCheck {
        let Some(gateway) = &self.gateway else {
            self.notify(API_NOT_CONFIGURED);
            return ApiCheck::NotConfigured;
        };
        let request = SummaryRequest {
            note_id: "connectivity-test".to_string(),
            title: "Connectivity Test".to_string(),
            content: "Return a short sentence confirming API connectivity.".to_string(),
            max_chars: self.settings.max_summary_chars,
        };
        match gateway.summarize(&request).await {
            Ok(success) => {
                let meta = success.provider_meta;
                self.notify(&format!("API OK ({}, {}ms)", meta.model, meta.latency_ms));
                ApiCheck::Ok {
                    model: meta.model,
                    latency_ms: meta.latency_ms,
                }
            }
            Err(failure) => {
                self.notify(&format!("API Failed: {}", failure.code));
                ApiCheck::Failed(failure.code)
            }
        }
    }

    /// Fetch the model list and record it in `settings`.
    ///
    /// The caller persists `settings` when models were discovered.
    pub async fn refresh_model_catalog(&self, settings: &mut Settings) -> CatalogRefresh {
        let Some(gateway) = &self.gateway else {
            self.notify(API_NOT_CONFIGURED);
            return CatalogRefresh::NotConfigured;
        };
        match gateway.list_models().await {
            Ok(models) => {
                let count = models.len();
                settings.apply_model_catalog(models, Utc::now());
                self.notify(&format!("Discovered {count} model(s)"));
                CatalogRefresh::Discovered(count)
            }
            Err(failure) if failure.unsupported => {
                self.notify("This endpoint does not support /v1/models. Use custom model name.");
                CatalogRefresh::Unsupported
            }
            Err(failure) => {
                self.notify(&format!("Model discovery failed: {}", failure.code));
                CatalogRefresh::Failed(failure.code)
            }
        }
    }

    /// Write the Markdown tag listing into the vault. Returns the tag count.
    pub async fn export_tags_markdown(&self) -> Result<Option<usize>, IndexingError> {
        let target = self.settings.tags_export_file();
        let exported = export_tags_markdown(self.pipeline.log(), &target).await?;
        match exported {
            Some(count) => self.notify(&format!(
                "Tags exported to {} ({count} tags)",
                target.display()
            )),
            None => self.notify("No tags found in index"),
        }
        Ok(exported)
    }

    /// Write the JSON tag summary into the data directory. Returns the tag count.
    pub async fn export_tags_json(&self) -> Result<Option<usize>, IndexingError> {
        let target = self.settings.tags_json_path();
        let exported = export_tags_json(self.pipeline.log(), &target).await?;
        match exported {
            Some(count) => self.notify(&format!(
                "Tags index exported to {} ({count} tags)",
                target.display()
            )),
            None => self.notify("No tags found in index"),
        }
        Ok(exported)
    }

    /// Drain and drop queued events, then delete the index and state files.
    pub async fn clear_data(&self) -> Result<(), IndexingError> {
        self.queue.flush_now().await;
        self.queue.clear();
        self.pipeline.log().clear().await?;
        self.pipeline.store().clear().await?;
        self.notify("Index data cleared successfully");
        Ok(())
    }

    /// Index and state file locations.
    pub fn paths_text(&self) -> String {
        format!(
            "Index: {} | State: {}",
            self.pipeline.log().path().display(),
            self.pipeline.store().path().display()
        )
    }

    /// Drain what is pending, then stop the debounce timer.
    pub async fn shutdown(&self) {
        self.queue.flush_now().await;
        self.queue.clear();
    }
}
