//! Per-note processing routine.
//!
//! Every operation reloads the state from disk, mutates it, and saves it
//! before returning. All state writers go through one async lock, so two
//! operations never interleave their read-modify-write cycles.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use vault_storage::{IndexLog, StateStore};
use vault_summarizer::{SummaryGateway, SummaryRequest};
use vault_types::{
    fingerprint, IndexEvent, IndexEventType, IndexRecord, IndexState, RetryQueueItem, Settings,
    SummaryStatus, INDEX_SCHEMA_VERSION,
};

use crate::error::IndexingError;
use crate::exclusions::ExclusionRules;
use crate::extract::{extract_outlinks, extract_tags};
use crate::notifier::Notifier;
use crate::queue::EventProcessor;
use crate::source::{is_note_path, NoteFile, NoteSource};

/// What processing did with one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Delete event: hash entry removed
    Deleted,
    /// Path matched an exclusion rule: hash entry removed
    Excluded,
    /// Note carries an excluded tag: hash entry removed
    ExcludedByTag,
    /// Note missing or not indexable: nothing changed
    Missing,
    /// Content fingerprint unchanged: nothing changed
    Unchanged,
    /// A record was appended with this summary status
    Indexed(SummaryStatus),
}

/// The per-note indexing routine and its collaborators.
pub struct IndexingPipeline {
    source: Arc<dyn NoteSource>,
    store: StateStore,
    log: Arc<IndexLog>,
    gateway: Option<Arc<dyn SummaryGateway>>,
    notifier: Arc<dyn Notifier>,
    rules: ExclusionRules,
    max_summary_chars: usize,
    writer: Mutex<()>,
}

impl IndexingPipeline {
    /// Create a pipeline. Without a gateway every indexed note is `pending`.
    pub fn new(
        settings: &Settings,
        source: Arc<dyn NoteSource>,
        store: StateStore,
        log: Arc<IndexLog>,
        gateway: Option<Arc<dyn SummaryGateway>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            store,
            log,
            gateway,
            notifier,
            rules: ExclusionRules::from_settings(settings),
            max_summary_chars: settings.max_summary_chars,
            writer: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &Arc<dyn NoteSource> {
        &self.source
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn log(&self) -> &Arc<IndexLog> {
        &self.log
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    /// Whether a path is a markdown note outside every exclusion rule.
    pub fn is_eligible(&self, path: &str) -> bool {
        is_note_path(path) && !self.rules.is_path_excluded(path)
    }

    /// All notes in the source that pass the exclusion rules.
    pub async fn eligible_notes(&self) -> Result<Vec<NoteFile>, IndexingError> {
        Ok(self
            .source
            .list_notes()
            .await?
            .into_iter()
            .filter(|note| !self.rules.is_path_excluded(&note.path))
            .collect())
    }

    /// Read the current state without taking the writer lock.
    pub async fn load_state(&self) -> Result<IndexState, IndexingError> {
        Ok(self.store.load().await?)
    }

    /// Load, mutate and save the state under the writer lock.
    pub async fn update_state<F, R>(&self, mutate: F) -> Result<R, IndexingError>
    where
        F: FnOnce(&mut IndexState) -> R + Send,
        R: Send,
    {
        let _writer = self.writer.lock().await;
        let mut state = self.store.load().await?;
        let result = mutate(&mut state);
        self.store.save(&state).await?;
        Ok(result)
    }

    /// Process one change event.
    pub async fn process_event(&self, event: &IndexEvent) -> Result<ProcessOutcome, IndexingError> {
        let _writer = self.writer.lock().await;
        let mut state = self.store.load().await?;

        if event.event_type == IndexEventType::Delete {
            state.forget_note(&event.note_id);
            self.store.save(&state).await?;
            debug!(note_id = %event.note_id, "Forgot deleted note");
            return Ok(ProcessOutcome::Deleted);
        }

        if self.rules.is_path_excluded(&event.path) {
            state.forget_note(&event.note_id);
            self.store.save(&state).await?;
            debug!(note_id = %event.note_id, "Retired excluded note");
            return Ok(ProcessOutcome::Excluded);
        }

        let Some(note) = self.source.get_note(&event.path).await? else {
            debug!(path = %event.path, "Note no longer present, skipping");
            return Ok(ProcessOutcome::Missing);
        };

        let content = self.source.read_content(&note).await?;
        let hash = fingerprint(&content);
        if state.hash_of(&note.path) == Some(hash.as_str()) && !event.is_rename() {
            debug!(note_id = %note.path, "Content unchanged, skipping");
            return Ok(ProcessOutcome::Unchanged);
        }

        let renamed_from = event
            .is_rename()
            .then_some(event.old_path.as_deref())
            .flatten();
        self.index_note(state, &note, &content, hash, renamed_from, true)
            .await
    }

    /// Re-derive and re-append a note's record regardless of its fingerprint.
    pub async fn force_process(&self, note: &NoteFile) -> Result<ProcessOutcome, IndexingError> {
        let _writer = self.writer.lock().await;
        let state = self.store.load().await?;
        let content = self.source.read_content(note).await?;
        let hash = fingerprint(&content);
        self.index_note(state, note, &content, hash, None, false).await
    }

    /// Force-process the note at `path` if it is eligible.
    pub async fn force_process_path(&self, path: &str) -> Result<ProcessOutcome, IndexingError> {
        if !self.is_eligible(path) {
            return Err(IndexingError::NotEligible(path.to_string()));
        }
        let note = self
            .source
            .get_note(path)
            .await?
            .ok_or_else(|| IndexingError::NotEligible(path.to_string()))?;
        self.force_process(&note).await
    }

    /// Shared tail of event and forced processing. Caller holds the writer lock.
    async fn index_note(
        &self,
        mut state: IndexState,
        note: &NoteFile,
        content: &str,
        hash: String,
        renamed_from: Option<&str>,
        announce: bool,
    ) -> Result<ProcessOutcome, IndexingError> {
        let tags = extract_tags(content);
        let outlinks = extract_outlinks(content);

        if self.rules.has_excluded_tag(&tags) {
            state.forget_note(&note.path);
            self.store.save(&state).await?;
            debug!(note_id = %note.path, "Retired note with excluded tag");
            return Ok(ProcessOutcome::ExcludedByTag);
        }

        let mut summary = None;
        let mut provider_meta = None;
        let status = match &self.gateway {
            None => SummaryStatus::Pending,
            Some(gateway) => {
                let request = SummaryRequest {
                    note_id: note.path.clone(),
                    title: note.base_name.clone(),
                    content: content.to_string(),
                    max_chars: self.max_summary_chars,
                };
                match gateway.summarize(&request).await {
                    Ok(success) => {
                        state.remove_retry_item(&note.path);
                        summary = Some(success.summary);
                        provider_meta = Some(success.provider_meta);
                        if announce {
                            self.notifier
                                .notify(&format!("Summary ready: {}", note.path));
                        }
                        SummaryStatus::Ok
                    }
                    Err(failure) => {
                        let retry_count = state.next_retry_count(&note.path);
                        state.upsert_retry_item(RetryQueueItem {
                            note_id: note.path.clone(),
                            path: note.path.clone(),
                            failed_at: Utc::now(),
                            error_code: failure.code,
                            error_message: Some(failure.message),
                            retry_count,
                            last_retry_at: None,
                        });
                        provider_meta = Some(failure.provider_meta);
                        if announce {
                            self.notifier.notify(&format!(
                                "Summary failed ({}): {}",
                                failure.code, note.path
                            ));
                        }
                        SummaryStatus::Failed
                    }
                }
            }
        };

        let record = IndexRecord {
            schema_version: INDEX_SCHEMA_VERSION.to_string(),
            note_id: note.path.clone(),
            path: note.path.clone(),
            title: note.base_name.clone(),
            tags,
            outlinks,
            summary,
            summary_status: status,
            hash,
            mtime: note.modified_at,
            provider_meta,
        };
        self.log.append(&record).await?;

        state.record_processed(&note.path, &record.hash, status, renamed_from);
        self.store.save(&state).await?;

        info!(note_id = %note.path, status = ?status, "Indexed note");
        Ok(ProcessOutcome::Indexed(status))
    }
}

#[async_trait]
impl EventProcessor for IndexingPipeline {
    async fn process(&self, event: IndexEvent) -> Result<(), IndexingError> {
        self.process_event(&event).await.map(|_| ())
    }
}
