//! End-to-end test infrastructure for the vault indexer.
//!
//! Provides a shared [`TestHarness`] that owns a temporary vault and a
//! fully wired [`VaultIndexer`], plus helpers for editing notes and
//! reading back the persisted index.

use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;
use tempfile::TempDir;

use vault_indexing::{FsNoteSource, MemoryNotifier, NoteChange, VaultIndexer};
use vault_summarizer::SummaryGateway;
use vault_types::{IndexRecord, IndexState, Settings};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps the vault alive for the lifetime of the harness
    pub temp_dir: TempDir,
    pub notifier: Arc<MemoryNotifier>,
    pub indexer: VaultIndexer,
}

impl TestHarness {
    /// Offline harness: no API configured, every note indexes as pending.
    pub fn new() -> Self {
        Self::build(|_| {}, None)
    }

    /// Harness using `gateway` for summaries.
    pub fn with_gateway(gateway: Arc<dyn SummaryGateway>) -> Self {
        Self::build(|_| {}, Some(gateway))
    }

    /// Harness with adjusted settings.
    ///
    /// Without an explicit gateway the indexer is built from settings, so
    /// configuring an API base URL and token selects the HTTP gateway.
    pub fn build(
        configure: impl FnOnce(&mut Settings),
        gateway: Option<Arc<dyn SummaryGateway>>,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp vault");
        let mut settings = Settings {
            vault_root: temp_dir.path().to_path_buf(),
            // Tests drain explicitly with flush_now
            debounce_ms: 60_000,
            ..Settings::default()
        };
        configure(&mut settings);

        let notifier = Arc::new(MemoryNotifier::new());
        let indexer = match gateway {
            Some(gateway) => VaultIndexer::new(
                settings,
                Arc::new(FsNoteSource::new(temp_dir.path())),
                Some(gateway),
                notifier.clone(),
            ),
            None => VaultIndexer::from_settings(settings, notifier.clone()),
        };

        Self {
            temp_dir,
            notifier,
            indexer,
        }
    }

    pub fn vault(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_note(&self, path: &str, content: &str) {
        let full = self.vault().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create note folder");
        }
        std::fs::write(full, content).expect("Failed to write note");
    }

    pub fn remove_note(&self, path: &str) {
        std::fs::remove_file(self.vault().join(path)).expect("Failed to remove note");
    }

    pub fn rename_note(&self, from: &str, to: &str) {
        let target = self.vault().join(to);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create note folder");
        }
        std::fs::rename(self.vault().join(from), target).expect("Failed to rename note");
    }

    /// Feed changes to the indexer and drain the queue.
    pub async fn apply(&self, changes: impl IntoIterator<Item = NoteChange>) {
        for change in changes {
            self.indexer.handle_change(change);
        }
        self.indexer.queue().flush_now().await;
    }

    pub async fn records(&self) -> Vec<IndexRecord> {
        self.indexer
            .pipeline()
            .log()
            .read_records()
            .await
            .expect("Failed to read index")
    }

    pub async fn state(&self) -> IndexState {
        self.indexer
            .pipeline()
            .load_state()
            .await
            .expect("Failed to load state")
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifier.messages()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// API settings pointing at `base_url` with a fixed test token.
pub fn configure_api(settings: &mut Settings, base_url: &str) {
    settings.api_base_url = base_url.to_string();
    settings.api_token = SecretString::from("sk-test".to_string());
    settings.timeout_ms = 2_000;
}
