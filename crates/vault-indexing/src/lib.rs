//! Incremental indexing for a vault of markdown notes.
//!
//! Change notifications flow through a debounced [`EventQueue`] into the
//! [`IndexingPipeline`], which fingerprints each note, extracts tags and
//! links, requests a summary, and appends a record to the content log.
//! [`RebuildCoordinator`] walks the whole vault with resumable checkpoints.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vault_indexing::{LogNotifier, NoteChange, ChangeKind, VaultIndexer};
//!
//! let settings = vault_types::Settings::load(None)?;
//! let notifier = Arc::new(LogNotifier::new(settings.enable_notifications));
//! let indexer = VaultIndexer::from_settings(settings, notifier);
//!
//! indexer.handle_change(NoteChange::new(ChangeKind::Modified, "Notes/today.md"));
//! indexer.shutdown().await;
//! ```

pub mod error;
pub mod exclusions;
pub mod extract;
pub mod indexer;
pub mod notifier;
pub mod ops;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod rebuild;
pub mod source;
pub mod tags;

pub use error::IndexingError;
pub use exclusions::ExclusionRules;
pub use extract::{extract_outlinks, extract_tags};
pub use indexer::{ApiCheck, CatalogRefresh, ChangeKind, NoteChange, VaultIndexer};
pub use notifier::{LogNotifier, MemoryNotifier, NoOpNotifier, Notifier};
pub use ops::OpsSnapshot;
pub use pipeline::{IndexingPipeline, ProcessOutcome};
pub use progress::{
    render_progress_bar, LoggingProgressCallback, NoOpProgressCallback, ProgressCallback,
};
pub use queue::{EventProcessor, EventQueue, QueueStats};
pub use rebuild::{CheckpointStatus, RebuildCoordinator, RebuildOutcome};
pub use source::{is_note_path, FsNoteSource, NoteFile, NoteSource, NOTE_EXTENSION};
pub use tags::{export_tags_json, export_tags_markdown, TagIndex, JSON_FILES_PER_TAG};
