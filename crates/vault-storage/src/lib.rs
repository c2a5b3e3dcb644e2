//! Storage layer for the vault indexer.
//!
//! Provides file-backed storage with:
//! - [`StateStore`]: the single JSON state record, merged over defaults on load
//! - [`IndexLog`]: the append-only JSONL content index with compaction

pub mod error;
pub mod log;
pub mod state;

pub use error::StorageError;
pub use log::{CompactionStats, IndexLog};
pub use state::StateStore;
