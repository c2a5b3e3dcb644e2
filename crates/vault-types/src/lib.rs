//! # vault-types
//!
//! Shared domain types for the vault indexer.
//!
//! This crate defines the data structures every other crate agrees on:
//! - [`IndexEvent`]: a coalescable change notification for one note
//! - [`IndexRecord`]: one line of the append-only content index
//! - [`IndexState`]: the single persisted state aggregate (hashes, retry
//!   queue, rebuild checkpoint, stats)
//! - [`ErrorCode`]: normalized summarization failure codes
//! - [`Settings`]: layered configuration
//! - [`fingerprint`]: content normalization and hashing

pub mod config;
pub mod error;
pub mod error_code;
pub mod event;
pub mod fingerprint;
pub mod record;
pub mod state;

pub use config::{parse_rule_list, Settings};
pub use error::VaultError;
pub use error_code::ErrorCode;
pub use event::{IndexEvent, IndexEventType};
pub use fingerprint::{fingerprint, normalize};
pub use record::{IndexRecord, ProviderMeta, SummaryStatus, INDEX_SCHEMA_VERSION};
pub use state::{
    IndexState, IndexStats, RebuildCheckpoint, RetryQueueItem, STATE_SCHEMA_VERSION,
};
