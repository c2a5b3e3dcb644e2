//! Summarization gateway for the vault indexer.
//!
//! The gateway is a capability boundary: every call returns a tagged
//! outcome value and never panics or propagates transport errors.
//! [`OpenAiGateway`] talks to OpenAI-compatible endpoints; [`MockGateway`]
//! returns scripted outcomes for tests and offline runs.

mod api;
mod mock;

pub use api::{GatewayConfig, OpenAiGateway, PROVIDER_NAME};
pub use mock::MockGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vault_types::{ErrorCode, ProviderMeta};

/// A note to summarize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub note_id: String,
    pub title: String,
    pub content: String,
    /// Upper bound on the returned summary length, in characters
    pub max_chars: usize,
}

/// A generated summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySuccess {
    pub summary: String,
    pub provider_meta: ProviderMeta,
}

/// A failed summarization attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFailure {
    pub code: ErrorCode,
    pub message: String,
    pub provider_meta: ProviderMeta,
}

/// A failed model listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFailure {
    pub code: ErrorCode,
    pub message: String,
    /// The endpoint has no model listing; fall back to manual model entry
    pub unsupported: bool,
}

/// Replaceable summarization capability.
#[async_trait]
pub trait SummaryGateway: Send + Sync {
    /// Summarize one note. The summary is at most `request.max_chars` long.
    async fn summarize(&self, request: &SummaryRequest) -> Result<SummarySuccess, SummaryFailure>;

    /// List available models, deduplicated and sorted.
    async fn list_models(&self) -> Result<Vec<String>, CatalogFailure>;
}

/// Truncate to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Trim, drop empties, deduplicate and sort model ids.
pub(crate) fn normalize_model_list<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut models: Vec<String> = ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    models.sort();
    models.dedup();
    models
}
