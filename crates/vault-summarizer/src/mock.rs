//! Scripted gateway for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use vault_types::{ErrorCode, ProviderMeta};

use crate::{
    truncate_chars, CatalogFailure, SummaryFailure, SummaryGateway, SummaryRequest,
    SummarySuccess,
};

enum Scripted {
    Succeed,
    Fail(ErrorCode),
}

/// Gateway that replays scripted outcomes.
///
/// Queued outcomes are consumed in order; once exhausted every call uses
/// the default outcome. Successful summaries are derived from the note
/// title. Every request is recorded.
pub struct MockGateway {
    default_failure: Option<ErrorCode>,
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<SummaryRequest>>,
    models: Result<Vec<String>, CatalogFailure>,
}

impl MockGateway {
    /// A gateway whose calls all succeed.
    pub fn succeeding() -> Self {
        Self {
            default_failure: None,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            models: Ok(Vec::new()),
        }
    }

    /// A gateway whose calls all fail with `code`.
    pub fn failing(code: ErrorCode) -> Self {
        Self {
            default_failure: Some(code),
            ..Self::succeeding()
        }
    }

    /// Queue one success ahead of the default outcome.
    pub fn then_succeed(self) -> Self {
        self.push(Scripted::Succeed)
    }

    /// Queue one failure ahead of the default outcome.
    pub fn then_fail(self, code: ErrorCode) -> Self {
        self.push(Scripted::Fail(code))
    }

    /// Set the model listing outcome.
    pub fn with_models(mut self, models: Result<Vec<String>, CatalogFailure>) -> Self {
        self.models = models;
        self
    }

    fn push(self, outcome: Scripted) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<SummaryRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn meta() -> ProviderMeta {
        ProviderMeta {
            provider: "mock".to_string(),
            model: "mock-model".to_string(),
            latency_ms: 0,
            tokens_input: None,
            tokens_output: None,
            generated_at: Utc::now(),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::succeeding()
    }
}

#[async_trait]
impl SummaryGateway for MockGateway {
    async fn summarize(&self, request: &SummaryRequest) -> Result<SummarySuccess, SummaryFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let failure = match scripted {
            Some(Scripted::Succeed) => None,
            Some(Scripted::Fail(code)) => Some(code),
            None => self.default_failure,
        };

        match failure {
            Some(code) => Err(SummaryFailure {
                code,
                message: code.description().to_string(),
                provider_meta: Self::meta(),
            }),
            None => Ok(SummarySuccess {
                summary: truncate_chars(&format!("Summary of {}", request.title), request.max_chars),
                provider_meta: Self::meta(),
            }),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, CatalogFailure> {
        self.models.clone()
    }
}
