//! Gateway for OpenAI-compatible chat-completion endpoints.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vault_types::{ErrorCode, ProviderMeta, Settings};

use crate::{
    normalize_model_list, truncate_chars, CatalogFailure, SummaryFailure, SummaryGateway,
    SummaryRequest, SummarySuccess,
};

/// Provider identifier stamped on [`ProviderMeta`].
pub const PROVIDER_NAME: &str = "openai-compatible";

const SYSTEM_PROMPT: &str =
    "Summarize this note into one concise paragraph under the requested max characters.";

/// Connection settings for [`OpenAiGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL without the `/v1` suffix (e.g., "https://api.openai.com")
    pub base_url: String,
    pub model: String,
    pub api_key: SecretString,
    /// Upper bound on one whole request, body included
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.api_base_url.trim().to_string(),
            model: settings.model.clone(),
            api_key: settings.api_token.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: Option<String>,
}

/// Raw outcome of one HTTP exchange, before error-code mapping.
enum Exchange<T> {
    Body(T),
    Status(StatusCode),
    Invalid(String),
}

/// OpenAI-compatible summary gateway.
pub struct OpenAiGateway {
    client: Client,
    config: GatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(GatewayConfig::from_settings(settings))
    }

    fn meta(&self, latency: Duration) -> ProviderMeta {
        ProviderMeta {
            provider: PROVIDER_NAME.to_string(),
            model: self.config.model.clone(),
            latency_ms: latency.as_millis() as u64,
            tokens_input: None,
            tokens_output: None,
            generated_at: Utc::now(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key.expose_secret())
    }

    async fn post_chat(&self, request: &SummaryRequest) -> Result<Exchange<ChatResponse>, reqwest::Error> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Title: {}\n\n{}\n\nMax chars: {}",
                        request.title, request.content, request.max_chars
                    ),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(Exchange::Status(response.status()));
        }

        let text = response.text().await?;
        Ok(match serde_json::from_str::<ChatResponse>(&text) {
            Ok(parsed) => Exchange::Body(parsed),
            Err(e) => Exchange::Invalid(e.to_string()),
        })
    }

    async fn get_models(&self) -> Result<Exchange<ModelsResponse>, reqwest::Error> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .header("Authorization", self.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(Exchange::Status(response.status()));
        }

        let text = response.text().await?;
        Ok(match serde_json::from_str::<ModelsResponse>(&text) {
            Ok(parsed) => Exchange::Body(parsed),
            Err(e) => Exchange::Invalid(e.to_string()),
        })
    }
}

/// Transport failure to error code: timeouts are TIMEOUT, the rest NETWORK_ERROR.
fn transport_code(err: &reqwest::Error) -> ErrorCode {
    if err.is_timeout() {
        ErrorCode::Timeout
    } else {
        ErrorCode::NetworkError
    }
}

fn is_unsupported(status: StatusCode) -> bool {
    matches!(status.as_u16(), 404 | 405 | 501)
}

#[async_trait]
impl SummaryGateway for OpenAiGateway {
    async fn summarize(&self, request: &SummaryRequest) -> Result<SummarySuccess, SummaryFailure> {
        let started = Instant::now();
        debug!(note_id = %request.note_id, model = %self.config.model, "Requesting summary");

        let outcome = tokio::time::timeout(self.config.timeout, self.post_chat(request)).await;
        let meta = self.meta(started.elapsed());

        let failure = |code: ErrorCode, message: String| {
            warn!(note_id = %request.note_id, code = %code, error = %message, "Summary request failed");
            SummaryFailure {
                code,
                message,
                provider_meta: meta.clone(),
            }
        };

        let response = match outcome {
            Err(_) => {
                return Err(failure(
                    ErrorCode::Timeout,
                    format!("Request timed out after {}ms", self.config.timeout.as_millis()),
                ))
            }
            Ok(Err(e)) => return Err(failure(transport_code(&e), e.to_string())),
            Ok(Ok(Exchange::Status(status))) => {
                return Err(failure(
                    ErrorCode::from_http_status(status.as_u16()),
                    format!("HTTP {}", status.as_u16()),
                ))
            }
            Ok(Ok(Exchange::Invalid(message))) => {
                return Err(failure(ErrorCode::UpstreamInvalidResponse, message))
            }
            Ok(Ok(Exchange::Body(body))) => body,
        };

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        let Some(content) = content else {
            return Err(failure(
                ErrorCode::UpstreamInvalidResponse,
                "Missing choices[0].message.content".to_string(),
            ));
        };

        let mut provider_meta = meta.clone();
        if let Some(usage) = response.usage {
            provider_meta.tokens_input = usage.prompt_tokens;
            provider_meta.tokens_output = usage.completion_tokens;
        }

        Ok(SummarySuccess {
            summary: truncate_chars(&content, request.max_chars),
            provider_meta,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, CatalogFailure> {
        let outcome = tokio::time::timeout(self.config.timeout, self.get_models()).await;

        match outcome {
            Err(_) => Err(CatalogFailure {
                code: ErrorCode::Timeout,
                message: format!("Request timed out after {}ms", self.config.timeout.as_millis()),
                unsupported: false,
            }),
            Ok(Err(e)) => Err(CatalogFailure {
                code: transport_code(&e),
                message: e.to_string(),
                unsupported: false,
            }),
            Ok(Ok(Exchange::Status(status))) => Err(CatalogFailure {
                code: ErrorCode::from_http_status(status.as_u16()),
                message: format!("HTTP {}", status.as_u16()),
                unsupported: is_unsupported(status),
            }),
            Ok(Ok(Exchange::Invalid(message))) => Err(CatalogFailure {
                code: ErrorCode::UpstreamInvalidResponse,
                message,
                unsupported: false,
            }),
            Ok(Ok(Exchange::Body(body))) => {
                let models = normalize_model_list(body.data.into_iter().filter_map(|m| m.id));
                debug!(count = models.len(), "Listed models");
                Ok(models)
            }
        }
    }
}
