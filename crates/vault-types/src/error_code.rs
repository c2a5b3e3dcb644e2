//! Normalized error codes for summarization failures.
//!
//! These are carried as data on gateway results and persisted on retry
//! queue items, so the serialized form is the SCREAMING_SNAKE_CASE name.

use serde::{Deserialize, Serialize};

/// Failure kind reported by a summary gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Authentication failed (HTTP 401/403)
    AuthFailed,
    /// Rate limit exceeded (HTTP 429)
    RateLimit,
    /// Request exceeded its timeout
    Timeout,
    /// Server error or a response without the expected content
    UpstreamInvalidResponse,
    /// Any other transport failure
    NetworkError,
    /// Content blocked by provider safety filters (reserved)
    ContentFiltered,
    /// Request cancelled (reserved)
    Cancelled,
}

impl ErrorCode {
    /// Stable wire name, e.g. `RATE_LIMIT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::UpstreamInvalidResponse => "UPSTREAM_INVALID_RESPONSE",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ContentFiltered => "CONTENT_FILTERED",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }

    /// Human-readable advice for notifications.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::AuthFailed => "Authentication failed. Check your API key or credentials.",
            ErrorCode::RateLimit => "Rate limit exceeded. Please wait before retrying.",
            ErrorCode::Timeout => "Request timed out. The server took too long to respond.",
            ErrorCode::UpstreamInvalidResponse => "Received invalid response from API provider.",
            ErrorCode::NetworkError => "Network error. Check your internet connection.",
            ErrorCode::ContentFiltered => "Content was blocked by safety filters.",
            ErrorCode::Cancelled => "Request was cancelled by user or system.",
        }
    }

    /// Map a non-success HTTP status to an error code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorCode::AuthFailed,
            429 => ErrorCode::RateLimit,
            _ => ErrorCode::UpstreamInvalidResponse,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
