//! Advisory user notifications.
//!
//! The pipeline reports outcomes as short messages rather than errors.
//! Front ends decide how to surface them.

use std::sync::Mutex;

use tracing::info;

/// Receives advisory messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Logs messages at info level when enabled.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    enabled: bool,
}

impl LogNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        if self.enabled {
            info!(target: "vault_indexing::notice", "{message}");
        }
    }
}

/// Discards every message.
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _message: &str) {}
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Whether any message starts with `prefix`.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.messages().iter().any(|m| m.starts_with(prefix))
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
