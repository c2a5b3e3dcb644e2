//! Rebuild progress reporting.

use tracing::info;

/// Width of the text progress bar, in cells.
pub const PROGRESS_BAR_CELLS: usize = 16;

/// Receives rebuild progress after every processed file.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, done: usize, total: usize);
}

/// A no-op progress callback for when progress reporting isn't needed.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_progress(&self, _done: usize, _total: usize) {}
}

/// Logs the progress bar every `every` files and on the last one.
pub struct LoggingProgressCallback {
    every: usize,
}

impl LoggingProgressCallback {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, done: usize, total: usize) {
        if done % self.every == 0 || done == total {
            info!(done, total, "Rebuild {}", render_progress_bar(done, total));
        }
    }
}

/// Render `[####------------] done/total (pct%)`.
pub fn render_progress_bar(done: usize, total: usize) -> String {
    let ratio = if total == 0 {
        0.0
    } else {
        done as f64 / total as f64
    };
    let percent = (ratio * 100.0).round() as usize;
    let filled = ((ratio * PROGRESS_BAR_CELLS as f64).round() as usize).min(PROGRESS_BAR_CELLS);
    format!(
        "[{}{}] {done}/{total} ({percent}%)",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_CELLS - filled)
    )
}
