//! Terminal front end for notifications and rebuild progress.

use std::io::Write;

use vault_indexing::{render_progress_bar, Notifier, ProgressCallback};

/// Prints advisory messages to stdout when enabled.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    enabled: bool,
}

impl ConsoleNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        if self.enabled {
            println!("{message}");
        }
    }
}

/// Redraws the rebuild progress bar on stderr.
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, done: usize, total: usize) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", render_progress_bar(done, total));
        if done >= total {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}
