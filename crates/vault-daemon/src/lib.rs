//! Vault indexer binary support.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations
//! - `console`: Terminal notifier and progress bar
//! - `watcher`: Filesystem watcher with the external-modify delay

pub mod cli;
pub mod commands;
pub mod console;
pub mod watcher;

pub use cli::{Cli, Commands};
pub use commands::{init_logging, load_settings, run, show_status};
pub use console::{ConsoleNotifier, ConsoleProgress};
pub use watcher::{run_watch, translate, ModifyDelay};
