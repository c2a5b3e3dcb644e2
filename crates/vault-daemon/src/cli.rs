//! CLI argument parsing for the vault indexer.
//!
//! CLI flags override every other config source.

use clap::{Parser, Subcommand};

/// Vault Indexer
///
/// Keeps an incremental, summarized content index of a markdown vault.
#[derive(Parser, Debug)]
#[command(name = "vault-indexer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/vault-index/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Vault root directory
    #[arg(long, global = true)]
    pub vault: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the vault and index changes until Ctrl+C
    Watch,

    /// Rebuild the whole index
    Rebuild {
        /// Continue an interrupted rebuild instead of starting over
        #[arg(long)]
        resume: bool,
    },

    /// Reindex one note
    Reindex {
        /// Vault-relative note path
        path: String,
    },

    /// Reindex every note under a folder
    ReindexFolder {
        /// Vault-relative folder path
        folder: String,
    },

    /// Retry notes whose summary failed
    Retry,

    /// Compact the content index to the latest record per note
    Compact,

    /// Show queue, retry and rebuild status
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Discard the rebuild checkpoint
    ClearCheckpoint,

    /// Refresh the model catalog from the API
    Models {
        /// Only list known models, without contacting the API
        #[arg(long)]
        list: bool,
    },

    /// Check API connectivity
    TestApi,

    /// Export the tag index
    ExportTags {
        /// Write JSON to the data directory instead of Markdown into the vault
        #[arg(long)]
        json: bool,
    },

    /// Delete the content index and state
    Clear,

    /// Show index and state file locations
    Paths,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_rebuild_resume() {
        let cli = Cli::parse_from(["vault-indexer", "rebuild", "--resume"]);
        match cli.command {
            Commands::Rebuild { resume } => assert!(resume),
            _ => panic!("Expected Rebuild command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "vault-indexer",
            "status",
            "--vault",
            "/notes",
            "--log-level",
            "debug",
            "-c",
            "/etc/vault.toml",
        ]);
        assert_eq!(cli.vault.as_deref(), Some("/notes"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config.as_deref(), Some("/etc/vault.toml"));
        assert!(matches!(cli.command, Commands::Status { json: false }));
    }

    #[test]
    fn test_cli_reindex_folder() {
        let cli = Cli::parse_from(["vault-indexer", "reindex-folder", "Projects/2026"]);
        match cli.command {
            Commands::ReindexFolder { folder } => assert_eq!(folder, "Projects/2026"),
            _ => panic!("Expected ReindexFolder command"),
        }
    }

    #[test]
    fn test_cli_export_tags_json() {
        let cli = Cli::parse_from(["vault-indexer", "export-tags", "--json"]);
        assert!(matches!(cli.command, Commands::ExportTags { json: true }));
    }

    #[test]
    fn test_cli_simple_commands() {
        let cases = [
            ("watch", "Watch"),
            ("retry", "Retry"),
            ("compact", "Compact"),
            ("clear", "Clear"),
            ("paths", "Paths"),
            ("test-api", "TestApi"),
            ("clear-checkpoint", "ClearCheckpoint"),
        ];
        for (arg, name) in cases {
            let cli = Cli::parse_from(["vault-indexer", arg]);
            assert!(format!("{:?}", cli.command).starts_with(name), "{arg}");
        }
    }
}
