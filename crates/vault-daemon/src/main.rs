//! Vault Indexer
//!
//! Keeps an incremental, summarized content index of a markdown vault.
//!
//! # Usage
//!
//! ```bash
//! vault-indexer watch [--vault PATH]
//! vault-indexer rebuild [--resume]
//! vault-indexer status [--json]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/vault-index/config.toml)
//! 3. Environment variables (VAULT_INDEX_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use vault_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
