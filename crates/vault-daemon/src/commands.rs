//! Command implementations for the vault indexer.
//!
//! Every command loads settings, installs logging, builds one
//! [`VaultIndexer`] and runs against it. Advisory messages go through the
//! console notifier; results that scripts consume are printed directly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use vault_indexing::{CatalogRefresh, RebuildOutcome, VaultIndexer};
use vault_types::Settings;

use crate::cli::{Cli, Commands};
use crate::console::{ConsoleNotifier, ConsoleProgress};
use crate::watcher::run_watch;

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    vault_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(vault) = vault_override {
        settings.vault_root = PathBuf::from(vault);
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Run one CLI invocation to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(
        cli.config.as_deref(),
        cli.vault.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    info!(vault = %settings.vault_root.display(), "Vault indexer starting");
    let notifier = Arc::new(ConsoleNotifier::new(settings.enable_notifications));
    let indexer = Arc::new(VaultIndexer::from_settings(settings, notifier));

    match cli.command {
        Commands::Watch => run_watch(indexer).await,
        Commands::Rebuild { resume } => rebuild(&indexer, resume).await,
        Commands::Reindex { path } => {
            indexer.reindex_file(&path).await?;
            Ok(())
        }
        Commands::ReindexFolder { folder } => {
            indexer.reindex_folder(&folder).await?;
            Ok(())
        }
        Commands::Retry => {
            indexer.retry_failed().await?;
            Ok(())
        }
        Commands::Compact => {
            let stats = indexer.compact().await?;
            println!(
                "{} lines compacted to {} records",
                stats.lines_before, stats.records_after
            );
            Ok(())
        }
        Commands::Status { json } => show_status(&indexer, json).await,
        Commands::ClearCheckpoint => {
            if !indexer.clear_rebuild_checkpoint().await? {
                println!("No rebuild checkpoint");
            }
            Ok(())
        }
        Commands::Models { list } => models(&indexer, cli.config.as_deref(), list).await,
        Commands::TestApi => {
            indexer.test_api().await;
            Ok(())
        }
        Commands::ExportTags { json } => {
            if json {
                indexer.export_tags_json().await?;
            } else {
                indexer.export_tags_markdown().await?;
            }
            Ok(())
        }
        Commands::Clear => indexer.clear_data().await.context("Failed to clear index data"),
        Commands::Paths => {
            println!("{}", indexer.paths_text());
            Ok(())
        }
    }
}

async fn rebuild(indexer: &VaultIndexer, resume: bool) -> Result<()> {
    let outcome = if resume {
        indexer.resume_rebuild(&ConsoleProgress).await
    } else {
        indexer.rebuild(&ConsoleProgress).await
    }
    .context("Rebuild failed; run `rebuild --resume` to continue")?;

    if let RebuildOutcome::Completed { processed, total } = outcome {
        info!(processed, total, "Rebuild finished");
    }
    Ok(())
}

/// Print queue, retry and rebuild status.
pub async fn show_status(indexer: &VaultIndexer, json: bool) -> Result<()> {
    let snapshot = indexer.ops_snapshot().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", snapshot.summary_line());
    println!("Last success: {}", snapshot.last_success_at.to_rfc3339());
    match &snapshot.rebuild {
        Some(rebuild) if rebuild.in_progress => {
            println!("Rebuild: interrupted at {}", rebuild.progress)
        }
        Some(rebuild) => println!("Rebuild: complete ({})", rebuild.progress),
        None => println!("Rebuild: never run"),
    }
    println!("Models: {}", indexer.settings().model_catalog_status_text());
    Ok(())
}

/// Refresh (or just list) the model catalog, saving discovered models.
async fn models(indexer: &VaultIndexer, config_path: Option<&str>, list_only: bool) -> Result<()> {
    let mut settings = indexer.settings().clone();
    if !list_only {
        if let CatalogRefresh::Discovered(_) = indexer.refresh_model_catalog(&mut settings).await {
            let path = config_path
                .map(PathBuf::from)
                .unwrap_or_else(Settings::default_config_path);
            settings
                .save(&path)
                .with_context(|| format!("Failed to save settings to {}", path.display()))?;
            info!(path = %path.display(), "Saved model catalog");
        }
    }

    println!("{}", settings.model_catalog_status_text());
    for model in settings.model_options() {
        let marker = if model == settings.model { "*" } else { " " };
        println!("{marker} {model}");
    }
    Ok(())
}
