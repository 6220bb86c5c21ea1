//! softshelf-li - Library Ingest service
//!
//! Walks the configured library roots, stages installer files into the scan
//! ledger, reconciles the catalog against what is on disk, and auto-matches
//! cleanly named files into catalog products and versions using the
//! configured AI text provider.

use anyhow::Result;
use clap::Parser;
use softshelf_common::config::{resolve_root_folder, RootFolder};
use softshelf_common::events::EventBus;
use softshelf_li::config::{ExclusionRules, ServiceConfig};
use softshelf_li::services::{
    AiProvider, AutoMatcher, IngestScheduler, SchedulerConfig, TextSynthClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "softshelf-li", about = "SoftShelf library ingest service")]
struct Cli {
    /// Root folder for the database and config files
    #[arg(long)]
    root: Option<String>,

    /// Path to the service TOML config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single scan-and-match cycle, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Resolve root folder and config
    let root = RootFolder::new(resolve_root_folder(cli.root.as_deref(), "softshelf-li"));
    root.ensure_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let config_path = cli
        .config
        .clone()
        .or_else(|| softshelf_common::config::config_file_path("softshelf-li.toml"))
        .unwrap_or_else(|| root.path().join("softshelf-li.toml"));
    let config = ServiceConfig::load(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // Step 2: Initialize tracing
    let filter = config
        .log_filter
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting softshelf-li (Library Ingest) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Root folder: {}", root.path().display());

    // Step 3: Open or create the database
    let db_path = root.database_path();
    info!("Database: {}", db_path.display());
    let db = softshelf_li::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 4: Exclusion rules and event bus
    let rules = ExclusionRules::load(&root.path().join("scan-exclusions.toml"))
        .map_err(|e| anyhow::anyhow!("Failed to load exclusion rules: {}", e))?;
    let events = EventBus::new(100);

    // Step 5: AI client from provider settings (ENV key beats TOML)
    let api_key = config.resolve_api_key();
    if api_key.is_none() {
        info!("No AI API key configured; synthesis will fall back to heuristics");
    }
    let client = TextSynthClient::new(
        AiProvider::parse(&config.ai.provider),
        &config.ai.model,
        api_key,
    )
    .map_err(|e| anyhow::anyhow!("Failed to build AI client: {}", e))?;

    let matcher = AutoMatcher::new(
        db.clone(),
        client,
        events.clone(),
        config.auto_accept_threshold,
    );

    let scheduler = Arc::new(IngestScheduler::new(
        db,
        rules,
        matcher,
        events,
        SchedulerConfig {
            scan_paths: config.scan_paths.clone(),
            interval: Duration::from_secs(config.scan_interval_minutes * 60),
            auto_match: config.auto_match,
        },
    ));

    if cli.once {
        let report = scheduler.run_once("manual").await;
        info!(
            new_entries = report.scan.new_products,
            matched = report.matching.matched,
            queued = report.matching.queued_for_review,
            "Manual run finished"
        );
        return Ok(());
    }

    scheduler.start().await;
    info!(
        interval_minutes = config.scan_interval_minutes,
        "Scheduler running; press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.stop().await;

    Ok(())
}
