///
/// This module implements the full CLI interface for catalog-sync: command parsing,
/// the mode switch and the user-visible summaries.
///
/// All core business logic (data model, pipeline, triggers) lives in the
/// [`catalog-sync-core`] crate. This module is strictly CLI glue.
///
/// ## Modes
/// - `once`: validate the setup, synchronise once, exit non-zero if any row failed
/// - `interval`: synchronise, then poll the data file every `CHECK_INTERVAL` seconds
/// - `watch`: synchronise, then react to file-system change notifications
/// - `check`: validate data file and credentials without writing anything
/// - `init`: write a sample product CSV to the configured data file path
///
/// The continuous modes stop on Ctrl-C, but never in the middle of a batch.
///
/// [`catalog-sync-core`]: ../../catalog_sync_core/
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use catalog_sync_core::reader::DataFileReader;
use catalog_sync_core::synchronise::{SyncManager, SyncReport};
use catalog_sync_core::trigger::{IntervalTrigger, WatchTrigger};
use clap::{Parser, Subcommand};

use crate::client::ShopwareClient;
use crate::load_config::CliConfig;

/// Sample data written by `init`.
pub const SAMPLE_CSV: &str = "\
product_number,name,description,price,stock,weight,ean,active
SW001,Sample Product 1,First sample product,29.99,100,0.5,1234567890123,true
SW002,Sample Product 2,Second sample product,49.99,50,1.2,2345678901234,true
SW003,Sample Product 3,Third sample product,99.99,25,2.1,3456789012345,false
SW004,Sample Product 4,Fourth sample product,19.99,200,0.3,4567890123456,true
";

/// CLI for catalog-sync: keep a commerce catalog in step with a product CSV file.
#[derive(Parser)]
#[clap(
    name = "catalog-sync",
    version,
    about = "Synchronise a product CSV file into a Shopware-style catalog"
)]
pub struct Cli {
    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Validate the setup and synchronise the data file once
    Once,
    /// Synchronise, then re-synchronise when a periodic check finds the file changed
    Interval,
    /// Synchronise, then re-synchronise on file-system change notifications
    Watch,
    /// Validate the data file and the API credentials without writing
    Check,
    /// Write a sample product CSV to the configured data file path
    Init {
        /// Overwrite an existing data file
        #[clap(long)]
        force: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Once => "once",
            Commands::Interval => "interval",
            Commands::Watch => "watch",
            Commands::Check => "check",
            Commands::Init { .. } => "init",
        }
    }
}

fn manager(config: &CliConfig) -> Result<SyncManager<ShopwareClient>> {
    let api = config.api.require()?;
    Ok(SyncManager::new(
        config.sync.clone(),
        ShopwareClient::new(api),
    ))
}

/// Registers the Ctrl-C handler right away and returns a future resolving on the signal.
///
/// Registration must happen before the first batch starts, otherwise an early
/// Ctrl-C still terminates the process mid-batch.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .context("failed to install the Ctrl-C handler")?;
    #[cfg(windows)]
    let mut interrupt =
        tokio::signal::windows::ctrl_c().context("failed to install the Ctrl-C handler")?;

    Ok(async move {
        if interrupt.recv().await.is_none() {
            tracing::error!("Ctrl-C listener closed");
            std::future::pending::<()>().await;
        }
        tracing::info!("Ctrl-C received, stopping after the current batch");
    })
}

fn print_report(report: &SyncReport) {
    println!(
        "Synchronisation complete: {} succeeded, {} failed, {} total",
        report.succeeded(),
        report.failed(),
        report.total()
    );
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            eprintln!(
                "  line {} ({}): {}",
                failure.line_number,
                failure.business_key.as_deref().unwrap_or("no product_number"),
                e
            );
        }
    }
}

/// Writes [`SAMPLE_CSV`] to `path`, refusing to replace an existing file unless `force`.
pub fn init_data_file(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "data file {} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, SAMPLE_CSV)
        .with_context(|| format!("failed to write sample data to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Sample data file written");
    println!("Sample data written to {}", path.display());
    Ok(())
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(command: Commands, config: CliConfig) -> Result<()> {
    tracing::info!(command = command.name(), "Starting command");

    match command {
        Commands::Init { force } => init_data_file(&config.sync.data_file, force),
        Commands::Check => {
            let mut manager = manager(&config)?;
            manager
                .validate_setup()
                .await
                .context("setup validation failed")?;
            let modified = manager
                .reader()
                .modified_at()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|_| "unknown".into());
            println!(
                "Setup OK: {} (last modified {}) is readable and the API accepted the credentials",
                config.sync.data_file.display(),
                modified
            );
            Ok(())
        }
        Commands::Once => {
            let mut manager = manager(&config)?;
            let report = manager.run_once().await.context("synchronisation failed")?;
            print_report(&report);
            if report.is_success() {
                Ok(())
            } else {
                anyhow::bail!("{} of {} rows failed", report.failed(), report.total())
            }
        }
        Commands::Interval => {
            let shutdown = shutdown_signal()?;
            let mut manager = manager(&config)?;
            let trigger = IntervalTrigger::new(
                DataFileReader::new(&config.sync.data_file),
                config.sync.check_interval,
            );
            let batches = manager.run_continuous(trigger, shutdown).await?;
            tracing::info!(command = "interval", batches, "Interval mode stopped");
            Ok(())
        }
        Commands::Watch => {
            let shutdown = shutdown_signal()?;
            let mut manager = manager(&config)?;
            let trigger = WatchTrigger::new(&config.sync.data_file, config.sync.debounce)
                .context("failed to start watching the data file")?;
            let batches = manager.run_continuous(trigger, shutdown).await?;
            tracing::info!(command = "watch", batches, "Watch mode stopped");
            Ok(())
        }
    }
}
