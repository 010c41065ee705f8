use anyhow::Result;
use catalog_sync::cli::{run, Cli};
use catalog_sync::load_config::load_config;
use catalog_sync::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    // Config problems are reported before the configured subscriber exists.
    let config = logging::bootstrap(|| load_config(cli.config.as_deref()))?;

    logging::init(&config.logging)?;
    tracing::info!("CLI application startup: tracing initialised, environment loaded");
    config.trace_loaded();

    let result = run(cli.command, config).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
