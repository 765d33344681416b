//! Bounty Ledger Server
//!
//! Serves the vulnerability bounty ledger over HTTP.

use std::sync::Arc;

use bounty_ledger::{Config, LedgerService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Bounty Ledger Server");

    let config = Config::load()?;
    info!(
        "Database: {}, governor: {}",
        config.database.path, config.ledger.governor
    );

    let service = Arc::new(LedgerService::from_config(&config)?);
    info!("Ledger ready at height {}", service.height());

    bounty_ledger::server::run_server(&config.server.host, config.server.port, service).await?;

    Ok(())
}
