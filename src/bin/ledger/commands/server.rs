//! Server command - run the ledger server

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use bounty_ledger::{Config, LedgerService};

use crate::style::*;

pub async fn run(config_path: &Path) -> Result<()> {
    let mut config = Config::load_from(config_path)?;
    config.apply_overrides(|key| std::env::var(key).ok());

    println!("  Listening on {}:{}", config.server.host, config.server.port);
    println!("  Database:     {}", style_dim(&config.database.path));
    println!("  Governor:     {}", truncate_address(&config.ledger.governor));
    println!();

    let service = Arc::new(LedgerService::from_config(&config)?);
    bounty_ledger::server::run_server(&config.server.host, config.server.port, service).await
}
