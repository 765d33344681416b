//! CLI commands

pub mod address;
pub mod admin;
pub mod appeal;
pub mod events;
pub mod finalize;
pub mod report;
pub mod resolve;
pub mod server;
pub mod stats;
pub mod submit;

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bounty_ledger::auth::parse_signing_key;
use bounty_ledger::{CallOutput, ContentHash, LedgerCall, SignedCall};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use sp_core::sr25519;

use crate::client::LedgerClient;
use crate::style::*;

pub fn signing_key(suri: Option<&str>) -> Result<sr25519::Pair> {
    let suri = suri.ok_or_else(|| anyhow!("A signing key is required (--suri or LEDGER_SURI)"))?;
    parse_signing_key(suri).map_err(|e| anyhow!("{}", e))
}

/// Hash a file's contents, or parse an explicit hex hash
pub fn content_hash(file: Option<&Path>, hash: Option<&str>) -> Result<ContentHash> {
    match (file, hash) {
        (Some(path), _) => {
            let content = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(ContentHash::digest(content))
        }
        (None, Some(hex)) => hex.parse().map_err(|e| anyhow!("Invalid hash: {}", e)),
        (None, None) => bail!("Provide a file or a precomputed hash"),
    }
}

pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Sign `call` with the configured key and submit it
pub async fn send_call(url: &str, suri: Option<&str>, call: LedgerCall) -> Result<CallOutput> {
    let pair = signing_key(suri)?;
    let payload = serde_json::to_string(&call)?;
    let signed = SignedCall::sign(&pair, payload, chrono::Utc::now().timestamp());

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Submitting {}...", call.name()));
    pb.enable_steady_tick(Duration::from_millis(80));

    let response = LedgerClient::new(url).send_tx(&signed).await;
    pb.finish_and_clear();
    let response = response?;

    if response.ok {
        return Ok(response.result.unwrap_or(CallOutput::Unit));
    }
    match response.error {
        Some(error) => bail!("{} ({}): {}", error.name, error.code, error.message),
        None => bail!("Call rejected"),
    }
}

pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("{:<18}{}", format!("{}:", label), value);
}

pub fn print_submitted(what: &str) {
    print_success(&format!("{} accepted", what));
}

pub fn print_declined() {
    print_warning("Aborted");
}
