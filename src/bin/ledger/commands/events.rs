//! Events command - page through the event log

use anyhow::Result;

use crate::client::LedgerClient;
use crate::style::*;

pub async fn run(url: &str, since: u64, limit: usize) -> Result<()> {
    let page = LedgerClient::new(url).get_events(since, limit).await?;

    print_header("Ledger Events");
    if page.events.is_empty() {
        println!("{}", style_dim("No events"));
        return Ok(());
    }

    for record in &page.events {
        let report = record
            .event
            .report_id()
            .map(|id| format!(" report #{}", id))
            .unwrap_or_default();
        println!(
            "{:>6}  {}  {}{}",
            style_dim(&record.seq.to_string()),
            style_dim(&format!("block {:>8}", record.height)),
            style_cyan(record.event.kind()),
            report
        );
    }
    println!();
    println!(
        "{}",
        style_dim(&format!("Next page: --since {}", page.next_since))
    );
    Ok(())
}
