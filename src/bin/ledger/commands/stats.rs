//! Stats command - reporter reputation and balance

use anyhow::{anyhow, Result};
use bounty_ledger::auth::address_of;

use super::{print_field, signing_key};
use crate::client::LedgerClient;
use crate::style::*;

pub async fn run(url: &str, suri: Option<&str>, address: Option<String>) -> Result<()> {
    let address = match address {
        Some(a) => a,
        None => address_of(&signing_key(suri).map_err(|_| {
            anyhow!("Pass an address or a signing key (--suri)")
        })?)
        .to_string(),
    };

    let client = LedgerClient::new(url);
    print_header("Reporter Stats");
    print_field("Address", truncate_address(&address));
    print_field("Balance", style_bold(&client.get_balance(&address).await?.to_string()));

    match client.get_reporter(&address).await? {
        Some(reporter) => {
            print_field("Reputation", style_cyan(&reporter.stats.reputation_score.to_string()));
            print_field("Reports", reporter.stats.total_reports);
            print_field("Verified", style_green(&reporter.stats.verified_reports.to_string()));
            print_field("Rejected", style_red(&reporter.stats.rejected_reports.to_string()));
            if let Some(accuracy) = reporter.accuracy_percent {
                print_field("Accuracy", format!("{}%", accuracy));
            }
        }
        None => print_warning("No reports submitted yet"),
    }
    Ok(())
}
