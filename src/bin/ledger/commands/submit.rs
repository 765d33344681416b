//! Submit command - stake the fee and file a report

use std::path::Path;

use anyhow::Result;
use bounty_ledger::{Address, CallOutput, LedgerCall};

use super::{content_hash, print_field, send_call};
use crate::client::LedgerClient;
use crate::style::*;

pub async fn run(
    url: &str,
    suri: Option<&str>,
    target: &str,
    file: Option<&Path>,
    hash: Option<&str>,
) -> Result<()> {
    print_header("Submit Vulnerability");

    let description_hash = content_hash(file, hash)?;
    let fee = LedgerClient::new(url).get_state().await?.state.submission_fee;

    print_field("Target", truncate_address(target));
    print_field("Description", style_dim(&description_hash.to_hex()));
    print_field("Stake", style_bold(&fee.to_string()));
    println!();

    let output = send_call(
        url,
        suri,
        LedgerCall::SubmitVulnerability {
            target: Address::from(target),
            description_hash,
        },
    )
    .await?;

    match output {
        CallOutput::ReportId(id) => print_success(&format!("Report #{} submitted", id)),
        other => print_success(&format!("Submitted: {:?}", other)),
    }
    Ok(())
}
