//! Resolve command - governance decision on an appeal

use anyhow::Result;
use bounty_ledger::{AppealDecision, CallOutput, LedgerCall};

use super::{confirm, print_declined, send_call};
use crate::style::*;

pub async fn run(
    url: &str,
    suri: Option<&str>,
    report_id: u64,
    decision: &str,
    yes: bool,
) -> Result<()> {
    let outcome = match AppealDecision::from_resolution(decision) {
        AppealDecision::Overturned => "overturn",
        _ => "uphold",
    };
    if !confirm(
        &format!("{} the assessment of report #{}?", outcome, report_id),
        yes,
    )? {
        print_declined();
        return Ok(());
    }

    let output = send_call(
        url,
        suri,
        LedgerCall::ResolveAppeal {
            report_id,
            decision: decision.to_string(),
        },
    )
    .await?;

    if let CallOutput::Status(status) = output {
        print_success(&format!(
            "Appeal on report #{} resolved: {}",
            report_id,
            style_status(status.label())
        ));
    }
    Ok(())
}
