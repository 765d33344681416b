//! Finalize command - record the AI assessment of a report

use anyhow::Result;
use bounty_ledger::{CallOutput, LedgerCall};

use super::send_call;
use crate::style::*;

pub async fn run(
    url: &str,
    suri: Option<&str>,
    report_id: u64,
    severity: &str,
    score: u64,
) -> Result<()> {
    let output = send_call(
        url,
        suri,
        LedgerCall::FinalizeAiAssessment {
            report_id,
            severity: severity.to_string(),
            score,
        },
    )
    .await?;

    if let CallOutput::Status(status) = output {
        print_success(&format!(
            "Report #{} finalized: {}",
            report_id,
            style_status(status.label())
        ));
    }
    Ok(())
}
