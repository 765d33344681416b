//! Appeal command - contest a finalized report

use std::path::Path;

use anyhow::Result;
use bounty_ledger::LedgerCall;

use super::{content_hash, print_submitted, send_call};

pub async fn run(
    url: &str,
    suri: Option<&str>,
    report_id: u64,
    reason: Option<&Path>,
    reason_hash: Option<&str>,
) -> Result<()> {
    let reason_hash = content_hash(reason, reason_hash)?;
    send_call(
        url,
        suri,
        LedgerCall::FileAppeal {
            report_id,
            reason_hash,
        },
    )
    .await?;
    print_submitted(&format!("Appeal on report #{}", report_id));
    Ok(())
}
