//! Report command - show a report and its appeal

use anyhow::Result;

use super::print_field;
use crate::client::LedgerClient;
use crate::style::*;

pub async fn run(url: &str, report_id: u64) -> Result<()> {
    let client = LedgerClient::new(url);

    let Some(report) = client.get_report(report_id).await? else {
        print_warning(&format!("Report #{} not found", report_id));
        return Ok(());
    };

    print_header(&format!("Report #{}", report.id));
    print_field("Reporter", truncate_address(report.reporter.as_str()));
    print_field("Target", truncate_address(report.target.as_str()));
    print_field("Description", style_dim(&report.description_hash.to_hex()));
    print_field("Status", style_status(report.status.label()));
    print_field("Severity", report.severity.label());
    print_field("AI score", report.ai_score);
    print_field("Bounty", style_bold(&report.bounty.to_string()));
    print_field("Stake", format!("{} ({:?})", report.staked_amount, report.stake));
    print_field("Submitted at", format!("block {}", report.submitted_at));

    if let Some(appeal) = client.get_appeal(report_id).await? {
        print_header("Appeal");
        print_field("Reason", style_dim(&appeal.reason_hash.to_hex()));
        print_field("Filed at", format!("block {}", appeal.filed_at));
        print_field("Status", format!("{:?}", appeal.status));
        print_field("Decision", format!("{:?}", appeal.decision));
        if let Some(at) = appeal.resolved_at {
            print_field("Resolved at", format!("block {}", at));
        }
    }
    Ok(())
}
