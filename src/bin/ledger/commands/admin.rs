//! Admin commands - pause, fee and auditor management

use anyhow::Result;
use bounty_ledger::{Address, LedgerCall};
use clap::Subcommand;

use super::{confirm, print_declined, print_submitted, send_call};

#[derive(Subcommand, Debug, Clone)]
pub enum AdminAction {
    /// Halt submissions, finalizations and appeals
    Pause,
    /// Resume normal operation
    Unpause,
    /// Set the stake required for future submissions
    Fee { amount: u64 },
    /// Allow an address to finalize assessments
    AddAuditor { address: String },
    /// Revoke an auditor
    RemoveAuditor { address: String },
}

impl AdminAction {
    fn into_call(self) -> LedgerCall {
        match self {
            AdminAction::Pause => LedgerCall::SetPaused { paused: true },
            AdminAction::Unpause => LedgerCall::SetPaused { paused: false },
            AdminAction::Fee { amount } => LedgerCall::SetSubmissionFee { fee: amount },
            AdminAction::AddAuditor { address } => LedgerCall::AddAuditor {
                auditor: Address::new(address),
            },
            AdminAction::RemoveAuditor { address } => LedgerCall::RemoveAuditor {
                auditor: Address::new(address),
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            AdminAction::Pause => "Pause the ledger".to_string(),
            AdminAction::Unpause => "Unpause the ledger".to_string(),
            AdminAction::Fee { amount } => format!("Set the submission fee to {}", amount),
            AdminAction::AddAuditor { address } => format!("Add auditor {}", address),
            AdminAction::RemoveAuditor { address } => format!("Remove auditor {}", address),
        }
    }
}

pub async fn run(url: &str, suri: Option<&str>, action: AdminAction, yes: bool) -> Result<()> {
    let description = action.describe();
    if !confirm(&format!("{}?", description), yes)? {
        print_declined();
        return Ok(());
    }
    send_call(url, suri, action.into_call()).await?;
    print_submitted(&description);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_map_to_calls() {
        assert_eq!(
            AdminAction::Unpause.into_call(),
            LedgerCall::SetPaused { paused: false }
        );
        assert_eq!(
            AdminAction::Fee { amount: 7 }.into_call(),
            LedgerCall::SetSubmissionFee { fee: 7 }
        );
        assert_eq!(
            AdminAction::RemoveAuditor {
                address: "bob".to_string()
            }
            .into_call()
            .name(),
            "remove_auditor"
        );
    }
}
