//! Ledger service
//!
//! Serializes every call through one lock, reads the block clock, applies
//! the call and persists the result. A failed commit reloads the last
//! committed state so memory never runs ahead of storage.

use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::is_valid_ss58_address;
use crate::clock::BlockClock;
use crate::config::Config;
use crate::error::LedgerError;
use crate::governance::SingleOwnerPolicy;
use crate::ledger::{BountyLedger, CallContext};
use crate::storage::BountyStorage;
use crate::types::{Address, Amount, BlockHeight, ContentHash, ReportId, ReportStatus};

/// Mutating entry points, as carried in a signed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LedgerCall {
    SetPaused {
        paused: bool,
    },
    SetSubmissionFee {
        fee: Amount,
    },
    AddAuditor {
        auditor: Address,
    },
    RemoveAuditor {
        auditor: Address,
    },
    SubmitVulnerability {
        target: Address,
        description_hash: ContentHash,
    },
    FinalizeAiAssessment {
        report_id: ReportId,
        severity: String,
        score: u64,
    },
    FileAppeal {
        report_id: ReportId,
        reason_hash: ContentHash,
    },
    ResolveAppeal {
        report_id: ReportId,
        decision: String,
    },
}

impl LedgerCall {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCall::SetPaused { .. } => "set_paused",
            LedgerCall::SetSubmissionFee { .. } => "set_submission_fee",
            LedgerCall::AddAuditor { .. } => "add_auditor",
            LedgerCall::RemoveAuditor { .. } => "remove_auditor",
            LedgerCall::SubmitVulnerability { .. } => "submit_vulnerability",
            LedgerCall::FinalizeAiAssessment { .. } => "finalize_ai_assessment",
            LedgerCall::FileAppeal { .. } => "file_appeal",
            LedgerCall::ResolveAppeal { .. } => "resolve_appeal",
        }
    }
}

/// Return value of an accepted call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallOutput {
    Unit,
    ReportId(ReportId),
    Accepted(bool),
    Status(ReportStatus),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Storage failure: {0:#}")]
    Storage(anyhow::Error),
}

pub struct LedgerService {
    ledger: Mutex<BountyLedger>,
    storage: Option<Arc<BountyStorage>>,
    clock: Arc<dyn BlockClock>,
}

impl LedgerService {
    pub fn new(
        ledger: BountyLedger,
        storage: Option<Arc<BountyStorage>>,
        clock: Arc<dyn BlockClock>,
    ) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            storage,
            clock,
        }
    }

    /// Open storage from `config` and rebuild the ledger, seeding genesis
    /// state on first start.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let storage = if config.database.is_in_memory() {
            BountyStorage::in_memory()?
        } else {
            BountyStorage::new(&config.database.path)?
        };
        Self::bootstrap(config, Arc::new(storage), config.clock.build())
    }

    pub fn bootstrap(
        config: &Config,
        storage: Arc<BountyStorage>,
        clock: Arc<dyn BlockClock>,
    ) -> anyhow::Result<Self> {
        let governor = config.governor();
        if !is_valid_ss58_address(governor.as_str()) {
            warn!(
                "Governor {} is not an SS58 address; governance calls over HTTP will fail",
                governor
            );
        }
        let policy = Arc::new(SingleOwnerPolicy::new(governor));
        let params = config.ledger_params();

        let ledger = match storage.load().context("Failed to load ledger state")? {
            Some(snapshot) => {
                let ledger = BountyLedger::restore(params, policy, snapshot)
                    .context("Stored ledger has no global state")?;
                info!(
                    "Restored ledger: {} reports, fee {}, paused={}",
                    ledger.global_state().report_counter,
                    ledger.global_state().submission_fee,
                    ledger.global_state().paused
                );
                ledger
            }
            None => {
                let ledger = BountyLedger::new(params, policy, config.ledger.initial_fee)
                    .with_auditors(config.genesis_auditors())
                    .with_balances(config.genesis_balances());
                storage
                    .save_genesis(&ledger)
                    .context("Failed to persist genesis state")?;
                info!("Initialized genesis ledger");
                ledger
            }
        };

        Ok(Self::new(ledger, Some(storage), clock))
    }

    pub fn height(&self) -> BlockHeight {
        self.clock.current_height()
    }

    /// Run a read-only query under the ledger lock
    pub fn read<R>(&self, f: impl FnOnce(&BountyLedger) -> R) -> R {
        f(&self.ledger.lock())
    }

    pub fn execute(&self, caller: &Address, call: LedgerCall) -> Result<CallOutput, ServiceError> {
        let mut ledger = self.ledger.lock();
        let ctx = CallContext::new(caller.clone(), self.clock.current_height());
        let name = call.name();

        let output = match apply(&mut ledger, &ctx, call) {
            Ok(output) => output,
            Err(e) => {
                if e.is_invariant_violation() {
                    error!("{} by {} hit an invariant violation: {}", name, caller, e);
                } else {
                    warn!("{} by {} rejected: {}", name, caller, e);
                }
                return Err(e.into());
            }
        };

        if let Some(storage) = &self.storage {
            let committed = match ledger.latest_event() {
                Some(record) => storage.commit(&ledger, record),
                None => Err(anyhow::anyhow!("accepted call produced no event")),
            };
            if let Err(e) = committed {
                error!("Failed to persist {} by {}: {:#}", name, caller, e);
                rollback(&mut ledger, storage);
                return Err(ServiceError::Storage(e));
            }
        }

        Ok(output)
    }
}

fn apply(
    ledger: &mut BountyLedger,
    ctx: &CallContext,
    call: LedgerCall,
) -> Result<CallOutput, LedgerError> {
    match call {
        LedgerCall::SetPaused { paused } => ledger.set_paused(ctx, paused).map(|_| CallOutput::Unit),
        LedgerCall::SetSubmissionFee { fee } => {
            ledger.set_submission_fee(ctx, fee).map(|_| CallOutput::Unit)
        }
        LedgerCall::AddAuditor { auditor } => {
            ledger.add_auditor(ctx, auditor).map(|_| CallOutput::Unit)
        }
        LedgerCall::RemoveAuditor { auditor } => {
            ledger.remove_auditor(ctx, auditor).map(|_| CallOutput::Unit)
        }
        LedgerCall::SubmitVulnerability {
            target,
            description_hash,
        } => ledger
            .submit_vulnerability(ctx, target, description_hash)
            .map(CallOutput::ReportId),
        LedgerCall::FinalizeAiAssessment {
            report_id,
            severity,
            score,
        } => ledger
            .finalize_ai_assessment(ctx, report_id, &severity, score)
            .map(CallOutput::Status),
        LedgerCall::FileAppeal {
            report_id,
            reason_hash,
        } => ledger
            .file_appeal(ctx, report_id, reason_hash)
            .map(CallOutput::Accepted),
        LedgerCall::ResolveAppeal {
            report_id,
            decision,
        } => ledger
            .resolve_appeal(ctx, report_id, &decision)
            .map(CallOutput::Status),
    }
}

fn rollback(ledger: &mut BountyLedger, storage: &BountyStorage) {
    let params = ledger.params().clone();
    let policy = ledger.policy().clone();
    match storage.load() {
        Ok(Some(snapshot)) => match BountyLedger::restore(params, policy, snapshot) {
            Some(restored) => {
                *ledger = restored;
                warn!("Rolled back ledger to last committed state");
            }
            None => error!("Rollback failed: stored ledger has no global state"),
        },
        Ok(None) => error!("Rollback failed: storage is empty"),
        Err(e) => error!("Rollback failed: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::IN_MEMORY_DATABASE;

    fn config() -> Config {
        let mut config = Config::default();
        config.database.path = IN_MEMORY_DATABASE.to_string();
        config.ledger.governor = "gov".to_string();
        config.ledger.treasury = None;
        config.ledger.initial_fee = 10;
        config.ledger.auditors = vec!["auditor".to_string()];
        config.ledger.genesis_balances = [("alice".to_string(), 100)].into_iter().collect();
        config
    }

    fn service(clock: Arc<ManualClock>) -> LedgerService {
        let storage = Arc::new(BountyStorage::in_memory().unwrap());
        LedgerService::bootstrap(&config(), storage, clock).unwrap()
    }

    #[test]
    fn test_call_wire_format() {
        let call: LedgerCall = serde_json::from_str(
            r#"{"action":"finalize_ai_assessment","report_id":3,"severity":"high","score":88}"#,
        )
        .unwrap();
        assert_eq!(
            call,
            LedgerCall::FinalizeAiAssessment {
                report_id: 3,
                severity: "high".to_string(),
                score: 88
            }
        );
        assert_eq!(call.name(), "finalize_ai_assessment");
        assert_eq!(
            serde_json::to_value(CallOutput::Status(ReportStatus::VerifiedOnAppeal)).unwrap(),
            serde_json::json!("verified-on-appeal")
        );
        assert_eq!(serde_json::to_value(CallOutput::Unit).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_execute_uses_clock_height() {
        let clock = Arc::new(ManualClock::new(42));
        let service = service(clock.clone());
        let output = service
            .execute(
                &Address::from("alice"),
                LedgerCall::SubmitVulnerability {
                    target: Address::from("vault"),
                    description_hash: ContentHash::digest(b"bug"),
                },
            )
            .unwrap();
        assert_eq!(output, CallOutput::ReportId(1));
        let submitted_at = service.read(|l| l.get_report(1).map(|r| r.submitted_at));
        assert_eq!(submitted_at, Some(42));
    }

    #[test]
    fn test_rejected_call_is_not_persisted() {
        let storage = Arc::new(BountyStorage::in_memory().unwrap());
        let service =
            LedgerService::bootstrap(&config(), storage.clone(), Arc::new(ManualClock::new(1)))
                .unwrap();
        let err = service
            .execute(&Address::from("alice"), LedgerCall::SetPaused { paused: true })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(LedgerError::OwnerOnly)));
        assert_eq!(storage.event_count().unwrap(), 0);

        service
            .execute(&Address::from("gov"), LedgerCall::SetPaused { paused: true })
            .unwrap();
        assert_eq!(storage.event_count().unwrap(), 1);
    }

    #[test]
    fn test_bootstrap_restores_existing_state() {
        let storage = Arc::new(BountyStorage::in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(1));
        let first = LedgerService::bootstrap(&config(), storage.clone(), clock.clone()).unwrap();
        first
            .execute(&Address::from("gov"), LedgerCall::SetSubmissionFee { fee: 77 })
            .unwrap();
        drop(first);

        let mut changed = config();
        changed.ledger.initial_fee = 5;
        let second = LedgerService::bootstrap(&changed, storage, clock).unwrap();
        assert_eq!(second.read(|l| l.global_state().submission_fee), 77);
        assert_eq!(second.read(|l| l.balance_of(&Address::from("alice"))), 100);
    }
}
