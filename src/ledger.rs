//! Report lifecycle state machine
//!
//! `BountyLedger` owns the report, reputation, appeal and auditor stores,
//! the global scalars and the account table. Each entry point validates
//! every precondition before the first effect; the only fallible effect is
//! the value transfer, which runs before any record is written. A rejected
//! call therefore leaves the ledger exactly as it found it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bounty;
use crate::error::LedgerError;
use crate::escrow::{NativeBank, StakeEscrow, ValueTransfer};
use crate::events::{EventLog, EventRecord, LedgerEvent};
use crate::governance::{
    ensure_authorized, ensure_not_paused, AuditorAllowlist, AuthorizationPolicy, GovernanceAction,
};
use crate::reputation::{self, DEFAULT_STARTING_SCORE};
use crate::types::{
    Address, Amount, Appeal, AppealDecision, AppealStatus, BlockHeight, ContentHash, GlobalState,
    Report, ReportId, ReportStatus, ReputationRecord, Severity, SeverityPolicy, StakeDisposition,
    MAX_SCORE,
};

/// Appeal window of the original parameterization (about one day of blocks)
pub const DEFAULT_APPEAL_WINDOW_BLOCKS: u64 = 144;

/// Authenticated caller plus the clock reading for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub height: BlockHeight,
}

impl CallContext {
    pub fn new(caller: impl Into<Address>, height: BlockHeight) -> Self {
        Self {
            caller: caller.into(),
            height,
        }
    }
}

/// Fixed parameters, set once at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Receives forfeited stakes
    pub treasury: Address,
    /// Holds escrowed stakes
    pub stake_pool: Address,
    pub appeal_window_blocks: u64,
    pub starting_reputation: u64,
    pub severity_policy: SeverityPolicy,
}

impl LedgerParams {
    pub fn new(treasury: Address) -> Self {
        Self {
            treasury,
            stake_pool: Address::from("bounty-ledger/stake-pool"),
            appeal_window_blocks: DEFAULT_APPEAL_WINDOW_BLOCKS,
            starting_reputation: DEFAULT_STARTING_SCORE,
            severity_policy: SeverityPolicy::Lenient,
        }
    }
}

/// Everything persisted about a ledger, used to rebuild it on start-up
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub state: Option<GlobalState>,
    pub reports: Vec<Report>,
    pub reputations: Vec<(Address, ReputationRecord)>,
    pub appeals: Vec<Appeal>,
    pub auditors: Vec<Address>,
    pub balances: Vec<(Address, Amount)>,
    pub events: Vec<EventRecord>,
}

pub struct BountyLedger {
    params: LedgerParams,
    policy: Arc<dyn AuthorizationPolicy>,
    state: GlobalState,
    reports: BTreeMap<ReportId, Report>,
    reputations: HashMap<Address, ReputationRecord>,
    appeals: BTreeMap<ReportId, Appeal>,
    auditors: AuditorAllowlist,
    bank: NativeBank,
    events: EventLog,
}

impl BountyLedger {
    pub fn new(
        params: LedgerParams,
        policy: Arc<dyn AuthorizationPolicy>,
        submission_fee: Amount,
    ) -> Self {
        Self {
            params,
            policy,
            state: GlobalState::new(submission_fee),
            reports: BTreeMap::new(),
            reputations: HashMap::new(),
            appeals: BTreeMap::new(),
            auditors: AuditorAllowlist::default(),
            bank: NativeBank::default(),
            events: EventLog::default(),
        }
    }

    /// Genesis auditors; not a ledger call, emits no event
    pub fn with_auditors(mut self, auditors: impl IntoIterator<Item = Address>) -> Self {
        for auditor in auditors {
            self.auditors.insert(auditor);
        }
        self
    }

    /// Genesis balances; not a ledger call, emits no event
    pub fn with_balances(mut self, balances: impl IntoIterator<Item = (Address, Amount)>) -> Self {
        for (address, amount) in balances {
            self.bank.mint(&address, amount);
        }
        self
    }

    /// Rebuild from persisted state. Returns `None` for a snapshot without
    /// global state (nothing was ever committed).
    pub fn restore(
        params: LedgerParams,
        policy: Arc<dyn AuthorizationPolicy>,
        snapshot: LedgerSnapshot,
    ) -> Option<Self> {
        let state = snapshot.state?;
        Some(Self {
            params,
            policy,
            state,
            reports: snapshot.reports.into_iter().map(|r| (r.id, r)).collect(),
            reputations: snapshot.reputations.into_iter().collect(),
            appeals: snapshot
                .appeals
                .into_iter()
                .map(|a| (a.report_id, a))
                .collect(),
            auditors: snapshot.auditors.into_iter().collect(),
            bank: NativeBank::from_balances(snapshot.balances),
            events: EventLog::from_records(snapshot.events),
        })
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            state: Some(self.state.clone()),
            reports: self.reports.values().cloned().collect(),
            reputations: self
                .reputations
                .iter()
                .map(|(a, r)| (a.clone(), r.clone()))
                .collect(),
            appeals: self.appeals.values().cloned().collect(),
            auditors: self.auditors.iter().cloned().collect(),
            balances: self
                .bank
                .balances()
                .map(|(a, b)| (a.clone(), *b))
                .collect(),
            events: self.events.since(0, usize::MAX),
        }
    }

    // ========================================================================
    // GOVERNANCE
    // ========================================================================

    pub fn set_paused(&mut self, ctx: &CallContext, paused: bool) -> Result<(), LedgerError> {
        ensure_authorized(self.policy.as_ref(), &ctx.caller, GovernanceAction::SetPaused)?;
        self.state.paused = paused;
        info!("Ledger {} by {}", if paused { "paused" } else { "unpaused" }, ctx.caller);
        self.emit(ctx, LedgerEvent::PauseChanged { paused });
        Ok(())
    }

    pub fn set_submission_fee(&mut self, ctx: &CallContext, fee: Amount) -> Result<(), LedgerError> {
        ensure_authorized(
            self.policy.as_ref(),
            &ctx.caller,
            GovernanceAction::SetSubmissionFee,
        )?;
        let previous = self.state.submission_fee;
        self.state.submission_fee = fee;
        info!("Submission fee changed {} -> {}", previous, fee);
        self.emit(ctx, LedgerEvent::SubmissionFeeChanged { previous, fee });
        Ok(())
    }

    pub fn add_auditor(&mut self, ctx: &CallContext, auditor: Address) -> Result<(), LedgerError> {
        ensure_authorized(
            self.policy.as_ref(),
            &ctx.caller,
            GovernanceAction::ManageAuditors,
        )?;
        if !self.auditors.insert(auditor.clone()) {
            debug!("Auditor {} was already on the allowlist", auditor);
        }
        info!("Auditor {} added", auditor);
        self.emit(ctx, LedgerEvent::AuditorAdded { auditor });
        Ok(())
    }

    pub fn remove_auditor(&mut self, ctx: &CallContext, auditor: Address) -> Result<(), LedgerError> {
        ensure_authorized(
            self.policy.as_ref(),
            &ctx.caller,
            GovernanceAction::ManageAuditors,
        )?;
        if !self.auditors.remove(&auditor) {
            return Err(LedgerError::NotFound);
        }
        info!("Auditor {} removed", auditor);
        self.emit(ctx, LedgerEvent::AuditorRemoved { auditor });
        Ok(())
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    pub fn submit_vulnerability(
        &mut self,
        ctx: &CallContext,
        target: Address,
        description_hash: ContentHash,
    ) -> Result<ReportId, LedgerError> {
        ensure_not_paused(&self.state)?;
        let report_id = self
            .state
            .report_counter
            .checked_add(1)
            .ok_or(LedgerError::CounterOverflow)?;
        let fee = self.state.submission_fee;

        self.escrow().collect(&ctx.caller, fee)?;

        self.state.report_counter = report_id;
        self.reports.insert(
            report_id,
            Report {
                id: report_id,
                reporter: ctx.caller.clone(),
                target: target.clone(),
                description_hash,
                severity: Severity::Pending,
                status: ReportStatus::Pending,
                ai_score: 0,
                bounty: 0,
                staked_amount: fee,
                submitted_at: ctx.height,
                stake: StakeDisposition::Held,
            },
        );
        let starting = self.params.starting_reputation;
        self.reputations
            .entry(ctx.caller.clone())
            .or_insert_with(|| ReputationRecord::new(starting));

        info!(
            "Report {} submitted by {} against {} (stake {})",
            report_id, ctx.caller, target, fee
        );
        self.emit(
            ctx,
            LedgerEvent::VulnerabilitySubmitted {
                report_id,
                reporter: ctx.caller.clone(),
                target,
                description_hash,
                stake: fee,
            },
        );
        Ok(report_id)
    }

    // ========================================================================
    // FINALIZATION
    // ========================================================================

    pub fn finalize_ai_assessment(
        &mut self,
        ctx: &CallContext,
        report_id: ReportId,
        severity: &str,
        score: u64,
    ) -> Result<ReportStatus, LedgerError> {
        ensure_not_paused(&self.state)?;
        if !self.auditors.contains(&ctx.caller) {
            return Err(LedgerError::UnauthorizedAI);
        }
        let mut report = self
            .reports
            .get(&report_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;
        if report.status != ReportStatus::Pending {
            return Err(LedgerError::AlreadyProcessed);
        }
        if score > MAX_SCORE {
            return Err(LedgerError::InvalidScore);
        }
        let score = score as u8;
        let severity = self.classify(severity)?;

        let computed = bounty::compute_bounty(&severity, score);
        let verified = bounty::is_verified(score);
        let status = if verified {
            ReportStatus::Verified
        } else {
            ReportStatus::Rejected
        };
        transition(&mut report, status)?;

        if verified {
            self.escrow().release(&mut report)?;
        } else {
            self.escrow().forfeit(&mut report)?;
        }

        let payout = if verified { computed } else { 0 };
        report.severity = severity.clone();
        report.ai_score = score;
        report.bounty = payout;

        let starting = self.params.starting_reputation;
        let record = self
            .reputations
            .get(&report.reporter)
            .cloned()
            .unwrap_or_else(|| ReputationRecord::new(starting));
        self.reputations
            .insert(report.reporter.clone(), reputation::update(&record, verified));
        self.state.total_bounties_paid = self.state.total_bounties_paid.saturating_add(payout);

        let reporter = report.reporter.clone();
        self.reports.insert(report_id, report);

        info!(
            "Report {} {} by auditor {} (severity {}, score {}, payout {})",
            report_id, status, ctx.caller, severity, score, payout
        );
        self.emit(
            ctx,
            LedgerEvent::AssessmentFinalized {
                report_id,
                auditor: ctx.caller.clone(),
                reporter,
                severity,
                score,
                status,
                payout,
                stake_returned: verified,
            },
        );
        Ok(status)
    }

    fn classify(&self, severity: &str) -> Result<Severity, LedgerError> {
        match (Severity::parse_tier(severity), self.params.severity_policy) {
            (Some(tier), _) => Ok(tier),
            (None, SeverityPolicy::Lenient) => Ok(Severity::Unclassified(severity.to_string())),
            (None, SeverityPolicy::Strict) => Err(LedgerError::InvalidSeverity(severity.to_string())),
        }
    }

    // ========================================================================
    // APPEALS
    // ========================================================================

    pub fn file_appeal(
        &mut self,
        ctx: &CallContext,
        report_id: ReportId,
        reason_hash: ContentHash,
    ) -> Result<bool, LedgerError> {
        ensure_not_paused(&self.state)?;
        let mut report = self
            .reports
            .get(&report_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;
        let deadline = report
            .submitted_at
            .saturating_add(self.params.appeal_window_blocks);
        if ctx.height >= deadline {
            return Err(LedgerError::AppealWindowClosed);
        }
        if report.reporter != ctx.caller {
            return Err(LedgerError::NotAuthorized);
        }
        if !report.status.is_appealable() {
            return Err(LedgerError::AlreadyProcessed);
        }
        transition(&mut report, ReportStatus::Appealed)?;

        self.appeals.insert(
            report_id,
            Appeal {
                report_id,
                appellant: ctx.caller.clone(),
                reason_hash,
                status: AppealStatus::Open,
                decision: AppealDecision::Pending,
                filed_at: ctx.height,
                resolved_at: None,
            },
        );
        self.reports.insert(report_id, report);

        info!("Appeal filed on report {} by {}", report_id, ctx.caller);
        self.emit(
            ctx,
            LedgerEvent::AppealFiled {
                report_id,
                appellant: ctx.caller.clone(),
                reason_hash,
            },
        );
        Ok(true)
    }

    /// Governance decision on an open appeal. Reputation and the bounty
    /// total keep the values applied at finalization.
    pub fn resolve_appeal(
        &mut self,
        ctx: &CallContext,
        report_id: ReportId,
        decision: &str,
    ) -> Result<ReportStatus, LedgerError> {
        ensure_authorized(
            self.policy.as_ref(),
            &ctx.caller,
            GovernanceAction::ResolveAppeal,
        )?;
        let mut report = self
            .reports
            .get(&report_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;
        let mut appeal = self
            .appeals
            .get(&report_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;
        if appeal.status != AppealStatus::Open || report.status != ReportStatus::Appealed {
            return Err(LedgerError::AlreadyProcessed);
        }

        let decision = AppealDecision::from_resolution(decision);
        let (status, target) = match decision {
            AppealDecision::Overturned => (ReportStatus::VerifiedOnAppeal, StakeDisposition::Returned),
            _ => (ReportStatus::RejectedFinal, StakeDisposition::Forfeited),
        };
        transition(&mut report, status)?;
        let stake_moved = self.escrow().reroute(&mut report, target)?;

        appeal.status = AppealStatus::Resolved;
        appeal.decision = decision;
        appeal.resolved_at = Some(ctx.height);
        self.appeals.insert(report_id, appeal);
        self.reports.insert(report_id, report);

        info!(
            "Appeal on report {} resolved as {:?} -> {} (stake moved {})",
            report_id, decision, status, stake_moved
        );
        self.emit(
            ctx,
            LedgerEvent::AppealResolved {
                report_id,
                decision,
                status,
                stake_moved,
            },
        );
        Ok(status)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_report(&self, report_id: ReportId) -> Option<&Report> {
        self.reports.get(&report_id)
    }

    pub fn get_reporter_stats(&self, address: &Address) -> Option<&ReputationRecord> {
        self.reputations.get(address)
    }

    pub fn get_appeal(&self, report_id: ReportId) -> Option<&Appeal> {
        self.appeals.get(&report_id)
    }

    pub fn is_auditor(&self, address: &Address) -> bool {
        self.auditors.contains(address)
    }

    pub fn global_state(&self) -> &GlobalState {
        &self.state
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn policy(&self) -> &Arc<dyn AuthorizationPolicy> {
        &self.policy
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.bank.balance_of(address)
    }

    pub fn events_since(&self, since: u64, limit: usize) -> Vec<EventRecord> {
        self.events.since(since, limit)
    }

    pub fn latest_event(&self) -> Option<&EventRecord> {
        self.events.latest()
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn escrow(&mut self) -> StakeEscrow<'_, NativeBank> {
        StakeEscrow::new(
            &mut self.bank,
            &self.params.stake_pool,
            &self.params.treasury,
        )
    }

    fn emit(&mut self, ctx: &CallContext, event: LedgerEvent) {
        self.events.append(ctx.height, event);
    }
}

fn transition(report: &mut Report, to: ReportStatus) -> Result<(), LedgerError> {
    if !report.status.can_transition_to(to) {
        return Err(LedgerError::InvalidTransition {
            from: report.status,
            to,
        });
    }
    report.status = to;
    Ok(())
}
