//! Ledger event log
//!
//! Every accepted mutating call appends exactly one record. The log is the
//! only notification channel for off-ledger observers, so the serialized
//! shape of `LedgerEvent` must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Address, Amount, AppealDecision, BlockHeight, ContentHash, ReportId, ReportStatus, Severity,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PauseChanged {
        paused: bool,
    },
    SubmissionFeeChanged {
        previous: Amount,
        fee: Amount,
    },
    AuditorAdded {
        auditor: Address,
    },
    AuditorRemoved {
        auditor: Address,
    },
    VulnerabilitySubmitted {
        report_id: ReportId,
        reporter: Address,
        target: Address,
        description_hash: ContentHash,
        stake: Amount,
    },
    AssessmentFinalized {
        report_id: ReportId,
        auditor: Address,
        reporter: Address,
        severity: Severity,
        score: u8,
        status: ReportStatus,
        payout: Amount,
        stake_returned: bool,
    },
    AppealFiled {
        report_id: ReportId,
        appellant: Address,
        reason_hash: ContentHash,
    },
    AppealResolved {
        report_id: ReportId,
        decision: AppealDecision,
        status: ReportStatus,
        stake_moved: Amount,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::PauseChanged { .. } => "pause_changed",
            LedgerEvent::SubmissionFeeChanged { .. } => "submission_fee_changed",
            LedgerEvent::AuditorAdded { .. } => "auditor_added",
            LedgerEvent::AuditorRemoved { .. } => "auditor_removed",
            LedgerEvent::VulnerabilitySubmitted { .. } => "vulnerability_submitted",
            LedgerEvent::AssessmentFinalized { .. } => "assessment_finalized",
            LedgerEvent::AppealFiled { .. } => "appeal_filed",
            LedgerEvent::AppealResolved { .. } => "appeal_resolved",
        }
    }

    /// Report touched by this event, if any
    pub fn report_id(&self) -> Option<ReportId> {
        match self {
            LedgerEvent::VulnerabilitySubmitted { report_id, .. }
            | LedgerEvent::AssessmentFinalized { report_id, .. }
            | LedgerEvent::AppealFiled { report_id, .. }
            | LedgerEvent::AppealResolved { report_id, .. } => Some(*report_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub height: BlockHeight,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Append-only, sequence-numbered event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn from_records(mut records: Vec<EventRecord>) -> Self {
        records.sort_by_key(|r| r.seq);
        Self { records }
    }

    pub fn append(&mut self, height: BlockHeight, event: LedgerEvent) -> &EventRecord {
        let seq = self.records.last().map(|r| r.seq + 1).unwrap_or(1);
        self.records.push(EventRecord {
            seq,
            height,
            recorded_at: Utc::now(),
            event,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn latest(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Records with `seq > since`, oldest first, at most `limit`.
    pub fn since(&self, since: u64, limit: usize) -> Vec<EventRecord> {
        let start = self.records.partition_point(|r| r.seq <= since);
        self.records[start..].iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers() {
        let mut log = EventLog::default();
        assert_eq!(log.append(1, LedgerEvent::PauseChanged { paused: true }).seq, 1);
        assert_eq!(log.append(2, LedgerEvent::PauseChanged { paused: false }).seq, 2);
        assert_eq!(log.since(0, 10).len(), 2);
        assert_eq!(log.latest().map(|r| r.height), Some(2));
    }

    #[test]
    fn test_since_pages() {
        let mut log = EventLog::default();
        for fee in 0..5 {
            log.append(
                fee,
                LedgerEvent::SubmissionFeeChanged {
                    previous: fee,
                    fee: fee + 1,
                },
            );
        }
        let page = log.since(2, 2);
        assert_eq!(page.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![3, 4]);
        assert!(log.since(5, 10).is_empty());
        assert_eq!(log.since(0, 100).len(), 5);
    }

    #[test]
    fn test_wire_shape() {
        let mut log = EventLog::default();
        let record = log
            .append(
                7,
                LedgerEvent::AuditorAdded {
                    auditor: Address::from("auditor-1"),
                },
            )
            .clone();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "auditor_added");
        assert_eq!(json["auditor"], "auditor-1");
        assert_eq!(json["seq"], 1);
        assert_eq!(json["height"], 7);

        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
