//! Reporter reputation scoring
//!
//! Score moves +5 on a verified report and -2 on a rejected one, never
//! dropping below zero. Counters move exactly once per finalized report.

use crate::types::ReputationRecord;

/// Points awarded for a verified report
pub const VERIFIED_REWARD: u64 = 5;

/// Points deducted for a rejected report
pub const REJECTION_PENALTY: u64 = 2;

/// Default score for a reporter seen for the first time
pub const DEFAULT_STARTING_SCORE: u64 = 100;

/// Apply one assessment outcome to a reporter's record.
pub fn update(record: &ReputationRecord, verified: bool) -> ReputationRecord {
    let mut next = record.clone();
    next.total_reports = next.total_reports.saturating_add(1);
    if verified {
        next.verified_reports = next.verified_reports.saturating_add(1);
        next.reputation_score = next.reputation_score.saturating_add(VERIFIED_REWARD);
    } else {
        next.rejected_reports = next.rejected_reports.saturating_add(1);
        next.reputation_score = next.reputation_score.saturating_sub(REJECTION_PENALTY);
    }
    next
}

/// Share of finalized reports that verified, in percent.
pub fn accuracy_percent(record: &ReputationRecord) -> Option<u64> {
    if record.total_reports == 0 {
        return None;
    }
    Some(record.verified_reports * 100 / record.total_reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verified_update() {
        let record = ReputationRecord::new(DEFAULT_STARTING_SCORE);
        let next = update(&record, true);
        assert_eq!(next.total_reports, 1);
        assert_eq!(next.verified_reports, 1);
        assert_eq!(next.rejected_reports, 0);
        assert_eq!(next.reputation_score, 105);
    }

    #[test]
    fn test_rejected_update() {
        let record = ReputationRecord::new(DEFAULT_STARTING_SCORE);
        let next = update(&record, false);
        assert_eq!(next.total_reports, 1);
        assert_eq!(next.rejected_reports, 1);
        assert_eq!(next.reputation_score, 98);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let mut record = ReputationRecord::new(3);
        for _ in 0..10 {
            record = update(&record, false);
        }
        assert_eq!(record.reputation_score, 0);
        assert_eq!(record.rejected_reports, 10);
        assert_eq!(record.total_reports, 10);
    }

    #[test]
    fn test_accuracy() {
        let record = ReputationRecord::new(0);
        assert_eq!(accuracy_percent(&record), None);

        let record = update(&update(&update(&record, true), true), false);
        assert_eq!(accuracy_percent(&record), Some(66));
    }
}
