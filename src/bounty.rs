//! Bounty computation
//!
//! Base reward by severity tier plus a confidence bonus of
//! `floor(base * score / 100)`.

use crate::types::{Amount, Severity, VERIFICATION_THRESHOLD};

pub const CRITICAL_BASE: Amount = 1000;
pub const HIGH_BASE: Amount = 500;
pub const MEDIUM_BASE: Amount = 200;
pub const LOW_BASE: Amount = 50;

/// Base reward for a severity tier. Anything that is not a known tier pays
/// the low tier.
pub fn base_reward(severity: &Severity) -> Amount {
    match severity {
        Severity::Critical => CRITICAL_BASE,
        Severity::High => HIGH_BASE,
        Severity::Medium => MEDIUM_BASE,
        _ => LOW_BASE,
    }
}

/// Bounty for an assessment. `score` must already be validated (<= 100).
pub fn compute_bounty(severity: &Severity, score: u8) -> Amount {
    let base = base_reward(severity);
    let bonus = base * Amount::from(score) / 100;
    base + bonus
}

pub fn is_verified(score: u8) -> bool {
    score > VERIFICATION_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_full_confidence() {
        assert_eq!(compute_bounty(&Severity::Critical, 100), 2000);
    }

    #[test]
    fn test_low_half_confidence() {
        assert_eq!(compute_bounty(&Severity::Low, 50), 75);
    }

    #[test]
    fn test_bonus_floors() {
        // 200 * 33 / 100 = 66.0
        assert_eq!(compute_bounty(&Severity::Medium, 33), 266);
        // 50 * 71 / 100 = 35.5
        assert_eq!(compute_bounty(&Severity::Low, 71), 85);
        assert_eq!(compute_bounty(&Severity::High, 0), 500);
    }

    #[test]
    fn test_unknown_severity_pays_low_tier() {
        let unknown = Severity::Unclassified("catastrophic".to_string());
        assert_eq!(base_reward(&unknown), LOW_BASE);
        assert_eq!(base_reward(&Severity::Pending), LOW_BASE);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!is_verified(70));
        assert!(is_verified(71));
        assert!(!is_verified(0));
        assert!(is_verified(100));
    }
}
