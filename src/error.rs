//! Ledger error codes
//!
//! Every rejected call maps to one stable code. A rejected call leaves the
//! ledger untouched.

use serde::Serialize;
use thiserror::Error;

use crate::types::{ReportId, ReportStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Caller is not the governing authority")]
    OwnerOnly,

    #[error("Record not found")]
    NotFound,

    #[error("Report already processed")]
    AlreadyProcessed,

    #[error("Caller is not an authorized auditor")]
    UnauthorizedAI,

    #[error("Score must be between 0 and 100")]
    InvalidScore,

    #[error("Insufficient balance to cover stake: need {required}, have {available}")]
    InsufficientStake { required: u64, available: u64 },

    #[error("Ledger is paused")]
    ContractPaused,

    #[error("Appeal window closed")]
    AppealWindowClosed,

    #[error("Caller is not authorized for this report")]
    NotAuthorized,

    #[error("Unrecognized severity: {0}")]
    InvalidSeverity(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    #[error("Stake for report {0} was already disposed")]
    StakeAlreadyDisposed(ReportId),

    #[error("Report counter exhausted")]
    CounterOverflow,

    #[error("Account balance overflow")]
    BalanceOverflow,
}

impl LedgerError {
    pub fn code(&self) -> u32 {
        match self {
            LedgerError::OwnerOnly => 100,
            LedgerError::NotFound => 101,
            LedgerError::AlreadyProcessed => 102,
            LedgerError::UnauthorizedAI => 103,
            LedgerError::InvalidScore => 104,
            LedgerError::InsufficientStake { .. } => 105,
            LedgerError::ContractPaused => 106,
            LedgerError::AppealWindowClosed => 107,
            LedgerError::NotAuthorized => 108,
            LedgerError::InvalidSeverity(_) => 109,
            LedgerError::InvalidTransition { .. } => 110,
            LedgerError::StakeAlreadyDisposed(_) => 111,
            LedgerError::CounterOverflow => 112,
            LedgerError::BalanceOverflow => 113,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerError::OwnerOnly => "OwnerOnly",
            LedgerError::NotFound => "NotFound",
            LedgerError::AlreadyProcessed => "AlreadyProcessed",
            LedgerError::UnauthorizedAI => "UnauthorizedAI",
            LedgerError::InvalidScore => "InvalidScore",
            LedgerError::InsufficientStake { .. } => "InsufficientStake",
            LedgerError::ContractPaused => "ContractPaused",
            LedgerError::AppealWindowClosed => "AppealWindowClosed",
            LedgerError::NotAuthorized => "NotAuthorized",
            LedgerError::InvalidSeverity(_) => "InvalidSeverity",
            LedgerError::InvalidTransition { .. } => "InvalidTransition",
            LedgerError::StakeAlreadyDisposed(_) => "StakeAlreadyDisposed",
            LedgerError::CounterOverflow => "CounterOverflow",
            LedgerError::BalanceOverflow => "BalanceOverflow",
        }
    }

    /// Errors that mean an internal invariant broke rather than a bad call.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::StakeAlreadyDisposed(_)
                | LedgerError::CounterOverflow
                | LedgerError::BalanceOverflow
        )
    }
}

/// Wire form of a ledger error
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u32,
    pub name: String,
    pub message: String,
}

impl From<&LedgerError> for ErrorBody {
    fn from(e: &LedgerError) -> Self {
        Self {
            code: e.code(),
            name: e.name().to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(LedgerError::OwnerOnly.code(), 100);
        assert_eq!(LedgerError::ContractPaused.code(), 106);
        assert_eq!(LedgerError::NotAuthorized.code(), 108);
        assert_eq!(LedgerError::StakeAlreadyDisposed(3).code(), 111);
    }

    #[test]
    fn test_error_body() {
        let err = LedgerError::InsufficientStake {
            required: 10,
            available: 4,
        };
        let body = ErrorBody::from(&err);
        assert_eq!(body.name, "InsufficientStake");
        assert_eq!(body.code, 105);
        assert!(body.message.contains("need 10"));
        assert!(!err.is_invariant_violation());
        assert!(LedgerError::CounterOverflow.is_invariant_violation());
    }
}
