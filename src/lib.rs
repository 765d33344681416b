//! Bounty Ledger - Staked vulnerability reports with AI assessment
//!
//! Reporters stake a submission fee against a target and a hash of their
//! finding. An allow-listed AI auditor finalizes each report with a
//! severity and a confidence score; the ledger computes the bounty,
//! disposes of the stake and updates the reporter's reputation.
//!
//! # How it works
//!
//! 1. A reporter submits a description hash; the current fee is escrowed
//! 2. An auditor finalizes: scores above 70 verify, everything else rejects
//! 3. Verified reports get their stake back and a bounty credited to the
//!    running total; rejected stakes go to the treasury
//! 4. Within the appeal window the reporter may appeal once
//! 5. Governance resolves the appeal, moving the stake if the outcome flips
//!
//! # Invariants
//!
//! - A rejected call changes nothing
//! - Every accepted call appends exactly one event
//! - A stake leaves the pool at most once

pub mod auth;
pub mod bounty;
pub mod clock;
pub mod config;
pub mod error;
pub mod escrow;
pub mod events;
pub mod governance;
pub mod ledger;
pub mod reputation;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;

pub use auth::{is_valid_ss58_address, verify_signature, SignedCall};
pub use clock::{BlockClock, ManualClock, WallClock};
pub use config::Config;
pub use error::{ErrorBody, LedgerError};
pub use events::{EventRecord, LedgerEvent};
pub use governance::{AuthorizationPolicy, GovernanceAction, SingleOwnerPolicy};
pub use ledger::{BountyLedger, CallContext, LedgerParams, LedgerSnapshot};
pub use service::{CallOutput, LedgerCall, LedgerService, ServiceError};
pub use storage::BountyStorage;
pub use types::{
    Address, Amount, Appeal, AppealDecision, AppealStatus, BlockHeight, ContentHash, GlobalState,
    Report, ReportId, ReportStatus, ReputationRecord, Severity, SeverityPolicy, StakeDisposition,
};
