//! Ledger domain types
//!
//! Reports, reputations, appeals and the process-wide ledger state.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub type ReportId = u64;
pub type BlockHeight = u64;
pub type Amount = u64;

/// Scores strictly above this value verify a report.
pub const VERIFICATION_THRESHOLD: u8 = 70;

/// Highest confidence score an auditor may submit.
pub const MAX_SCORE: u64 = 100;

// ============================================================================
// ADDRESSES AND HASHES
// ============================================================================

/// Account address. The ledger treats it as an opaque identifier; the HTTP
/// boundary requires SS58 encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// SHA-256 digest of off-ledger content (descriptions, appeal rationales).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn digest(content: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(content.as_ref()).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

impl FromStr for ContentHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HashParseError::Hex(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashParseError::Length(len))?;
        Ok(Self(array))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

/// Severity tag attached by the auditor.
///
/// Tags outside the four known tiers are kept verbatim as `Unclassified`
/// and pay the lowest tier when the ledger runs with the lenient policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Pending,
    Low,
    Medium,
    High,
    Critical,
    Unclassified(String),
}

impl Severity {
    /// Parse one of the assessable tiers by exact tag; `None` for anything else.
    pub fn parse_tier(value: &str) -> Option<Severity> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Severity::Pending => "pending",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unclassified(raw) => raw,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        if value == "pending" {
            return Severity::Pending;
        }
        Severity::parse_tier(&value).unwrap_or(Severity::Unclassified(value))
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How finalization treats severity tags outside the known tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityPolicy {
    /// Unknown tags fall through to the lowest tier.
    #[default]
    Lenient,
    /// Unknown tags fail with `InvalidSeverity`.
    Strict,
}

// ============================================================================
// REPORT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Pending,
    Verified,
    Rejected,
    Appealed,
    VerifiedOnAppeal,
    RejectedFinal,
}

impl ReportStatus {
    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Appealed => "appealed",
            ReportStatus::VerifiedOnAppeal => "verified-on-appeal",
            ReportStatus::RejectedFinal => "rejected-final",
        }
    }

    pub fn valid_transitions(self) -> &'static [ReportStatus] {
        match self {
            ReportStatus::Pending => &[ReportStatus::Verified, ReportStatus::Rejected],
            ReportStatus::Verified | ReportStatus::Rejected => &[ReportStatus::Appealed],
            ReportStatus::Appealed => &[ReportStatus::VerifiedOnAppeal, ReportStatus::RejectedFinal],
            ReportStatus::VerifiedOnAppeal | ReportStatus::RejectedFinal => &[],
        }
    }

    pub fn can_transition_to(self, target: ReportStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_appealable(self) -> bool {
        self.can_transition_to(ReportStatus::Appealed)
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "rejected" => Ok(ReportStatus::Rejected),
            "appealed" => Ok(ReportStatus::Appealed),
            "verified-on-appeal" => Ok(ReportStatus::VerifiedOnAppeal),
            "rejected-final" => Ok(ReportStatus::RejectedFinal),
            other => Err(format!("unknown report status: {}", other)),
        }
    }
}

/// Where a report's stake currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeDisposition {
    /// Escrowed in the stake pool
    Held,
    /// Paid back to the reporter
    Returned,
    /// Sent to the treasury
    Forfeited,
}

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter: Address,
    pub target: Address,
    pub description_hash: ContentHash,
    pub severity: Severity,
    pub status: ReportStatus,
    pub ai_score: u8,
    pub bounty: Amount,
    /// Fee in effect at submission; never changes afterwards
    pub staked_amount: Amount,
    pub submitted_at: BlockHeight,
    pub stake: StakeDisposition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub total_reports: u64,
    pub verified_reports: u64,
    pub rejected_reports: u64,
    pub reputation_score: u64,
}

impl ReputationRecord {
    pub fn new(starting_score: u64) -> Self {
        Self {
            total_reports: 0,
            verified_reports: 0,
            rejected_reports: 0,
            reputation_score: starting_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealDecision {
    Pending,
    Upheld,
    Overturned,
}

impl AppealDecision {
    /// Governance decisions arrive as free text. Only the exact tag
    /// `"overturned"` overturns; everything else upholds.
    pub fn from_resolution(value: &str) -> AppealDecision {
        if value == "overturned" {
            AppealDecision::Overturned
        } else {
            AppealDecision::Upheld
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    pub report_id: ReportId,
    pub appellant: Address,
    pub reason_hash: ContentHash,
    pub status: AppealStatus,
    pub decision: AppealDecision,
    pub filed_at: BlockHeight,
    pub resolved_at: Option<BlockHeight>,
}

/// Process-wide scalars. Constructed once, then changed only through
/// governance calls and the accepted transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub paused: bool,
    pub submission_fee: Amount,
    pub report_counter: ReportId,
    pub total_bounties_paid: Amount,
}

impl GlobalState {
    pub fn new(submission_fee: Amount) -> Self {
        Self {
            paused: false,
            submission_fee,
            report_counter: 0,
            total_bounties_paid: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use ReportStatus::*;
        let allowed = [
            (Pending, Verified),
            (Pending, Rejected),
            (Verified, Appealed),
            (Rejected, Appealed),
            (Appealed, VerifiedOnAppeal),
            (Appealed, RejectedFinal),
        ];
        let all = [Pending, Verified, Rejected, Appealed, VerifiedOnAppeal, RejectedFinal];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
        assert!(VerifiedOnAppeal.is_terminal());
        assert!(!Appealed.is_appealable());
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!(Severity::parse_tier("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse_tier("Critical"), None);
        assert_eq!(Severity::parse_tier(" high "), None);
        assert_eq!(Severity::parse_tier("catastrophic"), None);
        assert_eq!(
            Severity::from("catastrophic".to_string()),
            Severity::Unclassified("catastrophic".to_string())
        );

        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::digest(b"reentrancy in withdraw()");
        let parsed: ContentHash = format!("0x{}", hash.to_hex()).parse().unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(
            "abcd".parse::<ContentHash>(),
            Err(HashParseError::Length(2))
        );
    }

    #[test]
    fn test_appeal_decision_parsing() {
        assert_eq!(AppealDecision::from_resolution("overturned"), AppealDecision::Overturned);
        assert_eq!(AppealDecision::from_resolution("upheld"), AppealDecision::Upheld);
        assert_eq!(AppealDecision::from_resolution("Overturned!"), AppealDecision::Upheld);
        assert_eq!(AppealDecision::from_resolution(""), AppealDecision::Upheld);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ReportStatus::VerifiedOnAppeal.label(), "verified-on-appeal");
        assert_eq!(
            serde_json::to_string(&ReportStatus::RejectedFinal).unwrap(),
            "\"rejected-final\""
        );
        assert_eq!("appealed".parse::<ReportStatus>(), Ok(ReportStatus::Appealed));
    }
}
