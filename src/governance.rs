//! Access and governance gate
//!
//! Governance decisions go through `AuthorizationPolicy` so the single-owner
//! check can later be replaced by a multi-signature or council policy
//! without touching the report state machine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{Address, GlobalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceAction {
    SetPaused,
    SetSubmissionFee,
    ManageAuditors,
    ResolveAppeal,
}

pub trait AuthorizationPolicy: Send + Sync {
    fn is_authorized_for(&self, caller: &Address, action: GovernanceAction) -> bool;

    /// Short human-readable description, shown by `/config`
    fn describe(&self) -> String;
}

/// One governing address holds every governance capability.
#[derive(Debug, Clone)]
pub struct SingleOwnerPolicy {
    owner: Address,
}

impl SingleOwnerPolicy {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }
}

impl AuthorizationPolicy for SingleOwnerPolicy {
    fn is_authorized_for(&self, caller: &Address, _action: GovernanceAction) -> bool {
        caller == &self.owner
    }

    fn describe(&self) -> String {
        format!("single-owner:{}", self.owner)
    }
}

pub fn ensure_authorized(
    policy: &dyn AuthorizationPolicy,
    caller: &Address,
    action: GovernanceAction,
) -> Result<(), LedgerError> {
    if policy.is_authorized_for(caller, action) {
        Ok(())
    } else {
        Err(LedgerError::OwnerOnly)
    }
}

/// Checked on every non-governance mutating call
pub fn ensure_not_paused(state: &GlobalState) -> Result<(), LedgerError> {
    if state.paused {
        Err(LedgerError::ContractPaused)
    } else {
        Ok(())
    }
}

/// Addresses allowed to finalize assessments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditorAllowlist {
    auditors: BTreeSet<Address>,
}

impl AuditorAllowlist {
    pub fn contains(&self, address: &Address) -> bool {
        self.auditors.contains(address)
    }

    /// Returns false if the address was already listed
    pub fn insert(&mut self, address: Address) -> bool {
        self.auditors.insert(address)
    }

    pub fn remove(&mut self, address: &Address) -> bool {
        self.auditors.remove(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.auditors.iter()
    }
}

impl FromIterator<Address> for AuditorAllowlist {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            auditors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CouncilPolicy {
        members: Vec<Address>,
    }

    impl AuthorizationPolicy for CouncilPolicy {
        fn is_authorized_for(&self, caller: &Address, action: GovernanceAction) -> bool {
            action != GovernanceAction::SetSubmissionFee && self.members.contains(caller)
        }

        fn describe(&self) -> String {
            "council".to_string()
        }
    }

    #[test]
    fn test_single_owner() {
        let policy = SingleOwnerPolicy::new(Address::from("gov"));
        assert!(ensure_authorized(&policy, &Address::from("gov"), GovernanceAction::SetPaused).is_ok());
        assert_eq!(
            ensure_authorized(&policy, &Address::from("eve"), GovernanceAction::ResolveAppeal),
            Err(LedgerError::OwnerOnly)
        );
    }

    #[test]
    fn test_pluggable_policy() {
        let policy = CouncilPolicy {
            members: vec![Address::from("a"), Address::from("b")],
        };
        assert!(ensure_authorized(&policy, &Address::from("b"), GovernanceAction::ManageAuditors).is_ok());
        assert_eq!(
            ensure_authorized(&policy, &Address::from("a"), GovernanceAction::SetSubmissionFee),
            Err(LedgerError::OwnerOnly)
        );
    }

    #[test]
    fn test_pause_gate() {
        let mut state = GlobalState::new(10);
        assert!(ensure_not_paused(&state).is_ok());
        state.paused = true;
        assert_eq!(ensure_not_paused(&state), Err(LedgerError::ContractPaused));
    }

    #[test]
    fn test_allowlist() {
        let mut list = AuditorAllowlist::default();
        assert!(list.insert(Address::from("ai-1")));
        assert!(!list.insert(Address::from("ai-1")));
        assert!(list.contains(&Address::from("ai-1")));
        assert!(list.remove(&Address::from("ai-1")));
        assert!(!list.contains(&Address::from("ai-1")));
        assert!(!list.remove(&Address::from("ai-1")));
    }
}
