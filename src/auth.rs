//! Authentication
//!
//! - SS58 address validation
//! - Sr25519 signature verification
//! - Signed ledger calls with a replay guard

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sp_core::crypto::Ss58Codec;
use sp_core::sr25519::{self, Public, Signature};
use sp_core::Pair;
use thiserror::Error;
use tracing::debug;

use crate::types::Address;

/// Maximum age of a signed call, in seconds
pub const SIGNATURE_WINDOW_SECS: i64 = 5 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid SS58 address: {0}")]
    InvalidAddress(String),

    #[error("Timestamp outside the signature window")]
    StaleTimestamp,

    #[error("Signature verification failed")]
    BadSignature,

    #[error("Signed call was already submitted")]
    Replay,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Check if a string is a valid SS58-encoded sr25519 public key
pub fn is_valid_ss58_address(address: &str) -> bool {
    if address.len() < 40 || address.len() > 60 {
        return false;
    }
    Public::from_ss58check(address).is_ok()
}

/// Verify an sr25519 signature
pub fn verify_signature(address: &str, message: &str, signature_hex: &str) -> bool {
    let public_key = match Public::from_ss58check(address) {
        Ok(pk) => pk,
        Err(e) => {
            debug!("Failed to parse SS58 address: {}", e);
            return false;
        }
    };

    let sig_hex = signature_hex
        .strip_prefix("0x")
        .unwrap_or(signature_hex)
        .to_lowercase();

    let sig_bytes = match hex::decode(&sig_hex) {
        Ok(b) => b,
        Err(e) => {
            debug!("Failed to decode signature hex: {}", e);
            return false;
        }
    };

    if sig_bytes.len() != 64 {
        debug!(
            "Invalid signature length: {} (expected 64)",
            sig_bytes.len()
        );
        return false;
    }

    let mut sig_array = [0u8; 64];
    sig_array.copy_from_slice(&sig_bytes);
    let signature = Signature::from_raw(sig_array);

    sr25519::Pair::verify(&signature, message.as_bytes(), &public_key)
}

/// Message signed for a ledger call
pub fn create_call_message(caller: &str, timestamp: i64, payload: &str) -> String {
    format!("bounty-ledger:{}:{}:{}", caller, timestamp, payload)
}

/// Only past timestamps within the window are accepted
pub fn is_timestamp_valid(timestamp: i64) -> bool {
    is_timestamp_valid_at(timestamp, chrono::Utc::now().timestamp())
}

fn is_timestamp_valid_at(timestamp: i64, now: i64) -> bool {
    timestamp <= now && (now - timestamp) < SIGNATURE_WINDOW_SECS
}

/// Parse a signing key: 64-char hex seed, SURI (`//Alice`, `mnemonic//hard`)
/// or bare mnemonic
pub fn parse_signing_key(key: &str) -> Result<sr25519::Pair, AuthError> {
    let key = key.trim();
    let hex_key = key.strip_prefix("0x").unwrap_or(key);

    if hex_key.len() == 64 {
        if let Ok(bytes) = hex::decode(hex_key) {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            return Ok(sr25519::Pair::from_seed(&seed));
        }
    }

    if let Ok((pair, _)) = sr25519::Pair::from_string_with_seed(key, None) {
        return Ok(pair);
    }

    if let Ok((pair, _)) = sr25519::Pair::from_phrase(key, None) {
        return Ok(pair);
    }

    Err(AuthError::InvalidKey(
        "expected a 64-char hex seed, a mnemonic or a SURI such as //Alice".to_string(),
    ))
}

pub fn address_of(pair: &sr25519::Pair) -> Address {
    Address::new(pair.public().to_ss58check())
}

// ============================================================================
// SIGNED CALLS
// ============================================================================

/// A ledger call as submitted over HTTP. `payload` is the JSON call body,
/// signed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    pub caller: String,
    pub timestamp: i64,
    pub payload: String,
    pub signature: String,
}

impl SignedCall {
    pub fn sign(pair: &sr25519::Pair, payload: String, timestamp: i64) -> Self {
        let caller = pair.public().to_ss58check();
        let message = create_call_message(&caller, timestamp, &payload);
        let signature = pair.sign(message.as_bytes());
        Self {
            caller,
            timestamp,
            payload,
            signature: hex::encode(signature.0),
        }
    }

    pub fn message(&self) -> String {
        create_call_message(&self.caller, self.timestamp, &self.payload)
    }
}

/// Remembers signatures accepted within the signature window
#[derive(Debug, Default)]
pub struct ReplayGuard {
    seen: Mutex<HashMap<String, i64>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signature`; false if it was already seen inside the window.
    pub fn check_and_record(&self, signature: &str, timestamp: i64, now: i64) -> bool {
        let mut seen = self.seen.lock();
        seen.retain(|_, ts| now - *ts < SIGNATURE_WINDOW_SECS);
        let key = signature.to_lowercase();
        if seen.contains_key(&key) {
            return false;
        }
        seen.insert(key, timestamp);
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

/// Verify a signed call and return the authenticated caller.
pub fn authenticate(call: &SignedCall, guard: &ReplayGuard) -> Result<Address, AuthError> {
    authenticate_at(call, guard, chrono::Utc::now().timestamp())
}

pub fn authenticate_at(
    call: &SignedCall,
    guard: &ReplayGuard,
    now: i64,
) -> Result<Address, AuthError> {
    if !is_valid_ss58_address(&call.caller) {
        return Err(AuthError::InvalidAddress(call.caller.clone()));
    }
    if !is_timestamp_valid_at(call.timestamp, now) {
        debug!(
            "Rejected call from {}: timestamp {} (now {})",
            call.caller, call.timestamp, now
        );
        return Err(AuthError::StaleTimestamp);
    }
    if !verify_signature(&call.caller, &call.message(), &call.signature) {
        return Err(AuthError::BadSignature);
    }
    if !guard.check_and_record(&call.signature, call.timestamp, now) {
        return Err(AuthError::Replay);
    }
    Ok(Address::new(call.caller.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    fn alice() -> sr25519::Pair {
        parse_signing_key("//Alice").unwrap()
    }

    #[test]
    fn test_ss58_validation() {
        assert!(is_valid_ss58_address(ALICE));
        assert!(!is_valid_ss58_address("not_a_valid_address"));
        assert!(!is_valid_ss58_address(""));
    }

    #[test]
    fn test_timestamp_validation() {
        let now = chrono::Utc::now().timestamp();
        assert!(is_timestamp_valid(now));
        assert!(is_timestamp_valid(now - 60));
        assert!(!is_timestamp_valid(now - 600));
        // Future timestamps should be rejected
        assert!(!is_timestamp_valid(now + 60));
        assert!(!is_timestamp_valid(now + 300));
    }

    #[test]
    fn test_dev_key_address() {
        assert_eq!(address_of(&alice()).as_str(), ALICE);
        assert!(parse_signing_key("not a key at all!").is_err());
    }

    #[test]
    fn test_signed_call_roundtrip() {
        let now = 1_700_000_000;
        let call = SignedCall::sign(&alice(), r#"{"action":"set_paused","paused":true}"#.into(), now);
        assert_eq!(call.caller, ALICE);
        assert!(verify_signature(&call.caller, &call.message(), &call.signature));

        let guard = ReplayGuard::new();
        assert_eq!(
            authenticate_at(&call, &guard, now + 10),
            Ok(Address::from(ALICE))
        );
        assert_eq!(authenticate_at(&call, &guard, now + 20), Err(AuthError::Replay));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = 1_700_000_000;
        let mut call = SignedCall::sign(&alice(), r#"{"action":"set_submission_fee","fee":1}"#.into(), now);
        call.payload = r#"{"action":"set_submission_fee","fee":0}"#.into();
        let guard = ReplayGuard::new();
        assert_eq!(authenticate_at(&call, &guard, now), Err(AuthError::BadSignature));
        assert_eq!(guard.len(), 0);
    }

    #[test]
    fn test_stale_call_rejected() {
        let now = 1_700_000_000;
        let call = SignedCall::sign(&alice(), "{}".into(), now - SIGNATURE_WINDOW_SECS);
        assert_eq!(
            authenticate_at(&call, &ReplayGuard::new(), now),
            Err(AuthError::StaleTimestamp)
        );
    }

    #[test]
    fn test_replay_guard_forgets_expired_entries() {
        let guard = ReplayGuard::new();
        assert!(guard.check_and_record("ab", 100, 100));
        assert!(!guard.check_and_record("AB", 100, 101));
        assert!(guard.check_and_record("cd", 500, 500));
        assert_eq!(guard.len(), 1);
    }
}
