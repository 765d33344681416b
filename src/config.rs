//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Database location
//! - Ledger parameters and genesis state
//! - Block clock

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::clock::{BlockClock, ManualClock, WallClock};
use crate::ledger::{LedgerParams, DEFAULT_APPEAL_WINDOW_BLOCKS};
use crate::reputation::DEFAULT_STARTING_SCORE;
use crate::types::{Address, Amount, SeverityPolicy};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Database path that keeps the ledger in memory
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "bounty-ledger.db".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_DATABASE
    }
}

/// Ledger parameters and genesis state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Governing authority address
    pub governor: String,
    /// Forfeited stakes go here (defaults to the governor)
    #[serde(default)]
    pub treasury: Option<String>,
    #[serde(default = "default_stake_pool")]
    pub stake_pool: String,
    #[serde(default)]
    pub initial_fee: Amount,
    #[serde(default = "default_appeal_window")]
    pub appeal_window_blocks: u64,
    #[serde(default = "default_starting_reputation")]
    pub starting_reputation: u64,
    #[serde(default)]
    pub severity_policy: SeverityPolicy,
    /// Initial auditor allowlist
    #[serde(default)]
    pub auditors: Vec<String>,
    #[serde(default)]
    pub genesis_balances: BTreeMap<String, Amount>,
}

fn default_stake_pool() -> String {
    "bounty-ledger/stake-pool".to_string()
}

fn default_appeal_window() -> u64 {
    DEFAULT_APPEAL_WINDOW_BLOCKS
}

fn default_starting_reputation() -> u64 {
    DEFAULT_STARTING_SCORE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    #[default]
    Wall,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default)]
    pub mode: ClockMode,
    pub block_time_secs: u64,
    pub genesis_unix: i64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            mode: ClockMode::Wall,
            block_time_secs: 600,
            genesis_unix: 0,
        }
    }
}

impl ClockConfig {
    pub fn build(&self) -> Arc<dyn BlockClock> {
        match self.mode {
            ClockMode::Wall => Arc::new(WallClock::new(self.genesis_unix, self.block_time_secs)),
            ClockMode::Manual => Arc::new(ManualClock::default()),
        }
    }
}

impl Config {
    /// Load from config.toml or use defaults, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from("config.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            // Use embedded default config
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")
        }
    }

    /// Apply `LEDGER_*` overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("LEDGER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("LEDGER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = get("LEDGER_DATABASE") {
            self.database.path = path;
        }
        if let Some(governor) = get("LEDGER_GOVERNOR") {
            self.ledger.governor = governor;
        }
    }

    pub fn governor(&self) -> Address {
        Address::from(self.ledger.governor.as_str())
    }

    pub fn ledger_params(&self) -> LedgerParams {
        let treasury = self
            .ledger
            .treasury
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.ledger.governor);
        LedgerParams {
            treasury: Address::from(treasury),
            stake_pool: Address::from(self.ledger.stake_pool.as_str()),
            appeal_window_blocks: self.ledger.appeal_window_blocks,
            starting_reputation: self.ledger.starting_reputation,
            severity_policy: self.ledger.severity_policy,
        }
    }

    pub fn genesis_auditors(&self) -> Vec<Address> {
        self.ledger
            .auditors
            .iter()
            .map(|a| Address::from(a.as_str()))
            .collect()
    }

    pub fn genesis_balances(&self) -> Vec<(Address, Amount)> {
        self.ledger
            .genesis_balances
            .iter()
            .map(|(a, b)| (Address::from(a.as_str()), *b))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded default config is validated by tests,
        // the fallback only guards against a broken edit.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig::default(),
            ledger: LedgerConfig {
                governor: String::new(),
                treasury: None,
                stake_pool: default_stake_pool(),
                initial_fee: 0,
                appeal_window_blocks: DEFAULT_APPEAL_WINDOW_BLOCKS,
                starting_reputation: DEFAULT_STARTING_SCORE,
                severity_policy: SeverityPolicy::Lenient,
                auditors: Vec::new(),
                genesis_balances: BTreeMap::new(),
            },
            clock: ClockConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ledger.appeal_window_blocks, 144);
        assert_eq!(config.ledger.severity_policy, SeverityPolicy::Lenient);
        assert_eq!(config.clock.mode, ClockMode::Wall);
        assert_eq!(config.genesis_auditors().len(), 1);
    }

    #[test]
    fn test_treasury_defaults_to_governor() {
        let config = Config::default();
        let params = config.ledger_params();
        assert_eq!(params.treasury, config.governor());
        assert_eq!(params.starting_reputation, DEFAULT_STARTING_SCORE);
    }

    #[test]
    fn test_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [ledger]
            governor = "gov"
            treasury = "vault"
            severity_policy = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, "bounty-ledger.db");
        assert_eq!(config.ledger.initial_fee, 0);
        let params = config.ledger_params();
        assert_eq!(params.treasury, Address::from("vault"));
        assert_eq!(params.severity_policy, SeverityPolicy::Strict);
        assert_eq!(params.appeal_window_blocks, DEFAULT_APPEAL_WINDOW_BLOCKS);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "LEDGER_PORT" => Some("9100".to_string()),
            "LEDGER_DATABASE" => Some(IN_MEMORY_DATABASE.to_string()),
            "LEDGER_HOST" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.server.port, 9100);
        assert!(config.database.is_in_memory());
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ClockConfig {
            mode: ClockMode::Manual,
            ..ClockConfig::default()
        };
        assert_eq!(clock.build().current_height(), 0);
    }
}
