//! SQLite persistence for the ledger
//!
//! The ledger runs in memory; storage mirrors every accepted call so the
//! service can rebuild it on start-up.

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use crate::events::{EventRecord, LedgerEvent};
use crate::ledger::{BountyLedger, LedgerSnapshot};
use crate::types::{Address, Appeal, AppealStatus, GlobalState, Report, ReportId, ReputationRecord};

const MIGRATION_001: &str = include_str!("../migrations/001_ledger.sql");

const STATE_KEY: &str = "state";

pub struct BountyStorage {
    conn: Mutex<Connection>,
}

impl BountyStorage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();

        let has_table: bool = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
            [],
            |row| row.get::<_, i64>(0).map(|c| c > 0),
        )?;
        let applied = if has_table {
            conn.query_row(
                "SELECT COUNT(*) FROM schema_migrations WHERE version = 1",
                [],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )?
        } else {
            false
        };

        if !applied {
            conn.execute_batch(MIGRATION_001)
                .context("Failed to apply migration 001_ledger")?;
            info!("Applied migration 001_ledger");
        }
        Ok(())
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Write the full ledger. Used once, for the genesis state.
    pub fn save_genesis(&self, ledger: &BountyLedger) -> Result<()> {
        let snapshot = ledger.snapshot();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if let Some(state) = &snapshot.state {
            put_state(&tx, state)?;
        }
        for report in &snapshot.reports {
            put_report(&tx, report)?;
        }
        for (address, record) in &snapshot.reputations {
            put_reputation(&tx, address, record)?;
        }
        for appeal in &snapshot.appeals {
            put_appeal(&tx, appeal)?;
        }
        for auditor in &snapshot.auditors {
            tx.execute(
                "INSERT OR IGNORE INTO auditors (address) VALUES (?1)",
                params![auditor.as_str()],
            )?;
        }
        for (address, amount) in &snapshot.balances {
            put_balance(&tx, address, *amount)?;
        }
        for record in &snapshot.events {
            put_event(&tx, record)?;
        }

        tx.commit()?;
        info!(
            "Saved genesis ledger ({} auditors, {} accounts)",
            snapshot.auditors.len(),
            snapshot.balances.len()
        );
        Ok(())
    }

    /// Persist the rows touched by the call that produced `record`, in one
    /// transaction.
    pub fn commit(&self, ledger: &BountyLedger, record: &EventRecord) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        put_state(&tx, ledger.global_state())?;

        match &record.event {
            LedgerEvent::AuditorAdded { auditor } => {
                tx.execute(
                    "INSERT OR IGNORE INTO auditors (address) VALUES (?1)",
                    params![auditor.as_str()],
                )?;
            }
            LedgerEvent::AuditorRemoved { auditor } => {
                tx.execute(
                    "DELETE FROM auditors WHERE address = ?1",
                    params![auditor.as_str()],
                )?;
            }
            _ => {}
        }

        if let Some(report) = record.event.report_id().and_then(|id| ledger.get_report(id)) {
            put_report(&tx, report)?;
            if let Some(stats) = ledger.get_reporter_stats(&report.reporter) {
                put_reputation(&tx, &report.reporter, stats)?;
            }
            if let Some(appeal) = ledger.get_appeal(report.id) {
                put_appeal(&tx, appeal)?;
            }
            let accounts = ledger.params();
            for address in [&report.reporter, &accounts.stake_pool, &accounts.treasury] {
                put_balance(&tx, address, ledger.balance_of(address))?;
            }
        }

        put_event(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Everything needed to rebuild the ledger; `None` on a fresh database.
    pub fn load(&self) -> Result<Option<LedgerSnapshot>> {
        let conn = self.conn.lock();

        let state: Option<String> = conn
            .query_row(
                "SELECT value FROM globals WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        let Some(state) = state else {
            return Ok(None);
        };
        let state: GlobalState =
            serde_json::from_str(&state).context("Corrupt global state row")?;

        let reports = json_rows::<Report>(&conn, "SELECT data FROM reports ORDER BY id")?;
        let appeals = json_rows::<Appeal>(&conn, "SELECT data FROM appeals ORDER BY report_id")?;
        let events = json_rows::<EventRecord>(&conn, "SELECT data FROM events ORDER BY seq")?;

        let mut stmt = conn.prepare("SELECT address, data FROM reputations")?;
        let reputations = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(address, data)| -> Result<(Address, ReputationRecord)> {
                let record: ReputationRecord = serde_json::from_str(&data)
                    .with_context(|| format!("Corrupt reputation row for {}", address))?;
                Ok((Address::from(address), record))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare("SELECT address FROM auditors ORDER BY address")?;
        let auditors = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(Address::from))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT address, amount FROM balances")?;
        let balances = stmt
            .query_map([], |row| {
                Ok((
                    Address::from(row.get::<_, String>(0)?),
                    row.get::<_, i64>(1)? as u64,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(LedgerSnapshot {
            state: Some(state),
            reports,
            reputations,
            appeals,
            auditors,
            balances,
            events,
        }))
    }

    pub fn get_report(&self, report_id: ReportId) -> Result<Option<Report>> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM reports WHERE id = ?1",
                params![report_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| serde_json::from_str(&d).context("Corrupt report row"))
            .transpose()
    }

    pub fn event_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn json_rows<T: serde::de::DeserializeOwned>(conn: &Connection, sql: &str) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.iter()
        .map(|data| serde_json::from_str(data).context("Corrupt row"))
        .collect()
}

fn put_state(conn: &Connection, state: &GlobalState) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO globals (key, value) VALUES (?1, ?2)",
        params![STATE_KEY, serde_json::to_string(state)?],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO globals (key, value) VALUES ('updated_at', ?1)",
        params![Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn put_report(conn: &Connection, report: &Report) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO reports (id, reporter, status, data) VALUES (?1, ?2, ?3, ?4)",
        params![
            report.id as i64,
            report.reporter.as_str(),
            report.status.label(),
            serde_json::to_string(report)?
        ],
    )?;
    Ok(())
}

fn put_reputation(conn: &Connection, address: &Address, record: &ReputationRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO reputations (address, data) VALUES (?1, ?2)",
        params![address.as_str(), serde_json::to_string(record)?],
    )?;
    Ok(())
}

fn put_appeal(conn: &Connection, appeal: &Appeal) -> Result<()> {
    let status = match appeal.status {
        AppealStatus::Open => "open",
        AppealStatus::Resolved => "resolved",
    };
    conn.execute(
        "INSERT OR REPLACE INTO appeals (report_id, status, data) VALUES (?1, ?2, ?3)",
        params![appeal.report_id as i64, status, serde_json::to_string(appeal)?],
    )?;
    Ok(())
}

fn put_balance(conn: &Connection, address: &Address, amount: u64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO balances (address, amount) VALUES (?1, ?2)",
        params![address.as_str(), amount as i64],
    )?;
    Ok(())
}

fn put_event(conn: &Connection, record: &EventRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO events (seq, kind, report_id, height, data) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.seq as i64,
            record.event.kind(),
            record.event.report_id().map(|id| id as i64),
            record.height as i64,
            serde_json::to_string(record)?
        ],
    )?;
    Ok(())
}
