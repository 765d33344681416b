//! Stake escrow
//!
//! Stakes move between reporters, the stake pool and the treasury through
//! the `ValueTransfer` primitive. Each primitive either completes fully or
//! leaves balances untouched.
//!
//! A report's stake leaves the pool at most once. `release` and `forfeit`
//! refuse to run on a stake that is no longer held; appeal resolution uses
//! `reroute`, which can send a forfeited stake back to the reporter and
//! never draws on the pool again.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{error, warn};

use crate::error::LedgerError;
use crate::types::{Address, Amount, Report, StakeDisposition};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("balance overflow")]
    Overflow,
}

impl From<TransferError> for LedgerError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InsufficientFunds {
                required,
                available,
            } => LedgerError::InsufficientStake {
                required,
                available,
            },
            TransferError::Overflow => LedgerError::BalanceOverflow,
        }
    }
}

/// Native-asset debit/credit between two addresses
pub trait ValueTransfer {
    fn balance_of(&self, address: &Address) -> Amount;

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount)
        -> Result<(), TransferError>;
}

/// In-process account table backing the standalone deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeBank {
    balances: BTreeMap<Address, Amount>,
}

impl NativeBank {
    pub fn from_balances(balances: impl IntoIterator<Item = (Address, Amount)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }

    /// Genesis mint. Not reachable from any ledger call.
    pub fn mint(&mut self, to: &Address, amount: Amount) {
        let entry = self.balances.entry(to.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn balances(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|v| u128::from(*v)).sum()
    }
}

impl ValueTransfer for NativeBank {
    fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// Escrow operations over a transfer primitive.
pub struct StakeEscrow<'a, T: ValueTransfer> {
    bank: &'a mut T,
    pool: &'a Address,
    treasury: &'a Address,
}

impl<'a, T: ValueTransfer> StakeEscrow<'a, T> {
    pub fn new(bank: &'a mut T, pool: &'a Address, treasury: &'a Address) -> Self {
        Self {
            bank,
            pool,
            treasury,
        }
    }

    /// Move a stake from `from` into the pool.
    pub fn collect(&mut self, from: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.bank.transfer(from, self.pool, amount)?;
        Ok(())
    }

    /// Pay a held stake back to the reporter.
    pub fn release(&mut self, report: &mut Report) -> Result<(), LedgerError> {
        ensure_held(report)?;
        self.bank
            .transfer(self.pool, &report.reporter, report.staked_amount)?;
        report.stake = StakeDisposition::Returned;
        Ok(())
    }

    /// Send a held stake to the treasury.
    pub fn forfeit(&mut self, report: &mut Report) -> Result<(), LedgerError> {
        ensure_held(report)?;
        self.bank
            .transfer(self.pool, self.treasury, report.staked_amount)?;
        report.stake = StakeDisposition::Forfeited;
        Ok(())
    }

    /// Bring a stake to `target`, returning the amount moved.
    ///
    /// A stake already paid back to the reporter stays there: it is never
    /// drawn from the reporter's balance again.
    pub fn reroute(
        &mut self,
        report: &mut Report,
        target: StakeDisposition,
    ) -> Result<Amount, LedgerError> {
        match (report.stake, target) {
            (StakeDisposition::Returned, StakeDisposition::Returned)
            | (StakeDisposition::Forfeited, StakeDisposition::Forfeited) => return Ok(0),
            (StakeDisposition::Held, StakeDisposition::Returned) => self.release(report)?,
            (StakeDisposition::Held, StakeDisposition::Forfeited) => self.forfeit(report)?,
            (StakeDisposition::Forfeited, StakeDisposition::Returned) => {
                self.bank
                    .transfer(self.treasury, &report.reporter, report.staked_amount)?;
                report.stake = StakeDisposition::Returned;
            }
            (StakeDisposition::Returned, StakeDisposition::Forfeited) => {
                warn!(
                    report_id = report.id,
                    amount = report.staked_amount,
                    "stake already returned to reporter; not clawed back"
                );
                return Ok(0);
            }
            // Nothing ever goes back into the pool
            (_, StakeDisposition::Held) => {
                error!(report_id = report.id, "refusing to re-escrow a disposed stake");
                return Err(LedgerError::StakeAlreadyDisposed(report.id));
            }
        }
        Ok(report.staked_amount)
    }
}

fn ensure_held(report: &Report) -> Result<(), LedgerError> {
    if report.stake != StakeDisposition::Held {
        error!(
            report_id = report.id,
            disposition = ?report.stake,
            "stake disbursement re-entered"
        );
        return Err(LedgerError::StakeAlreadyDisposed(report.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentHash, ReportStatus, Severity};

    fn pool() -> Address {
        Address::from("pool")
    }

    fn treasury() -> Address {
        Address::from("treasury")
    }

    fn held_report(stake: Amount) -> Report {
        Report {
            id: 1,
            reporter: Address::from("alice"),
            target: Address::from("contract"),
            description_hash: ContentHash::digest(b"bug"),
            severity: Severity::Pending,
            status: ReportStatus::Pending,
            ai_score: 0,
            bounty: 0,
            staked_amount: stake,
            submitted_at: 0,
            stake: StakeDisposition::Held,
        }
    }

    fn funded_bank() -> NativeBank {
        NativeBank::from_balances([(Address::from("alice"), 100), (pool(), 40)])
    }

    #[test]
    fn test_collect_insufficient() {
        let mut bank = NativeBank::from_balances([(Address::from("alice"), 5)]);
        let (pool, treasury) = (pool(), treasury());
        let mut escrow = StakeEscrow::new(&mut bank, &pool, &treasury);
        assert_eq!(
            escrow.collect(&Address::from("alice"), 10),
            Err(LedgerError::InsufficientStake {
                required: 10,
                available: 5
            })
        );
        assert_eq!(bank.balance_of(&Address::from("alice")), 5);
        assert_eq!(bank.balance_of(&pool), 0);
    }

    #[test]
    fn test_release_then_forfeit_refused() {
        let mut bank = funded_bank();
        let (pool, treasury) = (pool(), treasury());
        let mut report = held_report(40);
        let mut escrow = StakeEscrow::new(&mut bank, &pool, &treasury);

        escrow.release(&mut report).unwrap();
        assert_eq!(report.stake, StakeDisposition::Returned);
        assert_eq!(
            escrow.forfeit(&mut report),
            Err(LedgerError::StakeAlreadyDisposed(1))
        );
        assert_eq!(
            escrow.release(&mut report),
            Err(LedgerError::StakeAlreadyDisposed(1))
        );
        assert_eq!(bank.balance_of(&Address::from("alice")), 140);
        assert_eq!(bank.balance_of(&pool), 0);
    }

    #[test]
    fn test_reroute_forfeited_stake_back_to_reporter() {
        let mut bank = funded_bank();
        let (pool, treasury) = (pool(), treasury());
        let mut report = held_report(40);
        let mut escrow = StakeEscrow::new(&mut bank, &pool, &treasury);

        escrow.forfeit(&mut report).unwrap();
        assert_eq!(escrow.reroute(&mut report, StakeDisposition::Forfeited), Ok(0));
        assert_eq!(escrow.reroute(&mut report, StakeDisposition::Returned), Ok(40));
        assert_eq!(report.stake, StakeDisposition::Returned);
        assert_eq!(bank.balance_of(&treasury), 0);
        assert_eq!(bank.balance_of(&Address::from("alice")), 140);
    }

    #[test]
    fn test_reroute_never_re_escrows() {
        let mut bank = funded_bank();
        let (pool, treasury) = (pool(), treasury());
        let mut report = held_report(40);
        report.stake = StakeDisposition::Returned;
        let mut escrow = StakeEscrow::new(&mut bank, &pool, &treasury);
        assert_eq!(
            escrow.reroute(&mut report, StakeDisposition::Held),
            Err(LedgerError::StakeAlreadyDisposed(1))
        );
    }

    #[test]
    fn test_reroute_leaves_returned_stake_with_reporter() {
        let mut bank = funded_bank();
        let (pool, treasury) = (pool(), treasury());
        let mut report = held_report(40);
        let mut escrow = StakeEscrow::new(&mut bank, &pool, &treasury);

        escrow.release(&mut report).unwrap();
        assert_eq!(escrow.reroute(&mut report, StakeDisposition::Forfeited), Ok(0));
        assert_eq!(report.stake, StakeDisposition::Returned);
        assert_eq!(bank.balance_of(&Address::from("alice")), 140);
        assert_eq!(bank.balance_of(&treasury), 0);
    }

    #[test]
    fn test_supply_is_conserved() {
        let mut bank = funded_bank();
        let before = bank.total_supply();
        let (pool, treasury) = (pool(), treasury());
        let mut report = held_report(40);
        let mut escrow = StakeEscrow::new(&mut bank, &pool, &treasury);
        escrow.collect(&Address::from("alice"), 30).unwrap();
        escrow.forfeit(&mut report).unwrap();
        escrow.reroute(&mut report, StakeDisposition::Returned).unwrap();
        assert_eq!(bank.total_supply(), before);
    }
}
