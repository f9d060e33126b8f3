//! The external asset-ledger capability consumed by the router, plus an
//! in-memory reference implementation used by the demo binary and tests.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Account identifier, 20 bytes like the asset ledgers this pool trades
/// against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Build an address with `n` in the low bytes; handy for fixtures.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Address(bytes)
    }
}

/// Minimal fungible-asset surface the pool requires of a collaborator.
///
/// Implementations must apply each call atomically; the router sequences
/// these calls so funds are in the pair's custody before any reserve
/// update is committed.
pub trait AssetLedger: Send + Sync {
    fn balance_of(&self, holder: Address) -> u128;
    /// Move `amount` from `from` to `to` on the authority of `from`.
    fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError>;
    /// Move `amount` from `owner` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError>;
    /// Grant `spender` the right to move up to `amount` of `owner`'s funds.
    fn approve(&self, owner: Address, spender: Address, amount: u128);
    fn mint(&self, to: Address, amount: u128) -> Result<(), LedgerError>;
    fn burn(&self, from: Address, amount: u128) -> Result<(), LedgerError>;
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl LedgerState {
    /// Debit and credit applied together; both sides are validated before
    /// either balance is written.
    fn move_funds(&mut self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        let debited = self
            .balances
            .get(&from)
            .copied()
            .unwrap_or(0)
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance)?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        self.balances.insert(from, debited);
        self.balances.insert(to, credited);
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: u128) -> Result<(), LedgerError> {
        let balance = self.balances.entry(to).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(())
    }

    fn debit(&mut self, from: Address, amount: u128) -> Result<(), LedgerError> {
        let balance = self.balances.entry(from).or_default();
        *balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance)?;
        Ok(())
    }
}

/// In-memory asset ledger with ERC-20-style balances and allowances.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        *self
            .state
            .lock()
            .allowances
            .get(&(owner, spender))
            .unwrap_or(&0)
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, holder: Address) -> u128 {
        *self.state.lock().balances.get(&holder).unwrap_or(&0)
    }

    fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        state.move_funds(from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let allowance = *state.allowances.get(&(owner, spender)).unwrap_or(&0);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance)?;
        state.move_funds(owner, to, amount)?;
        state.allowances.insert((owner, spender), remaining);
        Ok(())
    }

    fn approve(&self, owner: Address, spender: Address, amount: u128) {
        self.state.lock().allowances.insert((owner, spender), amount);
    }

    fn mint(&self, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.state.lock().credit(to, amount)
    }

    fn burn(&self, from: Address, amount: u128) -> Result<(), LedgerError> {
        self.state.lock().debit(from, amount)
    }
}
