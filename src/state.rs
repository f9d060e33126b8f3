//! Pool state and the observable event log.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ledger::Address;

/// Direction of a committed swap, as seen by indexers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    NativeToToken,
    TokenToNative,
}

/// Events appended on every committed mutation, consumable by an external
/// indexer or UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    LiquidityMinted {
        provider: Address,
        amount_native: u128,
        amount_token: u128,
        shares_issued: u128,
    },
    LiquidityBurned {
        provider: Address,
        share_amount: u128,
        native_out: u128,
        token_out: u128,
    },
    Swapped {
        trader: Address,
        amount_in: u128,
        amount_out: u128,
        direction: SwapDirection,
    },
}

/// Mutable pool state, owned exclusively by the pair and guarded by its
/// critical section. Reserves always equal actual custody; the share
/// balances (including the permanently locked allocation) sum to
/// `total_shares`.
#[derive(Debug, Default)]
pub(crate) struct PairState {
    pub reserve_native: u128,
    pub reserve_token: u128,
    pub total_shares: u128,
    pub share_balances: HashMap<Address, u128>,
    pub share_allowances: HashMap<(Address, Address), u128>,
    pub events: Vec<PoolEvent>,
}

/// Read-only copy of the pool's accounting for quoting and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub reserve_native: u128,
    pub reserve_token: u128,
    pub total_shares: u128,
}
