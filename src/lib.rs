/// Constant-Product Pool Library
///
/// This library provides a two-asset liquidity pool: a pair ledger that
/// tracks reserves and LP shares behind invariant checks, and a router
/// that turns user intents (deposits, withdrawals, swaps with slippage
/// bounds) into exact-rounding constant-product math and asset movements.

pub mod constants;
pub mod errors;
pub mod ledger;
pub mod math;
pub mod pair;
pub mod router;
pub mod state;
pub mod swap;

// Re-export the public surface for convenience
pub use constants::{FEE_DENOMINATOR, FEE_NUMERATOR, MINIMUM_LOCKED_SHARES, SCALE};
pub use errors::{AmmError, LedgerError};
pub use ledger::{Address, AssetLedger, InMemoryLedger};
pub use pair::Pair;
pub use router::Router;
pub use state::{PoolEvent, PoolSnapshot, SwapDirection};
pub use swap::quote;
