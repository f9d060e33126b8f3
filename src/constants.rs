use crate::ledger::Address;

/// 18-decimal fixed-point scale shared by both pool assets.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Portion of a swap input that is priced in after the 0.3% protocol fee.
pub const FEE_NUMERATOR: u128 = 997;
pub const FEE_DENOMINATOR: u128 = 1000;

/// Shares minted to [`LOCK_ADDRESS`] on the first deposit and never
/// spendable afterwards, keeping the share price non-manipulable.
pub const MINIMUM_LOCKED_SHARES: u128 = 1000;

/// Holder of the permanently locked genesis shares.
pub const LOCK_ADDRESS: Address = Address([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);
