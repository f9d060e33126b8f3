//! Constant-product pricing.
//!
//! `quote` is the one precise numeric algorithm in the crate: it solves
//! `(x + dx)(y - dy) = xy` for the output of a swap, optionally after
//! discounting the input by the 0.3% protocol fee. All arithmetic is
//! exact integer math with 256-bit intermediates and floor division.

use crate::constants::{FEE_DENOMINATOR, FEE_NUMERATOR};
use crate::errors::AmmError;
use crate::math::{narrow, U256};

/// Quote the output of a swap against the given reserves.
///
/// Exactly one of `amount_in` / `amount_out` must be non-zero; it is the
/// input amount for that direction. `amount_in` flows into `reserve_in`
/// and the output is drawn from `reserve_out`; `amount_out` flows into
/// `reserve_out` and the output is drawn from `reserve_in`.
///
/// With `fee_applied`, the input is discounted to 997/1000 before the
/// formula is applied:
/// `out = floor(in * 997 * r_out / (r_in * 1000 + in * 997))`.
/// Without a fee (read-only previews):
/// `out = floor(in * r_out / (r_in + in))`.
pub fn quote(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    amount_out: u128,
    fee_applied: bool,
) -> Result<u128, AmmError> {
    let (r_in, r_out, a_in) = match (amount_in, amount_out) {
        (0, 0) => return Err(AmmError::ZeroAmount),
        (a, 0) => (reserve_in, reserve_out, a),
        (0, b) => (reserve_out, reserve_in, b),
        _ => return Err(AmmError::AmountMismatch),
    };

    let output = if fee_applied {
        let discounted = U256::from(a_in)
            .checked_mul(U256::from(FEE_NUMERATOR))
            .ok_or(AmmError::ArithmeticOverflow)?;
        let numerator = discounted
            .checked_mul(U256::from(r_out))
            .ok_or(AmmError::ArithmeticOverflow)?;
        let denominator = U256::from(r_in) * U256::from(FEE_DENOMINATOR) + discounted;
        numerator / denominator
    } else {
        // Products of two u128 values always fit in 256 bits.
        let numerator = U256::from(a_in) * U256::from(r_out);
        let denominator = U256::from(r_in) + U256::from(a_in);
        numerator / denominator
    };

    narrow(output)
}
