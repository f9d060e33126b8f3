//! Wide-integer helpers for exact pool arithmetic.
//!
//! Amounts are 18-decimal scaled `u128` values; every product that could
//! exceed 128 bits is formed in a 256-bit intermediate and narrowed back
//! with an explicit overflow check. All divisions are floor (truncating).

use uint::construct_uint;

use crate::errors::AmmError;

construct_uint! {
    /// 256-bit unsigned integer for overflow-free intermediates.
    pub struct U256(4);
}

/// Narrow a 256-bit value back to `u128`, failing on overflow.
pub fn narrow(value: U256) -> Result<u128, AmmError> {
    if value > U256::from(u128::MAX) {
        return Err(AmmError::ArithmeticOverflow);
    }
    Ok(value.as_u128())
}

/// `floor(a * b / d)` with a full-width intermediate product.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128, AmmError> {
    if d == 0 {
        return Err(AmmError::ArithmeticOverflow);
    }
    let wide = U256::from(a) * U256::from(b);
    narrow(wide / U256::from(d))
}

/// Floor square root by Babylonian iteration, exact on integers.
pub fn integer_sqrt(value: U256) -> U256 {
    if value <= U256::one() {
        return value;
    }
    let two = U256::from(2u8);
    let mut x = value;
    let mut y = (x + U256::one()) / two;
    while y < x {
        x = y;
        y = (x + value / x) / two;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mul_div_floor_truncates() {
        assert_eq!(mul_div_floor(10, 3, 4).unwrap(), 7); // 30 / 4 = 7.5
        assert_eq!(mul_div_floor(1, 1, 3).unwrap(), 0);
    }

    #[test]
    fn mul_div_floor_uses_wide_intermediate() {
        // a * b overflows u128 but the quotient fits.
        let a = u128::MAX;
        assert_eq!(mul_div_floor(a, 1000, 1000).unwrap(), a);
    }

    #[test]
    fn mul_div_floor_rejects_overflowing_result() {
        assert_eq!(
            mul_div_floor(u128::MAX, 2, 1),
            Err(AmmError::ArithmeticOverflow)
        );
    }

    #[test]
    fn mul_div_floor_rejects_zero_divisor() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(AmmError::ArithmeticOverflow));
    }

    #[test]
    fn integer_sqrt_exact_squares() {
        assert_eq!(integer_sqrt(U256::from(0u8)), U256::from(0u8));
        assert_eq!(integer_sqrt(U256::from(1u8)), U256::from(1u8));
        assert_eq!(integer_sqrt(U256::from(4u8)), U256::from(2u8));
        let five_e18 = 5_000_000_000_000_000_000u128;
        assert_eq!(
            integer_sqrt(U256::from(five_e18) * U256::from(five_e18)),
            U256::from(five_e18)
        );
    }

    #[test]
    fn integer_sqrt_rounds_down() {
        assert_eq!(integer_sqrt(U256::from(8u8)), U256::from(2u8));
        assert_eq!(integer_sqrt(U256::from(99u8)), U256::from(9u8));
    }

    proptest! {
        #[test]
        fn integer_sqrt_bounds(a in any::<u128>(), b in any::<u128>()) {
            let value = U256::from(a) * U256::from(b);
            let root = integer_sqrt(value);
            prop_assert!(root * root <= value);
            let next = root + U256::one();
            // (root + 1)^2 can exceed 256 bits only when it is trivially
            // larger than any product of two u128 values.
            if let Some(square) = next.checked_mul(next) {
                prop_assert!(square > value);
            }
        }

        #[test]
        fn mul_div_floor_matches_exact_division(a in any::<u64>(), b in any::<u64>(), d in 1..=u64::MAX) {
            let got = mul_div_floor(a as u128, b as u128, d as u128).unwrap();
            prop_assert_eq!(got, (a as u128 * b as u128) / d as u128);
        }
    }
}
