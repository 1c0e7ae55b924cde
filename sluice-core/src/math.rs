//! Truncating fixed-point arithmetic.
//!
//! All basis-point math in Sluice floors. Products of two asset amounts can
//! exceed `u128`, so [`mul_div_floor`] keeps a 256-bit intermediate.

use alloy_primitives::U256;

/// Basis-point denominator (100 %).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Computes `floor(a * b / denominator)` without intermediate overflow.
///
/// Returns `None` if `denominator` is zero or the quotient does not fit in `u128`.
///
/// # Examples
///
/// ```
/// use sluice_core::math::mul_div_floor;
///
/// assert_eq!(mul_div_floor(3_333, 10_000, 9_999), Some(3_333));
/// assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
/// assert_eq!(mul_div_floor(1, 1, 0), None);
/// ```
#[must_use]
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / denominator);
    }

    let product = U256::from(a).checked_mul(U256::from(b))?;
    let quotient = product.checked_div(U256::from(denominator))?;
    u128::try_from(quotient).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floor_small_values() {
        assert_eq!(mul_div_floor(500, 10_000, 1_500), Some(3_333));
        assert_eq!(mul_div_floor(1_000, 10_000, 1_500), Some(6_666));
        assert_eq!(mul_div_floor(0, 10_000, 7), Some(0));
    }

    #[test]
    fn test_mul_div_floor_zero_denominator() {
        assert_eq!(mul_div_floor(10, 10, 0), None);
    }

    #[test]
    fn test_mul_div_floor_wide_intermediate() {
        let a = 10u128.pow(30);
        let b = 3 * 10u128.pow(29);
        let d = 10u128.pow(30);
        // a * b overflows u128, the quotient does not
        assert!(a.checked_mul(b).is_none());
        assert_eq!(mul_div_floor(a, b, d), Some(b));
    }

    #[test]
    fn test_mul_div_floor_wide_truncates() {
        let a = u128::MAX;
        let b = 3;
        let d = 4;
        // floor((2^128 - 1) * 3 / 4)
        let expected = (u128::MAX / 4) * 3 + ((u128::MAX % 4) * 3) / 4;
        assert_eq!(mul_div_floor(a, b, d), Some(expected));
    }

    #[test]
    fn test_mul_div_floor_rescale_truncates() {
        // 3333 of a 9999 total rescaled to 10000 stays at 3333
        assert_eq!(mul_div_floor(3_333, 10_000, 9_999), Some(3_333));
        assert_eq!(mul_div_floor(6_666, 10_000, 9_999), Some(6_666));
    }

    #[test]
    fn test_mul_div_floor_matches_wide_reference() {
        let cases = [
            (u128::MAX, u128::MAX, u128::MAX),
            (u128::MAX, 10_000, 9_999),
            (1u128 << 100, 1u128 << 100, 1u128 << 90),
            (123_456_789_012_345_678_901_234_567, 987_654_321, 1_000_000_007),
        ];
        for (a, b, d) in cases {
            let expected = (U256::from(a) * U256::from(b)) / U256::from(d);
            assert_eq!(mul_div_floor(a, b, d), u128::try_from(expected).ok());
        }
    }

    #[test]
    fn test_mul_div_floor_quotient_overflow() {
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
    }
}
