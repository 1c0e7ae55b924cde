//! Amount type for representing asset balances and transfers.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use super::BasisPoints;
use crate::math::{BPS_DENOMINATOR, mul_div_floor};

/// Amount type - an unsigned quantity of the managed asset in base units.
///
/// Wraps a `u128` so balances of 18-decimal assets fit comfortably. All
/// arithmetic is checked; division always truncates.
///
/// Serializes as a plain integer when the value fits in `u64` and as a
/// decimal string otherwise, since TOML and JSON readers lose precision
/// beyond 64 bits. Both forms are accepted when deserializing.
///
/// # Examples
///
/// ```
/// use sluice_core::types::{Amount, BasisPoints};
///
/// let tvl = Amount::new(10_000);
/// assert_eq!(tvl.apply_bps(BasisPoints::new(3_334)), Some(Amount::new(3_334)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Amount(u128);

impl Amount {
    /// Zero amount constant.
    pub const ZERO: Self = Self(0);

    /// Largest representable amount.
    pub const MAX: Self = Self(u128::MAX);

    /// Creates a new `Amount` from base units.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Returns the underlying base-unit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Saturating subtraction.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Checked multiplication by a scalar.
    #[must_use]
    pub fn checked_mul(self, rhs: u128) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Returns `floor(self * numerator / denominator)`.
    ///
    /// Returns `None` if `denominator` is zero or the result overflows.
    #[must_use]
    pub fn mul_div_floor(self, numerator: u128, denominator: u128) -> Option<Self> {
        mul_div_floor(self.0, numerator, denominator).map(Self)
    }

    /// Returns `floor(self * bps / 10000)`.
    #[must_use]
    pub fn apply_bps(self, bps: BasisPoints) -> Option<Self> {
        self.mul_div_floor(u128::from(bps.as_u32()), BPS_DENOMINATOR)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().replace('_', "").parse::<u128>().map(Self)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(self.0) {
            Ok(small) => serializer.serialize_u64(small),
            Err(_) => serializer.collect_str(&self.0),
        }
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or an integer string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<Amount> for u128 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl<'a> Sum<&'a Amount> for Option<Amount> {
    fn sum<I: Iterator<Item = &'a Amount>>(mut iter: I) -> Self {
        iter.try_fold(Amount::ZERO, |acc, x| acc.checked_add(*x))
    }
}

impl Sum<Amount> for Option<Amount> {
    fn sum<I: Iterator<Item = Amount>>(mut iter: I) -> Self {
        iter.try_fold(Amount::ZERO, Amount::checked_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_checked_ops() {
        let a = Amount::new(100);
        let b = Amount::new(40);
        assert_eq!(a.checked_add(b), Some(Amount::new(140)));
        assert_eq!(a.checked_sub(b), Some(Amount::new(60)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), Amount::ZERO);
        assert_eq!(Amount::MAX.checked_add(Amount::new(1)), None);
    }

    #[test]
    fn test_amount_apply_bps_truncates() {
        let tvl = Amount::new(999);
        assert_eq!(tvl.apply_bps(BasisPoints::new(5_000)), Some(Amount::new(499)));
        assert_eq!(tvl.apply_bps(BasisPoints::ZERO), Some(Amount::ZERO));
    }

    #[test]
    fn test_amount_sum_detects_overflow() {
        let ok: Option<Amount> = [Amount::new(1), Amount::new(2)].iter().sum();
        assert_eq!(ok, Some(Amount::new(3)));

        let overflow: Option<Amount> = [Amount::MAX, Amount::new(1)].into_iter().sum();
        assert_eq!(overflow, None);
    }

    #[test]
    fn test_amount_from_str() {
        assert_eq!("1_000_000".parse::<Amount>().unwrap(), Amount::new(1_000_000));
        assert!("-5".parse::<Amount>().is_err());
    }

    #[test]
    fn test_amount_serde_small_is_integer() {
        let json = serde_json::to_string(&Amount::new(42)).unwrap();
        assert_eq!(json, "42");
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Amount::new(42));
    }

    #[test]
    fn test_amount_serde_large_is_string() {
        let big = Amount::new(u128::from(u64::MAX) + 1);
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, "\"18446744073709551616\"");
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, big);
    }

    #[test]
    fn test_amount_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert!(serde_json::from_str::<Amount>("\"abc\"").is_err());
    }
}
