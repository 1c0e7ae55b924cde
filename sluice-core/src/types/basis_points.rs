//! Basis point type for weights and yields.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Basis points - 1/100 of a percent; 10 000 bp = 100 %.
///
/// Used both for target weights (bounded by 10 000 when validated) and for
/// annualized yields, which may legitimately exceed 100 %.
///
/// # Examples
///
/// ```
/// use sluice_core::types::BasisPoints;
/// use rust_decimal_macros::dec;
///
/// let apy = BasisPoints::new(525);
/// assert_eq!(apy.as_percent(), dec!(5.25));
/// assert!(BasisPoints::new_weight(10_001).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// Zero basis points.
    pub const ZERO: Self = Self(0);

    /// 100 % expressed in basis points.
    pub const MAX_WEIGHT: Self = Self(10_000);

    /// Creates a new `BasisPoints` value without range checks.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Creates a weight, rejecting values above 100 %.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BasisPointsOutOfRange` if `value > 10000`.
    pub fn new_weight(value: u32) -> Result<Self, ValidationError> {
        if value > Self::MAX_WEIGHT.0 {
            return Err(ValidationError::BasisPointsOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw basis-point value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true if zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the value as a percentage (e.g. 525 bp -> 5.25).
    #[must_use]
    pub fn as_percent(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Returns the value as a fraction of one (e.g. 2500 bp -> 0.25).
    #[must_use]
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}

impl From<u32> for BasisPoints {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
