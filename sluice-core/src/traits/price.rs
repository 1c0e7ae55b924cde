//! Execution price source.

use crate::types::Amount;

/// Source of the current price of one execution unit, denominated in the
/// managed asset's base units.
///
/// The profitability gate multiplies this by a fixed number of units per
/// rebalance leg to estimate what a rebalance will cost.
pub trait ExecutionPriceSource: Send + Sync {
    /// Price of a single execution unit right now.
    fn unit_price(&self) -> Amount;
}

/// Price source that always reports the same unit price.
///
/// # Examples
///
/// ```
/// use sluice_core::traits::{ExecutionPriceSource, FixedExecutionPrice};
/// use sluice_core::types::Amount;
///
/// let price = FixedExecutionPrice::new(Amount::new(3));
/// assert_eq!(price.unit_price(), Amount::new(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedExecutionPrice(Amount);

impl FixedExecutionPrice {
    /// Creates a fixed price source.
    #[must_use]
    pub const fn new(price: Amount) -> Self {
        Self(price)
    }
}

impl ExecutionPriceSource for FixedExecutionPrice {
    fn unit_price(&self) -> Amount {
        self.0
    }
}
