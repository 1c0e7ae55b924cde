//! Target weight calculation.
//!
//! Turns the yields reported by the registered backends into a target weight
//! per backend, in basis points:
//!
//! 1. Each backend's share of total yield, truncated to whole basis points.
//! 2. Shares above the concentration cap are clamped to the cap; shares
//!    below the participation floor are clamped to zero.
//! 3. If the clamped weights no longer sum to 10 000, every nonzero weight is
//!    rescaled once by `10 000 / total`. The cap and floor are not re-checked
//!    after this pass, and truncation can leave the sum a few points off.
//!
//! When every backend reports zero yield the weights are an equal split with
//! the division remainder left unassigned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sluice_core::math::{BPS_DENOMINATOR, mul_div_floor};
use sluice_core::types::{BackendId, BasisPoints};

/// Concentration cap and participation floor applied to target weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLimits {
    /// Largest weight any backend may receive before rescaling.
    pub max_cap: BasisPoints,
    /// Smallest nonzero weight before rescaling.
    pub min_floor: BasisPoints,
}

impl AllocationLimits {
    /// Creates limits from raw basis points.
    #[must_use]
    pub const fn new(max_cap_bp: u32, min_floor_bp: u32) -> Self {
        Self {
            max_cap: BasisPoints::new(max_cap_bp),
            min_floor: BasisPoints::new(min_floor_bp),
        }
    }
}

/// Computes a target weight for each yield, in the same order.
#[must_use]
pub fn compute_target_weights(yields: &[BasisPoints], limits: AllocationLimits) -> Vec<BasisPoints> {
    if yields.is_empty() {
        return Vec::new();
    }

    let total_yield: u128 = yields.iter().map(|y| u128::from(y.as_u32())).sum();
    if total_yield == 0 {
        let equal = BPS_DENOMINATOR / yields.len() as u128;
        return vec![to_bps(equal); yields.len()];
    }

    let bounded = bounded_weights(yields, total_yield, limits);
    rescale(&bounded).into_iter().map(to_bps).collect()
}

fn bounded_weights(yields: &[BasisPoints], total_yield: u128, limits: AllocationLimits) -> Vec<u128> {
    let cap = u128::from(limits.max_cap.as_u32());
    let floor = u128::from(limits.min_floor.as_u32());

    yields
        .iter()
        .map(|y| {
            let uncapped = mul_div_floor(u128::from(y.as_u32()), BPS_DENOMINATOR, total_yield)
                .unwrap_or(0);
            if uncapped > cap {
                cap
            } else if uncapped < floor {
                0
            } else {
                uncapped
            }
        })
        .collect()
}

fn rescale(weights: &[u128]) -> Vec<u128> {
    let total: u128 = weights.iter().sum();
    if total == 0 || total == BPS_DENOMINATOR {
        return weights.to_vec();
    }
    weights
        .iter()
        .map(|&w| mul_div_floor(w, BPS_DENOMINATOR, total).unwrap_or(0))
        .collect()
}

fn to_bps(value: u128) -> BasisPoints {
    BasisPoints::new(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Stored target weight per registered backend.
///
/// Only ever replaced as a whole; a backend without an entry has weight zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAllocations {
    weights: HashMap<BackendId, BasisPoints>,
}

impl TargetAllocations {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(backend, weight)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (BackendId, BasisPoints)>) -> Self {
        Self {
            weights: pairs.into_iter().collect(),
        }
    }

    /// Weight stored for `id`, zero if none.
    #[must_use]
    pub fn get(&self, id: &BackendId) -> BasisPoints {
        self.weights.get(id).copied().unwrap_or(BasisPoints::ZERO)
    }

    /// Returns true if `id` has a stored weight.
    #[must_use]
    pub fn contains(&self, id: &BackendId) -> bool {
        self.weights.contains_key(id)
    }

    /// Number of stored weights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of all stored weights.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.weights.values().map(BasisPoints::as_u32).sum()
    }

    /// Iterates over stored weights in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&BackendId, &BasisPoints)> {
        self.weights.iter()
    }

    /// Clones the table into a plain map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<BackendId, BasisPoints> {
        self.weights.clone()
    }
}
