//! Rebalance profitability gate.
//!
//! A rebalance is worth executing only when the yield it gains over one week
//! exceeds its estimated execution cost times a safety multiplier. The
//! estimate uses freshly computed weights but never stores them.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sluice_core::math::{BPS_DENOMINATOR, mul_div_floor};
use sluice_core::types::{Amount, BasisPoints};

use crate::allocation::{AllocationLimits, TargetAllocations, compute_target_weights};
use crate::error::ManagerError;
use crate::registry::{BackendSnapshot, total_balance};

/// Execution units charged per rebalance leg.
pub const UNITS_PER_MOVE: u128 = 150_000;

const DAYS_PER_WEEK: u128 = 7;
const DAYS_PER_YEAR: u128 = 365;

/// Inputs the gate reads from the manager parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateParams {
    /// Minimum TVL below which no rebalance is approved.
    pub min_tvl: Amount,
    /// Safety multiplier on the cost, in percent.
    pub cost_multiplier_pct: u32,
    /// Cap and floor used for the temporary weights.
    pub limits: AllocationLimits,
}

/// Why the gate rejected without estimating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer than two backends are registered.
    TooFewBackends,
    /// Total value is below the configured minimum.
    TvlBelowMinimum,
    /// Every backend reports zero yield.
    ZeroYield,
    /// Weekly profit does not exceed the scaled cost.
    CostExceedsProfit,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TooFewBackends => "fewer than 2 backends",
            Self::TvlBelowMinimum => "total value below minimum",
            Self::ZeroYield => "total yield is zero",
            Self::CostExceedsProfit => "weekly profit does not exceed execution cost",
        };
        f.write_str(text)
    }
}

/// Result of a profitability evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityEstimate {
    /// Whether the rebalance should run.
    pub approved: bool,
    /// Set when `approved` is false.
    pub skip_reason: Option<SkipReason>,
    /// Total value across backends.
    pub total_tvl: Amount,
    /// Yield gained per year on capital moved into backends below target.
    pub expected_annual_profit: Amount,
    /// `expected_annual_profit * 7 / 365`.
    pub weekly_profit: Amount,
    /// Backends whose freshly computed weight differs from the stored one.
    pub num_moves: u32,
    /// `num_moves * UNITS_PER_MOVE * unit_price`.
    pub estimated_cost: Amount,
    /// Cost after the safety multiplier.
    pub threshold: Amount,
}

impl ProfitabilityEstimate {
    fn skipped(reason: SkipReason, total_tvl: Amount) -> Self {
        Self {
            approved: false,
            skip_reason: Some(reason),
            total_tvl,
            expected_annual_profit: Amount::ZERO,
            weekly_profit: Amount::ZERO,
            num_moves: 0,
            estimated_cost: Amount::ZERO,
            threshold: Amount::ZERO,
        }
    }

    /// Weekly profit as a share of the threshold, if the threshold is nonzero.
    #[must_use]
    pub fn profit_to_cost_ratio(&self) -> Option<Decimal> {
        let weekly = Decimal::from_str_exact(&self.weekly_profit.to_string()).ok()?;
        let threshold = Decimal::from_str_exact(&self.threshold.to_string()).ok()?;
        if threshold.is_zero() {
            return None;
        }
        weekly.checked_div(threshold)
    }
}

/// Evaluates whether rebalancing `snapshots` towards fresh weights pays off.
pub fn evaluate(
    snapshots: &[BackendSnapshot],
    stored: &TargetAllocations,
    params: GateParams,
    unit_price: Amount,
) -> Result<ProfitabilityEstimate, ManagerError> {
    let total_tvl = total_balance(snapshots)?;

    if snapshots.len() < 2 {
        return Ok(ProfitabilityEstimate::skipped(SkipReason::TooFewBackends, total_tvl));
    }
    if total_tvl < params.min_tvl {
        return Ok(ProfitabilityEstimate::skipped(SkipReason::TvlBelowMinimum, total_tvl));
    }
    if snapshots.iter().all(|s| s.apy.is_zero()) {
        return Ok(ProfitabilityEstimate::skipped(SkipReason::ZeroYield, total_tvl));
    }

    let yields: Vec<BasisPoints> = snapshots.iter().map(|s| s.apy).collect();
    let weights = compute_target_weights(&yields, params.limits);

    let mut annual = Amount::ZERO;
    let mut num_moves = 0u32;
    for (snapshot, weight) in snapshots.iter().zip(&weights) {
        let target = total_tvl
            .apply_bps(*weight)
            .ok_or(ManagerError::ArithmeticOverflow)?;

        if target > snapshot.balance {
            let gain = annual_yield(target.saturating_sub(snapshot.balance), snapshot.apy)
                .ok_or(ManagerError::ArithmeticOverflow)?;
            annual = annual
                .checked_add(gain)
                .ok_or(ManagerError::ArithmeticOverflow)?;
        }
        if *weight != stored.get(&snapshot.id) {
            num_moves += 1;
        }
    }

    let weekly_profit = annual
        .mul_div_floor(DAYS_PER_WEEK, DAYS_PER_YEAR)
        .ok_or(ManagerError::ArithmeticOverflow)?;
    let estimated_cost = unit_price
        .checked_mul(UNITS_PER_MOVE)
        .and_then(|c| c.checked_mul(u128::from(num_moves)))
        .ok_or(ManagerError::ArithmeticOverflow)?;
    let threshold = estimated_cost
        .mul_div_floor(u128::from(params.cost_multiplier_pct), 100)
        .ok_or(ManagerError::ArithmeticOverflow)?;

    let approved = weekly_profit > threshold;
    debug!(
        total_tvl = %total_tvl,
        expected_annual_profit = %annual,
        weekly_profit = %weekly_profit,
        num_moves,
        estimated_cost = %estimated_cost,
        threshold = %threshold,
        approved,
        "Evaluated rebalance profitability"
    );

    Ok(ProfitabilityEstimate {
        approved,
        skip_reason: (!approved).then_some(SkipReason::CostExceedsProfit),
        total_tvl,
        expected_annual_profit: annual,
        weekly_profit,
        num_moves,
        estimated_cost,
        threshold,
    })
}

/// Yield earned by `amount` over one year at `apy`.
#[must_use]
pub fn annual_yield(amount: Amount, apy: BasisPoints) -> Option<Amount> {
    mul_div_floor(amount.as_u128(), u128::from(apy.as_u32()), BPS_DENOMINATOR).map(Amount::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sluice_core::types::BackendId;

    fn snap(name: &str, balance: u128, apy: u32) -> BackendSnapshot {
        BackendSnapshot {
            id: BackendId::new(name).unwrap(),
            balance: Amount::new(balance),
            apy: BasisPoints::new(apy),
        }
    }

    fn params() -> GateParams {
        GateParams {
            min_tvl: Amount::new(1_000_000_000),
            cost_multiplier_pct: 200,
            limits: AllocationLimits::new(10_000, 0),
        }
    }

    // a holds everything at 2%, b holds nothing at 8%: targets 20%/80%
    fn skewed() -> Vec<BackendSnapshot> {
        vec![snap("a", 10_000_000_000, 200), snap("b", 0, 800)]
    }

    #[test]
    fn test_rejects_single_backend() {
        let estimate = evaluate(
            &[snap("a", 10_000_000_000, 500)],
            &TargetAllocations::new(),
            params(),
            Amount::new(1),
        )
        .unwrap();
        assert!(!estimate.approved);
        assert_eq!(estimate.skip_reason, Some(SkipReason::TooFewBackends));
    }

    #[test]
    fn test_rejects_low_tvl() {
        let estimate = evaluate(
            &[snap("a", 400_000_000, 200), snap("b", 500_000_000, 800)],
            &TargetAllocations::new(),
            params(),
            Amount::new(1),
        )
        .unwrap();
        assert_eq!(estimate.skip_reason, Some(SkipReason::TvlBelowMinimum));
        assert_eq!(estimate.total_tvl, Amount::new(900_000_000));
    }

    #[test]
    fn test_rejects_zero_yield() {
        let estimate = evaluate(
            &[snap("a", 10_000_000_000, 0), snap("b", 0, 0)],
            &TargetAllocations::new(),
            params(),
            Amount::new(1),
        )
        .unwrap();
        assert_eq!(estimate.skip_reason, Some(SkipReason::ZeroYield));
    }

    #[test]
    fn test_approves_when_profit_beats_cost() {
        let estimate = evaluate(&skewed(), &TargetAllocations::new(), params(), Amount::new(10))
            .unwrap();

        // b gains 8e9 at 8%: 640_000_000 a year
        assert_eq!(estimate.expected_annual_profit, Amount::new(640_000_000));
        assert_eq!(estimate.weekly_profit, Amount::new(12_273_972));
        assert_eq!(estimate.num_moves, 2);
        assert_eq!(estimate.estimated_cost, Amount::new(3_000_000));
        assert_eq!(estimate.threshold, Amount::new(6_000_000));
        assert!(estimate.approved);
        assert_eq!(estimate.skip_reason, None);
        assert!(estimate.profit_to_cost_ratio().unwrap() > dec!(2));
    }

    #[test]
    fn test_rejects_when_cost_too_high() {
        let estimate = evaluate(&skewed(), &TargetAllocations::new(), params(), Amount::new(30))
            .unwrap();
        assert_eq!(estimate.threshold, Amount::new(18_000_000));
        assert!(!estimate.approved);
        assert_eq!(estimate.skip_reason, Some(SkipReason::CostExceedsProfit));
    }

    #[test]
    fn test_moves_counted_from_weight_changes_only() {
        let stored = TargetAllocations::from_pairs([
            (BackendId::new("a").unwrap(), BasisPoints::new(2_000)),
            (BackendId::new("b").unwrap(), BasisPoints::new(8_000)),
        ]);
        let estimate = evaluate(&skewed(), &stored, params(), Amount::new(1_000)).unwrap();

        // weights unchanged, so the estimate is free even though balances are off
        assert_eq!(estimate.num_moves, 0);
        assert_eq!(estimate.estimated_cost, Amount::ZERO);
        assert!(estimate.approved);
        assert_eq!(estimate.profit_to_cost_ratio(), None);
    }

    #[test]
    fn test_on_target_is_not_approved() {
        let balanced = vec![snap("a", 2_000_000_000, 200), snap("b", 8_000_000_000, 800)];
        let stored = TargetAllocations::from_pairs([
            (BackendId::new("a").unwrap(), BasisPoints::new(2_000)),
            (BackendId::new("b").unwrap(), BasisPoints::new(8_000)),
        ]);
        let estimate = evaluate(&balanced, &stored, params(), Amount::new(1)).unwrap();
        assert_eq!(estimate.expected_annual_profit, Amount::ZERO);
        assert!(!estimate.approved);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::TooFewBackends.to_string(), "fewer than 2 backends");
    }
}
