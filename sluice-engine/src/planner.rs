//! Rebalance planning.
//!
//! Compares each backend's balance with its target share of the total and
//! pairs backends above target with backends below target, greedily and in
//! registry order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use sluice_core::types::{Amount, BackendId};

use crate::allocation::TargetAllocations;
use crate::error::ManagerError;
use crate::registry::BackendSnapshot;

/// One deposit into a backend below target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Receiving backend.
    pub to: BackendId,
    /// Amount deposited.
    pub amount: Amount,
}

/// Everything moved out of one backend above target.
///
/// The whole surplus is withdrawn in one call, then deposited across the
/// transfers. Surplus not covered by any transfer stays with the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcessLeg {
    /// Backend above target.
    pub source: BackendId,
    /// Balance above target.
    pub surplus: Amount,
    /// Deposits funded from this surplus.
    pub transfers: Vec<Transfer>,
}

/// A single source-to-destination move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Source backend.
    pub from: BackendId,
    /// Destination backend.
    pub to: BackendId,
    /// Amount moved.
    pub amount: Amount,
}

/// Output of [`plan_rebalance`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePlan {
    /// Total value the targets were derived from.
    pub total_tvl: Amount,
    /// One entry per backend above target, in registry order.
    pub legs: Vec<ExcessLeg>,
    /// Need left unfunded once every surplus was consumed.
    pub unfunded_deficit: Amount,
}

impl RebalancePlan {
    /// Flattens the plan into individual moves, in execution order.
    #[must_use]
    pub fn moves(&self) -> Vec<Move> {
        self.legs
            .iter()
            .flat_map(|leg| {
                leg.transfers.iter().map(|t| Move {
                    from: leg.source.clone(),
                    to: t.to.clone(),
                    amount: t.amount,
                })
            })
            .collect()
    }

    /// Number of moves.
    #[must_use]
    pub fn num_moves(&self) -> usize {
        self.legs.iter().map(|leg| leg.transfers.len()).sum()
    }

    /// Returns true if nothing needs to move.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}

/// Builds the moves that bring each backend to `total_tvl * weight / 10000`.
pub fn plan_rebalance(
    snapshots: &[BackendSnapshot],
    targets: &TargetAllocations,
    total_tvl: Amount,
) -> Result<RebalancePlan, ManagerError> {
    let mut excess: Vec<(BackendId, Amount)> = Vec::new();
    let mut deficit: Vec<(BackendId, Amount)> = Vec::new();

    for snapshot in snapshots {
        let target = total_tvl
            .apply_bps(targets.get(&snapshot.id))
            .ok_or(ManagerError::ArithmeticOverflow)?;

        if snapshot.balance > target {
            excess.push((snapshot.id.clone(), snapshot.balance.saturating_sub(target)));
        } else if target > snapshot.balance {
            deficit.push((snapshot.id.clone(), target.saturating_sub(snapshot.balance)));
        }
    }

    let mut legs = Vec::with_capacity(excess.len());
    let mut d = 0;

    for (source, surplus) in excess {
        let mut remaining = surplus;
        let mut transfers = Vec::new();

        while !remaining.is_zero() && d < deficit.len() {
            let need = &mut deficit[d].1;
            let amount = remaining.min(*need);
            remaining = remaining.saturating_sub(amount);
            *need = need.saturating_sub(amount);

            if !amount.is_zero() {
                transfers.push(Transfer {
                    to: deficit[d].0.clone(),
                    amount,
                });
            }
            if deficit[d].1.is_zero() {
                d += 1;
            }
        }

        debug!(
            source = %source,
            surplus = %surplus,
            transfers = transfers.len(),
            leftover = %remaining,
            "Planned excess leg"
        );
        legs.push(ExcessLeg {
            source,
            surplus,
            transfers,
        });
    }

    let unfunded_deficit = deficit[d.min(deficit.len())..]
        .iter()
        .map(|(_, need)| *need)
        .sum::<Option<Amount>>()
        .ok_or(ManagerError::ArithmeticOverflow)?;

    Ok(RebalancePlan {
        total_tvl,
        legs,
        unfunded_deficit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::types::BasisPoints;

    fn id(s: &str) -> BackendId {
        BackendId::new(s).unwrap()
    }

    fn snap(name: &str, balance: u128) -> BackendSnapshot {
        BackendSnapshot {
            id: id(name),
            balance: Amount::new(balance),
            apy: BasisPoints::new(500),
        }
    }

    fn targets(pairs: &[(&str, u32)]) -> TargetAllocations {
        TargetAllocations::from_pairs(
            pairs
                .iter()
                .map(|(name, w)| (id(name), BasisPoints::new(*w))),
        )
    }

    #[test]
    fn test_single_pair() {
        let plan = plan_rebalance(
            &[snap("a", 8_000), snap("b", 2_000)],
            &targets(&[("a", 5_000), ("b", 5_000)]),
            Amount::new(10_000),
        )
        .unwrap();

        assert_eq!(
            plan.moves(),
            vec![Move {
                from: id("a"),
                to: id("b"),
                amount: Amount::new(3_000),
            }]
        );
        assert_eq!(plan.legs[0].surplus, Amount::new(3_000));
        assert_eq!(plan.unfunded_deficit, Amount::ZERO);
    }

    #[test]
    fn test_one_excess_fills_two_deficits_in_order() {
        let plan = plan_rebalance(
            &[snap("a", 9_000), snap("b", 500), snap("c", 500)],
            &targets(&[("a", 5_000), ("b", 2_500), ("c", 2_500)]),
            Amount::new(10_000),
        )
        .unwrap();

        assert_eq!(plan.legs.len(), 1);
        let transfers = &plan.legs[0].transfers;
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].to, id("b"));
        assert_eq!(transfers[0].amount, Amount::new(2_000));
        assert_eq!(transfers[1].to, id("c"));
        assert_eq!(transfers[1].amount, Amount::new(2_000));
    }

    #[test]
    fn test_two_excess_share_one_deficit() {
        let plan = plan_rebalance(
            &[snap("a", 4_000), snap("b", 4_000), snap("c", 2_000)],
            &targets(&[("a", 3_000), ("b", 3_000), ("c", 4_000)]),
            Amount::new(10_000),
        )
        .unwrap();

        let moves = plan.moves();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].from, id("a"));
        assert_eq!(moves[1].from, id("b"));
        assert!(moves.iter().all(|m| m.to == id("c") && m.amount == Amount::new(1_000)));
    }

    #[test]
    fn test_on_target_backends_are_skipped() {
        let plan = plan_rebalance(
            &[snap("a", 5_000), snap("b", 5_000)],
            &targets(&[("a", 5_000), ("b", 5_000)]),
            Amount::new(10_000),
        )
        .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.num_moves(), 0);
    }

    #[test]
    fn test_leftover_surplus_stays_unassigned() {
        // weights sum to 9999, so one unit of surplus has no deficit to go to
        let plan = plan_rebalance(
            &[snap("a", 10_000), snap("b", 0)],
            &targets(&[("a", 3_333), ("b", 6_666)]),
            Amount::new(10_000),
        )
        .unwrap();

        assert_eq!(plan.legs[0].surplus, Amount::new(6_667));
        assert_eq!(plan.legs[0].transfers[0].amount, Amount::new(6_666));
        assert_eq!(plan.unfunded_deficit, Amount::ZERO);
    }

    #[test]
    fn test_leftover_deficit_is_reported() {
        let plan = plan_rebalance(
            &[snap("a", 100), snap("b", 0)],
            &targets(&[("a", 0), ("b", 10_000)]),
            Amount::new(150),
        )
        .unwrap();

        assert_eq!(plan.num_moves(), 1);
        assert_eq!(plan.unfunded_deficit, Amount::new(50));
    }

    #[test]
    fn test_backend_without_weight_is_drained() {
        let plan = plan_rebalance(
            &[snap("a", 1_000), snap("b", 1_000)],
            &targets(&[("b", 10_000)]),
            Amount::new(2_000),
        )
        .unwrap();
        assert_eq!(plan.moves()[0].amount, Amount::new(1_000));
    }
}
