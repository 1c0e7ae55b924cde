//! Allocation manager.
//!
//! Owns the backend registry, the target allocation table, the tunable
//! parameters and the idle balance, all behind a single mutex. Every public
//! operation holds that mutex from its first backend read to its commit, so
//! operations never interleave.
//!
//! An operation either commits all of its effects or none of them:
//! - table, parameter and idle changes are built on local copies and stored
//!   only on success
//! - backend calls go through a [`FundMover`] and are compensated on failure
//! - events are buffered and published after the mutex is released

#![allow(clippy::significant_drop_tightening)]

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sluice_core::config::{ManagerConfig, Validatable, validate_allocation_bounds};
use sluice_core::math::BPS_DENOMINATOR;
use sluice_core::traits::{AssetReceiver, ExecutionPriceSource, YieldBackend};
use sluice_core::types::{Amount, AssetId, BackendId, BasisPoints};

use crate::allocation::{AllocationLimits, TargetAllocations, compute_target_weights};
use crate::auth::{self, AdminCapability, PoolCapability};
use crate::error::ManagerError;
use crate::events::{EventSink, ManagerEvent, TracingEventSink};
use crate::mover::FundMover;
use crate::planner::{RebalancePlan, plan_rebalance};
use crate::profitability::{self, GateParams, ProfitabilityEstimate};
use crate::registry::{BackendRegistry, BackendSnapshot, total_balance};

/// Current values of the tunable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerParams {
    /// Stored rebalance threshold.
    pub rebalance_threshold_bp: u32,
    /// Minimum TVL for a rebalance to be approved.
    pub min_tvl_for_rebalance: Amount,
    /// Safety multiplier on the rebalance cost, in percent.
    pub gas_cost_multiplier_pct: u32,
    /// Concentration cap.
    pub max_allocation_per_backend_bp: u32,
    /// Participation floor.
    pub min_allocation_threshold_bp: u32,
}

impl ManagerParams {
    /// Cap and floor as allocation limits.
    #[must_use]
    pub const fn limits(&self) -> AllocationLimits {
        AllocationLimits::new(
            self.max_allocation_per_backend_bp,
            self.min_allocation_threshold_bp,
        )
    }

    fn gate(&self) -> GateParams {
        GateParams {
            min_tvl: self.min_tvl_for_rebalance,
            cost_multiplier_pct: self.gas_cost_multiplier_pct,
            limits: self.limits(),
        }
    }
}

impl From<&ManagerConfig> for ManagerParams {
    fn from(config: &ManagerConfig) -> Self {
        Self {
            rebalance_threshold_bp: config.rebalance_threshold_bp,
            min_tvl_for_rebalance: config.min_tvl_for_rebalance,
            gas_cost_multiplier_pct: config.gas_cost_multiplier_pct,
            max_allocation_per_backend_bp: config.max_allocation_per_backend_bp,
            min_allocation_threshold_bp: config.min_allocation_threshold_bp,
        }
    }
}

/// Read-only view of one registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Registry handle.
    pub id: BackendId,
    /// Name reported by the backend.
    pub name: String,
    /// Current balance.
    pub balance: Amount,
    /// Current yield.
    pub apy: BasisPoints,
    /// Stored target weight.
    pub target_weight: BasisPoints,
}

impl BackendInfo {
    /// Yield as a percentage.
    #[must_use]
    pub fn apy_percent(&self) -> Decimal {
        self.apy.as_percent()
    }

    /// Target weight as a percentage.
    #[must_use]
    pub fn target_percent(&self) -> Decimal {
        self.target_weight.as_percent()
    }
}

/// What a successful rebalance did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    /// Estimate that approved the rebalance.
    pub estimate: ProfitabilityEstimate,
    /// Plan that was executed.
    pub plan: RebalancePlan,
}

#[derive(Debug)]
struct ManagerState {
    registry: BackendRegistry,
    targets: TargetAllocations,
    params: ManagerParams,
    idle: Amount,
}

/// Distributes capital across yield backends and rebalances between them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use sluice_core::config::ManagerConfig;
/// use sluice_core::traits::FixedExecutionPrice;
/// use sluice_core::types::{Amount, AssetId, BackendId, BasisPoints};
/// use sluice_engine::AllocationManager;
/// use sluice_engine::backends::SimulatedBackend;
///
/// let usdc = AssetId::new("USDC").unwrap();
/// let price = Arc::new(FixedExecutionPrice::new(Amount::new(1)));
/// let (manager, pool, admin) =
///     AllocationManager::new(ManagerConfig::new(usdc.clone()), price).unwrap();
///
/// for (name, apy) in [("aave", 400), ("comp", 400)] {
///     let backend = SimulatedBackend::new(name, usdc.clone(), BasisPoints::new(apy));
///     manager
///         .add_backend(&admin, BackendId::new(name).unwrap(), Arc::new(backend))
///         .unwrap();
/// }
///
/// manager.allocate(&pool, Amount::new(1_000)).unwrap();
/// assert_eq!(manager.total_assets(), Amount::new(1_000));
/// ```
pub struct AllocationManager {
    id: Uuid,
    asset: AssetId,
    state: Mutex<ManagerState>,
    price_source: Arc<dyn ExecutionPriceSource>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for AllocationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationManager")
            .field("id", &self.id)
            .field("asset", &self.asset)
            .finish_non_exhaustive()
    }
}

impl AllocationManager {
    /// Creates a manager with no backends.
    ///
    /// Returns the manager with its only pool and admin capabilities.
    pub fn new(
        config: ManagerConfig,
        price_source: Arc<dyn ExecutionPriceSource>,
    ) -> Result<(Self, PoolCapability, AdminCapability), ManagerError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let (pool, admin) = auth::issue(id);
        let manager = Self {
            id,
            asset: config.asset.clone(),
            state: Mutex::new(ManagerState {
                registry: BackendRegistry::new(),
                targets: TargetAllocations::new(),
                params: ManagerParams::from(&config),
                idle: Amount::ZERO,
            }),
            price_source,
            events: Arc::new(TracingEventSink),
        };

        info!(manager_id = %id, asset = %manager.asset, "Allocation manager created");
        Ok((manager, pool, admin))
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Unique id of this manager.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Asset this manager operates on.
    #[must_use]
    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    // ------------------------------------------------------------------
    // Pool operations
    // ------------------------------------------------------------------

    /// Deposits `amount` across the backends according to fresh targets.
    ///
    /// The caller hands `amount` to the manager; whatever truncation leaves
    /// over stays in the idle balance.
    pub fn allocate(&self, cap: &PoolCapability, amount: Amount) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;
        if amount.is_zero() {
            return Err(ManagerError::ZeroAmount);
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.registry.is_empty() {
            return Err(ManagerError::NoBackendsAvailable);
        }

        let snapshots = state.registry.snapshot();
        let targets = recompute_targets(&snapshots, state.params.limits());
        let mut events = vec![targets_updated(&snapshots, &targets)];

        let mut mover = FundMover::new(&state.registry, state.idle);
        let result = mover
            .credit_idle(amount)
            .and_then(|()| deposit_by_weight(&mut mover, &snapshots, &targets, amount, &mut events));

        match result {
            Ok(()) => {
                state.idle = mover.commit();
                state.targets = targets;
                info!(
                    amount = %amount,
                    deposits = events.len() - 1,
                    idle = %state.idle,
                    "Allocation complete"
                );
            }
            Err(e) => {
                warn!(amount = %amount, error = %e, "Allocation failed");
                mover.rollback();
                return Err(e);
            }
        }

        drop(guard);
        self.publish(events);
        Ok(())
    }

    /// Withdraws `amount` proportionally to each backend's balance and
    /// forwards it to `receiver`.
    ///
    /// Does nothing when every backend is empty. Fails with
    /// [`ManagerError::InsufficientIdle`] if the withdrawn amount plus the idle
    /// balance cannot cover `amount`.
    pub fn withdraw_to(
        &self,
        cap: &PoolCapability,
        amount: Amount,
        receiver: &dyn AssetReceiver,
    ) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;
        if amount.is_zero() {
            return Err(ManagerError::ZeroAmount);
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let snapshots = state.registry.snapshot();
        let aggregate = total_balance(&snapshots)?;
        if aggregate.is_zero() {
            warn!(amount = %amount, "Withdrawal skipped: backends hold nothing");
            return Ok(());
        }

        let mut mover = FundMover::new(&state.registry, state.idle);
        let result = withdraw_proportionally(&mut mover, &snapshots, amount, aggregate)
            .and_then(|()| mover.debit_idle(amount));

        match result {
            Ok(()) => {
                state.idle = mover.commit();
            }
            Err(e) => {
                warn!(amount = %amount, error = %e, "Withdrawal failed");
                mover.rollback();
                return Err(e);
            }
        }
        drop(guard);

        receiver.receive(amount);
        info!(amount = %amount, "Withdrawal forwarded");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rebalancing
    // ------------------------------------------------------------------

    /// Moves capital towards fresh targets if the profitability gate approves.
    pub fn rebalance(&self) -> Result<RebalanceOutcome, ManagerError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let snapshots = state.registry.snapshot();
        let estimate = profitability::evaluate(
            &snapshots,
            &state.targets,
            state.params.gate(),
            self.price_source.unit_price(),
        )?;
        if !estimate.approved {
            let reason = estimate
                .skip_reason
                .map_or_else(|| "not approved".to_string(), |r| r.to_string());
            warn!(reason = %reason, "Rebalance rejected");
            return Err(ManagerError::RebalanceNotProfitable { reason });
        }

        let targets = recompute_targets(&snapshots, state.params.limits());
        let plan = plan_rebalance(&snapshots, &targets, estimate.total_tvl)?;
        let mut events = vec![targets_updated(&snapshots, &targets)];

        let mut mover = FundMover::new(&state.registry, state.idle);
        match execute_plan(&mut mover, &plan, &mut events) {
            Ok(()) => {
                state.idle = mover.commit();
                state.targets = targets;
            }
            Err(e) => {
                warn!(error = %e, "Rebalance failed");
                mover.rollback();
                return Err(e);
            }
        }

        info!(
            moves = plan.num_moves(),
            total_tvl = %plan.total_tvl,
            weekly_profit = %estimate.weekly_profit,
            unfunded_deficit = %plan.unfunded_deficit,
            "Rebalance complete"
        );
        drop(guard);
        self.publish(events);
        Ok(RebalanceOutcome { estimate, plan })
    }

    /// Returns true if [`rebalance`](Self::rebalance) would currently run.
    #[must_use]
    pub fn should_rebalance(&self) -> bool {
        self.estimate_rebalance().is_ok_and(|e| e.approved)
    }

    /// Runs the profitability gate without changing anything.
    pub fn estimate_rebalance(&self) -> Result<ProfitabilityEstimate, ManagerError> {
        let state = self.state.lock();
        let snapshots = state.registry.snapshot();
        profitability::evaluate(
            &snapshots,
            &state.targets,
            state.params.gate(),
            self.price_source.unit_price(),
        )
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Registers a backend and recomputes targets.
    pub fn add_backend(
        &self,
        cap: &AdminCapability,
        id: BackendId,
        backend: Arc<dyn YieldBackend>,
    ) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.registry.contains(&id) {
            return Err(ManagerError::BackendAlreadyExists(id));
        }
        let backend_asset = backend.asset();
        if backend_asset != self.asset {
            return Err(ManagerError::AssetMismatch {
                backend: id,
                expected: self.asset.clone(),
                actual: backend_asset,
            });
        }

        state.registry.insert(id.clone(), backend)?;
        let snapshots = state.registry.snapshot();
        state.targets = recompute_targets(&snapshots, state.params.limits());

        let events = vec![
            ManagerEvent::BackendAdded { backend: id.clone() },
            targets_updated(&snapshots, &state.targets),
        ];
        info!(backend = %id, backends = state.registry.len(), "Backend added");
        drop(guard);
        self.publish(events);
        Ok(())
    }

    /// Unregisters a backend and recomputes targets for the rest.
    ///
    /// The backend's balance is not withdrawn.
    pub fn remove_backend(
        &self,
        cap: &AdminCapability,
        id: &BackendId,
    ) -> Result<Arc<dyn YieldBackend>, ManagerError> {
        auth::authorize(cap, self.id)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let removed = state.registry.remove(id)?;

        let remaining_balance = removed.total_assets();
        if !remaining_balance.is_zero() {
            warn!(backend = %id, balance = %remaining_balance, "Removed backend still holds funds");
        }

        let mut events = vec![ManagerEvent::BackendRemoved { backend: id.clone() }];
        if state.registry.is_empty() {
            state.targets = TargetAllocations::new();
        } else {
            let snapshots = state.registry.snapshot();
            state.targets = recompute_targets(&snapshots, state.params.limits());
            events.push(targets_updated(&snapshots, &state.targets));
        }

        info!(backend = %id, backends = state.registry.len(), "Backend removed");
        drop(guard);
        self.publish(events);
        Ok(removed)
    }

    /// Sets the stored rebalance threshold.
    pub fn set_rebalance_threshold(&self, cap: &AdminCapability, bp: u32) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;
        if u128::from(bp) > BPS_DENOMINATOR {
            return Err(ManagerError::InvalidParameter {
                name: "rebalance_threshold_bp".to_string(),
                reason: format!("must not exceed {BPS_DENOMINATOR}, got {bp}"),
            });
        }
        self.state.lock().params.rebalance_threshold_bp = bp;
        info!(rebalance_threshold_bp = bp, "Parameter updated");
        Ok(())
    }

    /// Sets the minimum TVL for rebalancing.
    pub fn set_min_tvl_for_rebalance(
        &self,
        cap: &AdminCapability,
        min_tvl: Amount,
    ) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;
        self.state.lock().params.min_tvl_for_rebalance = min_tvl;
        info!(min_tvl_for_rebalance = %min_tvl, "Parameter updated");
        Ok(())
    }

    /// Sets the safety multiplier on rebalance cost, in percent.
    pub fn set_gas_cost_multiplier(&self, cap: &AdminCapability, pct: u32) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;
        self.state.lock().params.gas_cost_multiplier_pct = pct;
        info!(gas_cost_multiplier_pct = pct, "Parameter updated");
        Ok(())
    }

    /// Sets the concentration cap and recomputes targets.
    pub fn set_max_allocation_per_backend(
        &self,
        cap: &AdminCapability,
        bp: u32,
    ) -> Result<(), ManagerError> {
        self.update_limits(cap, |params| params.max_allocation_per_backend_bp = bp)
    }

    /// Sets the participation floor and recomputes targets.
    pub fn set_min_allocation_threshold(
        &self,
        cap: &AdminCapability,
        bp: u32,
    ) -> Result<(), ManagerError> {
        self.update_limits(cap, |params| params.min_allocation_threshold_bp = bp)
    }

    fn update_limits(
        &self,
        cap: &AdminCapability,
        update: impl FnOnce(&mut ManagerParams),
    ) -> Result<(), ManagerError> {
        auth::authorize(cap, self.id)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut params = state.params;
        update(&mut params);
        validate_allocation_bounds(
            params.max_allocation_per_backend_bp,
            params.min_allocation_threshold_bp,
        )?;
        state.params = params;

        let mut events = Vec::new();
        if !state.registry.is_empty() {
            let snapshots = state.registry.snapshot();
            state.targets = recompute_targets(&snapshots, params.limits());
            events.push(targets_updated(&snapshots, &state.targets));
        }

        info!(
            max_allocation_per_backend_bp = params.max_allocation_per_backend_bp,
            min_allocation_threshold_bp = params.min_allocation_threshold_bp,
            "Allocation limits updated"
        );
        drop(guard);
        self.publish(events);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Sum of all backend balances. The idle balance is not included.
    #[must_use]
    pub fn total_assets(&self) -> Amount {
        let state = self.state.lock();
        state.registry.iter().fold(Amount::ZERO, |acc, e| {
            acc.checked_add(e.backend.total_assets()).unwrap_or(Amount::MAX)
        })
    }

    /// Number of registered backends.
    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Live balance, yield and stored weight of every backend.
    #[must_use]
    pub fn all_backends_info(&self) -> Vec<BackendInfo> {
        let state = self.state.lock();
        state
            .registry
            .iter()
            .map(|e| BackendInfo {
                id: e.id.clone(),
                name: e.backend.name().to_string(),
                balance: e.backend.total_assets(),
                apy: e.backend.apy(),
                target_weight: state.targets.get(&e.id),
            })
            .collect()
    }

    /// Stored target weight of `id`, zero if it has none.
    #[must_use]
    pub fn target_allocation(&self, id: &BackendId) -> BasisPoints {
        self.state.lock().targets.get(id)
    }

    /// Copy of the whole target table.
    #[must_use]
    pub fn target_allocations(&self) -> TargetAllocations {
        self.state.lock().targets.clone()
    }

    /// Current parameters.
    #[must_use]
    pub fn params(&self) -> ManagerParams {
        self.state.lock().params
    }

    /// Funds held by the manager and not deployed.
    #[must_use]
    pub fn idle_balance(&self) -> Amount {
        self.state.lock().idle
    }

    fn publish(&self, events: Vec<ManagerEvent>) {
        for event in &events {
            self.events.publish(self.id, event);
        }
    }
}

fn recompute_targets(snapshots: &[BackendSnapshot], limits: AllocationLimits) -> TargetAllocations {
    let yields: Vec<BasisPoints> = snapshots.iter().map(|s| s.apy).collect();
    let weights = compute_target_weights(&yields, limits);
    debug!(?weights, "Recomputed target weights");
    TargetAllocations::from_pairs(snapshots.iter().map(|s| s.id.clone()).zip(weights))
}

fn targets_updated(snapshots: &[BackendSnapshot], targets: &TargetAllocations) -> ManagerEvent {
    ManagerEvent::TargetAllocationsUpdated {
        weights: snapshots
            .iter()
            .map(|s| (s.id.clone(), targets.get(&s.id)))
            .collect(),
    }
}

fn deposit_by_weight(
    mover: &mut FundMover<'_>,
    snapshots: &[BackendSnapshot],
    targets: &TargetAllocations,
    amount: Amount,
    events: &mut Vec<ManagerEvent>,
) -> Result<(), ManagerError> {
    for snapshot in snapshots {
        let weight = targets.get(&snapshot.id);
        if weight.is_zero() {
            continue;
        }
        let share = amount
            .apply_bps(weight)
            .ok_or(ManagerError::ArithmeticOverflow)?;
        if share.is_zero() {
            continue;
        }
        mover.deposit(&snapshot.id, share)?;
        events.push(ManagerEvent::Allocated {
            backend: snapshot.id.clone(),
            amount: share,
        });
    }
    Ok(())
}

fn withdraw_proportionally(
    mover: &mut FundMover<'_>,
    snapshots: &[BackendSnapshot],
    amount: Amount,
    aggregate: Amount,
) -> Result<(), ManagerError> {
    for snapshot in snapshots {
        if snapshot.balance.is_zero() {
            continue;
        }
        let share = amount
            .mul_div_floor(snapshot.balance.as_u128(), aggregate.as_u128())
            .ok_or(ManagerError::ArithmeticOverflow)?;
        if share.is_zero() {
            continue;
        }
        mover.withdraw(&snapshot.id, share)?;
    }
    Ok(())
}

fn execute_plan(
    mover: &mut FundMover<'_>,
    plan: &RebalancePlan,
    events: &mut Vec<ManagerEvent>,
) -> Result<(), ManagerError> {
    for leg in &plan.legs {
        mover.withdraw(&leg.source, leg.surplus)?;
        for transfer in &leg.transfers {
            mover.deposit(&transfer.to, transfer.amount)?;
            events.push(ManagerEvent::Rebalanced {
                from: leg.source.clone(),
                to: transfer.to.clone(),
                amount: transfer.amount,
            });
        }
    }
    Ok(())
}
