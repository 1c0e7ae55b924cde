//! Scenario simulation command.
//!
//! Builds an allocation manager over simulated backends, runs every step of
//! a scenario and prints the outcome of each step together with the final
//! state.

#![allow(clippy::disallowed_types)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use sluice_core::config::ConfigLoader;
use sluice_core::traits::FixedExecutionPrice;
use sluice_core::types::{Amount, AssetId, BackendId, BasisPoints};
use sluice_engine::backends::{SimulatedBackend, Wallet};
use sluice_engine::{
    AdminCapability, AllocationManager, BackendInfo, EventLog, FanoutSink, PoolCapability,
    TracingEventSink,
};

use crate::SimulateArgs;
use crate::scenario::{BackendSpec, Scenario, Step};

/// Runs the scenario named by `args`.
///
/// # Errors
///
/// Returns error if the scenario cannot be loaded, or if a step fails while
/// `--fail-fast` is set.
pub fn run(args: SimulateArgs, env_prefix: &str) -> Result<()> {
    let scenario: Scenario = ConfigLoader::new()
        .with_env_prefix(env_prefix)
        .load_validated(&args.scenario)
        .with_context(|| format!("Failed to load scenario: {}", args.scenario))?;

    info!(
        scenario = %args.scenario,
        backends = scenario.backends.len(),
        steps = scenario.steps.len(),
        "Starting simulation"
    );

    let mut sim = Simulation::new(&scenario)?;
    let steps = run_steps(&mut sim, &scenario.steps, args.fail_fast)?;

    let summary = sim.summary(steps);

    if let Some(path) = &args.events_file {
        let lines = sim.log.to_json_lines()?;
        std::fs::write(path, lines).with_context(|| format!("Failed to write {path}"))?;
        info!(path = %path, events = sim.log.len(), "Events written");
    }

    let output = match args.output.as_str() {
        "json" => serde_json::to_string_pretty(&summary)?,
        _ => summary_to_table(&summary),
    };
    println!("{output}");

    info!("Simulation completed");
    Ok(())
}

fn run_steps(sim: &mut Simulation, steps: &[Step], fail_fast: bool) -> Result<Vec<StepResult>> {
    let mut results = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let outcome = sim.apply(step);
        let ok = outcome.is_ok();
        let detail = outcome.unwrap_or_else(|e| format!("error: {e:#}"));
        if !ok {
            warn!(step = index, action = %step.label(), error = %detail, "Step failed");
            if fail_fast {
                anyhow::bail!("step {index} ({}) failed: {detail}", step.label());
            }
        }
        results.push(StepResult {
            index,
            action: step.label(),
            ok,
            detail,
        });
    }
    Ok(results)
}

struct Simulation {
    manager: AllocationManager,
    pool: PoolCapability,
    admin: AdminCapability,
    backends: HashMap<BackendId, Arc<SimulatedBackend>>,
    wallet: Wallet,
    log: Arc<EventLog>,
    scenario_asset: AssetId,
}

impl Simulation {
    fn new(scenario: &Scenario) -> Result<Self> {
        let price = Arc::new(FixedExecutionPrice::new(scenario.execution_price));
        let (manager, pool, admin) = AllocationManager::new(scenario.manager.clone(), price)?;

        let log = Arc::new(EventLog::new());
        let sink = FanoutSink::new()
            .with(log.clone())
            .with(Arc::new(TracingEventSink));
        let manager = manager.with_event_sink(Arc::new(sink));

        let mut sim = Self {
            manager,
            pool,
            admin,
            backends: HashMap::new(),
            wallet: Wallet::new(),
            log,
            scenario_asset: scenario.manager.asset.clone(),
        };
        for spec in &scenario.backends {
            sim.add_backend(spec)?;
        }
        Ok(sim)
    }

    fn add_backend(&mut self, spec: &BackendSpec) -> Result<()> {
        let backend = Arc::new(
            SimulatedBackend::new(
                spec.display_name(),
                self.scenario_asset.clone(),
                BasisPoints::new(spec.apy_bp),
            )
            .with_balance(spec.balance),
        );
        self.manager
            .add_backend(&self.admin, spec.id.clone(), backend.clone())?;
        self.backends.insert(spec.id.clone(), backend);
        Ok(())
    }

    fn backend(&self, id: &BackendId) -> Result<&Arc<SimulatedBackend>> {
        self.backends
            .get(id)
            .with_context(|| format!("unknown backend '{id}'"))
    }

    fn apply(&mut self, step: &Step) -> Result<String> {
        match step {
            Step::Allocate { amount } => {
                self.manager.allocate(&self.pool, *amount)?;
                Ok(format!("idle {}", self.manager.idle_balance()))
            }
            Step::Withdraw { amount } => {
                self.manager.withdraw_to(&self.pool, *amount, &self.wallet)?;
                Ok(format!("wallet {}", self.wallet.balance()))
            }
            Step::Estimate => {
                let estimate = self.manager.estimate_rebalance()?;
                Ok(format!(
                    "approved={} weekly_profit={} threshold={} moves={}",
                    estimate.approved,
                    estimate.weekly_profit,
                    estimate.threshold,
                    estimate.num_moves
                ))
            }
            Step::Rebalance => {
                let outcome = self.manager.rebalance()?;
                Ok(format!(
                    "{} moves, weekly_profit={}",
                    outcome.plan.num_moves(),
                    outcome.estimate.weekly_profit
                ))
            }
            Step::SetApy { backend, apy_bp } => {
                self.backend(backend)?.set_apy(BasisPoints::new(*apy_bp));
                Ok(format!("{backend} now {}", BasisPoints::new(*apy_bp)))
            }
            Step::Accrue { days } => {
                let mut total = Amount::ZERO;
                for backend in self.backends.values() {
                    total = total.checked_add(backend.accrue(*days)).unwrap_or(Amount::MAX);
                }
                Ok(format!("interest {total}"))
            }
            Step::SetFailure {
                backend,
                deposits,
                withdrawals,
            } => {
                let sim = self.backend(backend)?;
                sim.set_fail_deposits(*deposits);
                sim.set_fail_withdrawals(*withdrawals);
                Ok(String::new())
            }
            Step::AddBackend(spec) => {
                self.add_backend(spec)?;
                Ok(format!("{} backends", self.manager.backend_count()))
            }
            Step::RemoveBackend { backend } => {
                let removed = self.manager.remove_backend(&self.admin, backend)?;
                self.backends.remove(backend);
                Ok(format!("left {} behind", removed.total_assets()))
            }
            Step::SetLimits {
                max_allocation_per_backend_bp,
                min_allocation_threshold_bp,
            } => {
                // raise the cap first so an intermediate floor > cap is never set
                self.manager
                    .set_max_allocation_per_backend(&self.admin, 10_000)?;
                self.manager
                    .set_min_allocation_threshold(&self.admin, *min_allocation_threshold_bp)?;
                self.manager
                    .set_max_allocation_per_backend(&self.admin, *max_allocation_per_backend_bp)?;
                Ok(String::new())
            }
            Step::Report => Ok(state_line(&self.manager.all_backends_info())),
        }
    }

    fn summary(&self, steps: Vec<StepResult>) -> SimulationSummary {
        SimulationSummary {
            manager_id: self.manager.id().to_string(),
            asset: self.manager.asset().to_string(),
            steps,
            backends: self.manager.all_backends_info(),
            total_assets: self.manager.total_assets(),
            idle_balance: self.manager.idle_balance(),
            wallet_balance: self.wallet.balance(),
            events: self.log.len(),
        }
    }
}

fn state_line(info: &[BackendInfo]) -> String {
    info.iter()
        .map(|b| format!("{}={}@{}%", b.id, b.balance, b.target_percent()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Serialize)]
struct StepResult {
    index: usize,
    action: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    manager_id: String,
    asset: String,
    steps: Vec<StepResult>,
    backends: Vec<BackendInfo>,
    total_assets: Amount,
    idle_balance: Amount,
    wallet_balance: Amount,
    events: usize,
}

fn summary_to_table(summary: &SimulationSummary) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str("╔══════════════════════════════════════════════════════════════════════╗\n");
    out.push_str("║                          SIMULATION RESULTS                          ║\n");
    out.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");
    for step in &summary.steps {
        let mark = if step.ok { "ok " } else { "ERR" };
        let _ = writeln!(
            out,
            "║ {:>3} {} {:<28} {:<34} ║",
            step.index,
            mark,
            truncate(&step.action, 28),
            truncate(&step.detail, 34)
        );
    }
    out.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");
    for backend in &summary.backends {
        let _ = writeln!(
            out,
            "║ {:<16} {:>22} {:>9}% apy {:>9}% target ║",
            truncate(&backend.id.to_string(), 16),
            backend.balance,
            backend.apy_percent(),
            backend.target_percent().round_dp(2)
        );
    }
    out.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");
    let _ = writeln!(out, "║ Total assets:   {:>52} ║", summary.total_assets);
    let _ = writeln!(out, "║ Idle balance:   {:>52} ║", summary.idle_balance);
    let _ = writeln!(out, "║ Wallet balance: {:>52} ║", summary.wallet_balance);
    let _ = writeln!(out, "║ Events:         {:>52} ║", summary.events);
    out.push_str("╚══════════════════════════════════════════════════════════════════════╝\n");

    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}
