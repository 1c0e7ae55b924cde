//! # Sluice Engine
//!
//! Allocation and rebalancing engine for the Sluice yield manager.
//!
//! This crate provides:
//! - Backend registry with constant-time membership and removal
//! - Target weight calculation with concentration cap and participation floor
//! - Excess/deficit rebalance planning
//! - Profitability gate comparing weekly gain against execution cost
//! - Journaled fund movement with compensation on failure
//! - Capability tokens for the pool and admin roles
//! - Event publication through pluggable sinks
//!
//! # Architecture
//!
//! [`AllocationManager`] is the only stateful component. Each operation reads
//! every backend once, derives weights and plans from that snapshot, and
//! executes through a [`FundMover`]:
//!
//! ```text
//! allocate     -> compute_target_weights -> FundMover::deposit (per weight)
//! withdraw_to  -> FundMover::withdraw (per balance share) -> AssetReceiver
//! rebalance    -> profitability::evaluate -> compute_target_weights
//!              -> plan_rebalance -> FundMover (withdraw surplus, deposit need)
//! ```
//!
//! # Backends
//!
//! - [`backends::SimulatedBackend`] - In-memory backend for simulation and tests
//! - [`backends::Wallet`] - In-memory receiver

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Allow HashMap - it's appropriate for many use cases
#![allow(clippy::disallowed_types)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_pass_by_value)]
#![cfg_attr(test, allow(clippy::indexing_slicing))]

mod allocation;
mod auth;
pub mod backends;
mod error;
pub mod events;
mod manager;
mod mover;
mod planner;
pub mod profitability;
mod registry;

pub use allocation::{AllocationLimits, TargetAllocations, compute_target_weights};
pub use auth::{AdminCapability, PoolCapability};
pub use error::ManagerError;
pub use events::{EventLog, EventSink, FanoutSink, ManagerEvent, RecordedEvent, TracingEventSink};
pub use manager::{AllocationManager, BackendInfo, ManagerParams, RebalanceOutcome};
pub use mover::{FundMover, JournalEntry};
pub use planner::{ExcessLeg, Move, RebalancePlan, Transfer, plan_rebalance};
pub use profitability::{GateParams, ProfitabilityEstimate, SkipReason, UNITS_PER_MOVE};
pub use registry::{BackendEntry, BackendRegistry, BackendSnapshot};
