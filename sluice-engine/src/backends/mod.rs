//! In-memory backend and receiver implementations.
//!
//! Used by the simulator binary and by tests; real protocol adapters live
//! outside this workspace and only need to implement
//! [`YieldBackend`](sluice_core::traits::YieldBackend).

mod simulated;
mod wallet;

pub use simulated::SimulatedBackend;
pub use wallet::Wallet;
