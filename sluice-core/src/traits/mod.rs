//! Capability trait definitions.
//!
//! The allocation manager talks to the outside world only through these
//! traits:
//! - [`YieldBackend`] - a yield source that accepts deposits and withdrawals
//! - [`ExecutionPriceSource`] - current price of one execution unit
//! - [`AssetReceiver`] - destination of forwarded withdrawals

mod backend;
mod price;
mod receiver;

pub use backend::YieldBackend;
pub use price::{ExecutionPriceSource, FixedExecutionPrice};
pub use receiver::AssetReceiver;
