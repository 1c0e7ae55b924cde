//! Yield backend capability trait.
//!
//! # Architecture
//!
//! Each external yield protocol is wrapped by a thin adapter implementing
//! [`YieldBackend`]. The manager never caches what a backend reports: balance
//! and yield are queried live at the start of every operation.
//!
//! # Example
//!
//! ```
//! use sluice_core::error::BackendError;
//! use sluice_core::traits::YieldBackend;
//! use sluice_core::types::{Amount, AssetId, BasisPoints};
//!
//! struct NullBackend {
//!     asset: AssetId,
//! }
//!
//! impl YieldBackend for NullBackend {
//!     fn deposit(&self, amount: Amount) -> Result<Amount, BackendError> {
//!         Err(BackendError::deposit_failed(amount, "read-only"))
//!     }
//!     fn withdraw(&self, amount: Amount) -> Result<Amount, BackendError> {
//!         Err(BackendError::withdraw_failed(amount, "read-only"))
//!     }
//!     fn total_assets(&self) -> Amount {
//!         Amount::ZERO
//!     }
//!     fn apy(&self) -> BasisPoints {
//!         BasisPoints::ZERO
//!     }
//!     fn name(&self) -> &str {
//!         "null"
//!     }
//!     fn asset(&self) -> AssetId {
//!         self.asset.clone()
//!     }
//! }
//! ```

use crate::error::BackendError;
use crate::types::{Amount, AssetId, BasisPoints};

/// Capability interface of a yield-generating backend.
///
/// Implementations must be cheap to call repeatedly and must not block on
/// anything other than the wrapped source itself. Calls are synchronous: the
/// manager holds its state lock for the whole operation.
pub trait YieldBackend: Send + Sync {
    /// Deposits `amount` of the managed asset, returning the shares minted.
    fn deposit(&self, amount: Amount) -> Result<Amount, BackendError>;

    /// Withdraws up to `amount`, returning the amount actually released.
    fn withdraw(&self, amount: Amount) -> Result<Amount, BackendError>;

    /// Current balance held on behalf of the manager.
    fn total_assets(&self) -> Amount;

    /// Current annualized yield.
    fn apy(&self) -> BasisPoints;

    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Asset accepted by this backend.
    fn asset(&self) -> AssetId;
}
