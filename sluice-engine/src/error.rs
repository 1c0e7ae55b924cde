//! Allocation manager error types.

use thiserror::Error;

use sluice_core::error::{BackendError, ConfigError};
use sluice_core::types::{Amount, AssetId, BackendId};

/// Errors returned by [`AllocationManager`](crate::AllocationManager) operations.
///
/// Every error aborts the whole operation: no backend call, table update or
/// event from the failed operation remains in effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// A positive amount was required.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The operation needs at least one registered backend.
    #[error("no backends available")]
    NoBackendsAvailable,

    /// The backend handle is already registered.
    #[error("backend already exists: {0}")]
    BackendAlreadyExists(BackendId),

    /// The backend handle is not registered.
    #[error("backend not found: {0}")]
    BackendNotFound(BackendId),

    /// The profitability gate rejected the rebalance.
    #[error("rebalance not profitable: {reason}")]
    RebalanceNotProfitable {
        /// Why the gate rejected it.
        reason: String,
    },

    /// The presented capability does not belong to this manager or role.
    #[error("unauthorized caller")]
    Unauthorized,

    /// A backend rejected a deposit or withdrawal.
    #[error("backend call failed on {backend}: {source}")]
    BackendCallFailed {
        /// Backend that rejected the call.
        backend: BackendId,
        /// Underlying rejection.
        #[source]
        source: BackendError,
    },

    /// The backend operates on a different asset than the manager.
    #[error("backend {backend} uses asset {actual}, manager expects {expected}")]
    AssetMismatch {
        /// Backend being registered.
        backend: BackendId,
        /// Manager asset.
        expected: AssetId,
        /// Backend asset.
        actual: AssetId,
    },

    /// The manager does not hold enough undeployed funds for a transfer.
    #[error("insufficient idle balance: required {required}, available {available}")]
    InsufficientIdle {
        /// Amount the transfer needed.
        required: Amount,
        /// Idle balance at the time.
        available: Amount,
    },

    /// A parameter update was rejected.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Rejection reason.
        reason: String,
    },

    /// An intermediate amount overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl ManagerError {
    /// Returns true if the error came from a backend rejecting a call.
    #[must_use]
    pub const fn is_backend_failure(&self) -> bool {
        matches!(self, Self::BackendCallFailed { .. })
    }

    /// Returns true if resubmitting the same call later could succeed
    /// without any administrative change.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RebalanceNotProfitable { .. }
                | Self::BackendCallFailed { .. }
                | Self::InsufficientIdle { .. }
        )
    }
}

impl From<ConfigError> for ManagerError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::InvalidValue { field, reason } => Self::InvalidParameter {
                name: field,
                reason,
            },
            other => Self::InvalidParameter {
                name: "config".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_backend_call_failed_keeps_source() {
        let err = ManagerError::BackendCallFailed {
            backend: BackendId::new("aave").unwrap(),
            source: BackendError::deposit_failed(Amount::new(10), "frozen"),
        };
        assert!(err.is_backend_failure());
        assert!(err.to_string().contains("aave"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("frozen"));
    }

    #[test]
    fn test_is_transient() {
        assert!(
            ManagerError::RebalanceNotProfitable {
                reason: "fewer than 2 backends".to_string()
            }
            .is_transient()
        );
        assert!(!ManagerError::Unauthorized.is_transient());
        assert!(!ManagerError::ZeroAmount.is_transient());
    }

    #[test]
    fn test_from_config_error() {
        let err: ManagerError =
            ConfigError::invalid_value("max_allocation_per_backend_bp", "too large").into();
        assert_eq!(
            err,
            ManagerError::InvalidParameter {
                name: "max_allocation_per_backend_bp".to_string(),
                reason: "too large".to_string(),
            }
        );
    }
}
