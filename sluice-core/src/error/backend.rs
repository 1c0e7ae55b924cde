//! Backend capability error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Amount;

/// Error returned when a yield backend rejects a deposit or withdrawal.
///
/// Adapters map the wrapped protocol's rejection into one of these variants,
/// keeping the underlying reason instead of discarding it.
///
/// # Examples
///
/// ```
/// use sluice_core::error::BackendError;
/// use sluice_core::types::Amount;
///
/// let error = BackendError::deposit_failed(Amount::new(500), "supply cap reached");
/// assert!(error.to_string().contains("supply cap reached"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// The wrapped source rejected a deposit.
    #[error("[Backend] Deposit of {amount} failed: {reason}")]
    DepositFailed {
        /// Amount that was being deposited.
        amount: Amount,
        /// Reason reported by the wrapped source.
        reason: String,
    },

    /// The wrapped source rejected a withdrawal.
    #[error("[Backend] Withdrawal of {amount} failed: {reason}")]
    WithdrawFailed {
        /// Amount that was being withdrawn.
        amount: Amount,
        /// Reason reported by the wrapped source.
        reason: String,
    },
}

impl BackendError {
    /// Creates a deposit failure.
    #[must_use]
    pub fn deposit_failed(amount: Amount, reason: impl Into<String>) -> Self {
        Self::DepositFailed {
            amount,
            reason: reason.into(),
        }
    }

    /// Creates a withdrawal failure.
    #[must_use]
    pub fn withdraw_failed(amount: Amount, reason: impl Into<String>) -> Self {
        Self::WithdrawFailed {
            amount,
            reason: reason.into(),
        }
    }

    /// Returns the amount involved in the rejected call.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        match self {
            Self::DepositFailed { amount, .. } | Self::WithdrawFailed { amount, .. } => *amount,
        }
    }
}
