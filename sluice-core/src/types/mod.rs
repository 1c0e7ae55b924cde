//! NewType wrappers for allocation primitives.
//!
//! This module provides type-safe wrappers so that asset amounts, basis-point
//! shares and backend handles cannot be mixed up at compile time.
//!
//! # Types
//!
//! - [`Amount`] - Asset amounts in integer base units
//! - [`BasisPoints`] - Weights and yields (10 000 = 100 %)
//! - [`BackendId`] - Registered backend handles
//! - [`AssetId`] - Identifier of the managed asset

mod amount;
mod basis_points;
mod identifiers;

pub use amount::Amount;
pub use basis_points::BasisPoints;
pub use identifiers::{AssetId, BackendId};

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Identifier is empty
    #[error("{kind} cannot be empty")]
    EmptyIdentifier {
        /// Which identifier kind was empty.
        kind: &'static str,
    },

    /// Identifier contains unsupported characters
    #[error("invalid {kind} format: {value}")]
    InvalidIdentifier {
        /// Which identifier kind was rejected.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Basis points exceed 100 %
    #[error("basis points {0} exceed 10000")]
    BasisPointsOutOfRange(u32),
}
