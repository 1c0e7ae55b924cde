//! # Sluice Core
//!
//! Core types, traits, and configuration for the Sluice yield allocation manager.
//!
//! This crate provides:
//! - `NewType` wrappers for allocation primitives (Amount, `BasisPoints`, `BackendId`, `AssetId`)
//! - Overflow-safe fixed-point helpers for basis-point arithmetic
//! - Error types for backend calls, configuration and validation
//! - Capability traits implemented by yield backends, price sources and receivers
//! - Configuration management with YAML/TOML/JSON support and environment variable overrides

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Core type definitions and 'NewType' wrappers
pub mod types;

/// Fixed-point helpers
pub mod math;

/// Error types and handling
pub mod error;

/// Capability trait definitions
pub mod traits;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::math::*;
    pub use crate::traits::*;
    pub use crate::types::*;
}
