//! Error types and handling framework.
//!
//! - [`BackendError`] - failures reported by a yield backend's capability calls
//! - [`ConfigError`] - configuration loading and validation failures
//!
//! Errors raised by the allocation manager itself live in `sluice-engine`
//! and wrap [`BackendError`] as their source.

mod backend;
mod config;

pub use backend::BackendError;
pub use config::ConfigError;
