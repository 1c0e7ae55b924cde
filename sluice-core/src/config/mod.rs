//! Configuration management module.
//!
//! This module provides:
//! - YAML, TOML and JSON configuration file formats
//! - Validation with descriptive error messages
//! - Environment variable overrides (`SLUICE_*` by convention)
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_core::config::{ConfigLoader, ManagerConfig};
//!
//! let config: ManagerConfig = ConfigLoader::new()
//!     .with_env_prefix("SLUICE")
//!     .load_validated("sluice.yaml")?;
//! ```

mod loader;
mod manager_config;
mod traits;

pub use loader::{ConfigFormat, ConfigLoader};
pub use manager_config::{ManagerConfig, validate_allocation_bounds};
pub use traits::{Configurable, Validatable, parse_env_var};
