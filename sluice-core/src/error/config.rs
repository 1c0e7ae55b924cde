//! Errors raised while loading manager configs and scenarios.

use thiserror::Error;

use crate::config::ConfigFormat;

/// Failure to read, parse, override or validate a configuration.
///
/// ```
/// use sluice_core::error::ConfigError;
///
/// let error = ConfigError::invalid_value("min_allocation_threshold_bp", "exceeds the cap");
/// assert_eq!(
///     error.to_string(),
///     "[Config] min_allocation_threshold_bp: exceeds the cap"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value the manager cannot run with.
    #[error("[Config] {field}: {reason}")]
    InvalidValue {
        /// Offending field, e.g. `steps[3]` or `max_allocation_per_backend_bp`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The file could not be read.
    #[error("[Config] cannot read {path}: {reason}")]
    Unreadable {
        /// File that was requested.
        path: String,
        /// I/O error text.
        reason: String,
    },

    /// The file extension names no known format.
    #[error("[Config] {path}: expected a .yaml, .yml, .toml or .json file")]
    UnsupportedFormat {
        /// File that was requested.
        path: String,
    },

    /// The content is not valid for its format or does not match the schema.
    #[error("[Config] {origin} is not a valid {format} document: {reason}")]
    Malformed {
        /// File path, or `inline` for in-memory content.
        origin: String,
        /// Format the content was parsed as.
        format: ConfigFormat,
        /// Parser message.
        reason: String,
    },

    /// A value could not be rendered back into a document.
    #[error("[Config] cannot render {format}: {reason}")]
    Render {
        /// Target format.
        format: ConfigFormat,
        /// Serializer message.
        reason: String,
    },

    /// An override variable is set but does not parse.
    #[error("[Config] environment override {name}: {reason}")]
    InvalidEnvVar {
        /// Variable name, e.g. `SLUICE_ASSET`.
        name: String,
        /// Parse error text.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an [`InvalidValue`](Self::InvalidValue) error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field or variable the error points at, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } => Some(field),
            Self::InvalidEnvVar { name, .. } => Some(name),
            _ => None,
        }
    }
}
