//! Configuration traits for validation and loading.

use crate::error::ConfigError;

/// Trait for types that can be validated.
///
/// # Example
///
/// ```rust
/// use sluice_core::config::Validatable;
/// use sluice_core::error::ConfigError;
///
/// struct PoolConfig {
///     max_backends: u16,
/// }
///
/// impl Validatable for PoolConfig {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.max_backends == 0 {
///             return Err(ConfigError::invalid_value("max_backends", "cannot be 0"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for types that support environment variable overrides.
pub trait Configurable: Sized {
    /// Applies environment variable overrides to the configuration.
    ///
    /// Returns `ConfigError::InvalidEnvVar` when a variable is set but
    /// cannot be parsed.
    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError>;

    /// Returns the environment variable names that can override this configuration.
    fn env_var_names(prefix: &str) -> Vec<String>;
}

/// Reads `name` from the environment and parses it, if set.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the variable is set but does not parse.
pub fn parse_env_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
