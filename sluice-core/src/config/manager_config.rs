//! Allocation manager configuration.

use serde::{Deserialize, Serialize};

use super::traits::parse_env_var;
use super::{Configurable, Validatable};
use crate::error::ConfigError;
use crate::math::BPS_DENOMINATOR;
use crate::types::{Amount, AssetId};

/// Tunable parameters of an allocation manager.
///
/// All basis-point fields use 10 000 = 100 %.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Asset managed by this instance; every backend must accept it.
    pub asset: AssetId,
    /// Stored and reported rebalance threshold.
    #[serde(default = "default_rebalance_threshold_bp")]
    pub rebalance_threshold_bp: u32,
    /// Minimum TVL below which rebalancing is never profitable.
    #[serde(default = "default_min_tvl_for_rebalance")]
    pub min_tvl_for_rebalance: Amount,
    /// Safety multiplier applied to the estimated execution cost, in percent.
    #[serde(default = "default_gas_cost_multiplier_pct")]
    pub gas_cost_multiplier_pct: u32,
    /// Concentration cap per backend.
    #[serde(default = "default_max_allocation_per_backend_bp")]
    pub max_allocation_per_backend_bp: u32,
    /// Participation floor; smaller shares are clamped to zero.
    #[serde(default = "default_min_allocation_threshold_bp")]
    pub min_allocation_threshold_bp: u32,
}

fn default_rebalance_threshold_bp() -> u32 {
    100
}

fn default_min_tvl_for_rebalance() -> Amount {
    Amount::new(1_000_000_000)
}

fn default_gas_cost_multiplier_pct() -> u32 {
    200
}

fn default_max_allocation_per_backend_bp() -> u32 {
    5_000
}

fn default_min_allocation_threshold_bp() -> u32 {
    1_000
}

impl ManagerConfig {
    /// Creates a configuration for `asset` with default parameters.
    #[must_use]
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            rebalance_threshold_bp: default_rebalance_threshold_bp(),
            min_tvl_for_rebalance: default_min_tvl_for_rebalance(),
            gas_cost_multiplier_pct: default_gas_cost_multiplier_pct(),
            max_allocation_per_backend_bp: default_max_allocation_per_backend_bp(),
            min_allocation_threshold_bp: default_min_allocation_threshold_bp(),
        }
    }

    /// Sets the minimum TVL for rebalancing.
    #[must_use]
    pub fn with_min_tvl_for_rebalance(mut self, min_tvl: Amount) -> Self {
        self.min_tvl_for_rebalance = min_tvl;
        self
    }

    /// Sets the execution cost multiplier.
    #[must_use]
    pub fn with_gas_cost_multiplier_pct(mut self, pct: u32) -> Self {
        self.gas_cost_multiplier_pct = pct;
        self
    }

    /// Sets the concentration cap and participation floor.
    #[must_use]
    pub fn with_allocation_bounds(mut self, max_bp: u32, min_bp: u32) -> Self {
        self.max_allocation_per_backend_bp = max_bp;
        self.min_allocation_threshold_bp = min_bp;
        self
    }
}

/// Checks a cap/floor pair. Shared with the runtime parameter setters.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` naming the offending field.
pub fn validate_allocation_bounds(max_bp: u32, min_bp: u32) -> Result<(), ConfigError> {
    if max_bp == 0 || u128::from(max_bp) > BPS_DENOMINATOR {
        return Err(ConfigError::invalid_value(
            "max_allocation_per_backend_bp",
            format!("must be between 1 and {BPS_DENOMINATOR}, got {max_bp}"),
        ));
    }
    if min_bp > max_bp {
        return Err(ConfigError::invalid_value(
            "min_allocation_threshold_bp",
            format!("must not exceed the per-backend cap {max_bp}, got {min_bp}"),
        ));
    }
    Ok(())
}

impl Validatable for ManagerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if u128::from(self.rebalance_threshold_bp) > BPS_DENOMINATOR {
            return Err(ConfigError::invalid_value(
                "rebalance_threshold_bp",
                format!("must not exceed {BPS_DENOMINATOR}"),
            ));
        }
        validate_allocation_bounds(
            self.max_allocation_per_backend_bp,
            self.min_allocation_threshold_bp,
        )
    }
}

impl Configurable for ManagerConfig {
    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        if let Some(asset) = parse_env_var(&format!("{prefix}_ASSET"))? {
            self.asset = asset;
        }
        if let Some(v) = parse_env_var(&format!("{prefix}_REBALANCE_THRESHOLD_BP"))? {
            self.rebalance_threshold_bp = v;
        }
        if let Some(v) = parse_env_var(&format!("{prefix}_MIN_TVL_FOR_REBALANCE"))? {
            self.min_tvl_for_rebalance = v;
        }
        if let Some(v) = parse_env_var(&format!("{prefix}_GAS_COST_MULTIPLIER_PCT"))? {
            self.gas_cost_multiplier_pct = v;
        }
        if let Some(v) = parse_env_var(&format!("{prefix}_MAX_ALLOCATION_PER_BACKEND_BP"))? {
            self.max_allocation_per_backend_bp = v;
        }
        if let Some(v) = parse_env_var(&format!("{prefix}_MIN_ALLOCATION_THRESHOLD_BP"))? {
            self.min_allocation_threshold_bp = v;
        }
        Ok(())
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "ASSET",
            "REBALANCE_THRESHOLD_BP",
            "MIN_TVL_FOR_REBALANCE",
            "GAS_COST_MULTIPLIER_PCT",
            "MAX_ALLOCATION_PER_BACKEND_BP",
            "MIN_ALLOCATION_THRESHOLD_BP",
        ]
        .iter()
        .map(|name| format!("{prefix}_{name}"))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFormat, ConfigLoader};

    fn usdc() -> AssetId {
        AssetId::new("USDC").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::new(usdc());
        assert_eq!(config.rebalance_threshold_bp, 100);
        assert_eq!(config.min_tvl_for_rebalance, Amount::new(1_000_000_000));
        assert_eq!(config.gas_cost_multiplier_pct, 200);
        assert_eq!(config.max_allocation_per_backend_bp, 5_000);
        assert_eq!(config.min_allocation_threshold_bp, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_uses_serde_defaults() {
        let yaml = r"
asset: USDC
max_allocation_per_backend_bp: 6000
";
        let config: ManagerConfig = ConfigLoader::new()
            .load_str(yaml, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.asset, usdc());
        assert_eq!(config.max_allocation_per_backend_bp, 6_000);
        assert_eq!(config.min_allocation_threshold_bp, 1_000);
    }

    #[test]
    fn test_toml_amount_field() {
        let toml = r#"
asset = "USDC"
min_tvl_for_rebalance = 5000
"#;
        let config: ManagerConfig = ConfigLoader::new()
            .load_str(toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.min_tvl_for_rebalance, Amount::new(5_000));
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let zero_cap = ManagerConfig::new(usdc()).with_allocation_bounds(0, 0);
        assert!(zero_cap.validate().is_err());

        let over_cap = ManagerConfig::new(usdc()).with_allocation_bounds(10_001, 0);
        assert!(over_cap.validate().is_err());

        let floor_above_cap = ManagerConfig::new(usdc()).with_allocation_bounds(3_000, 4_000);
        let err = floor_above_cap.validate().unwrap_err();
        assert!(err.to_string().contains("min_allocation_threshold_bp"));
    }

    #[test]
    fn test_validate_rejects_threshold_above_full() {
        let mut config = ManagerConfig::new(usdc());
        config.rebalance_threshold_bp = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_names() {
        let names = ManagerConfig::env_var_names("SLUICE");
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"SLUICE_GAS_COST_MULTIPLIER_PCT".to_string()));
    }

    #[test]
    fn test_env_overrides_noop_when_unset() {
        let mut config = ManagerConfig::new(usdc());
        config
            .apply_env_overrides("SLUICE_TEST_UNSET_PREFIX_7F3A")
            .unwrap();
        assert_eq!(config, ManagerConfig::new(usdc()));
    }
}
