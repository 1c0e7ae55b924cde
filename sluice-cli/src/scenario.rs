//! Simulation scenario file format.
//!
//! A scenario describes a manager configuration, a set of simulated backends
//! and a list of steps to run against them:
//!
//! ```yaml
//! manager:
//!   asset: USDC
//! execution_price: 1
//! backends:
//!   - id: aave
//!     apy_bp: 420
//! steps:
//!   - action: allocate
//!     amount: 5000000
//!   - action: rebalance
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use sluice_core::config::{Configurable, ManagerConfig, Validatable, parse_env_var};
use sluice_core::error::ConfigError;
use sluice_core::types::{Amount, BackendId};

/// Complete simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Manager parameters.
    pub manager: ManagerConfig,
    /// Price of one execution unit.
    #[serde(default = "default_execution_price")]
    pub execution_price: Amount,
    /// Backends registered before the first step.
    #[serde(default)]
    pub backends: Vec<BackendSpec>,
    /// Steps to run, in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_execution_price() -> Amount {
    Amount::new(1)
}

/// A simulated backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Registry handle.
    pub id: BackendId,
    /// Display name, defaults to the handle.
    #[serde(default)]
    pub name: Option<String>,
    /// Initial yield.
    pub apy_bp: u32,
    /// Initial balance.
    #[serde(default)]
    pub balance: Amount,
}

impl BackendSpec {
    /// Display name of the backend.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// One scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Allocate fresh capital.
    Allocate {
        /// Amount handed to the manager.
        amount: Amount,
    },
    /// Withdraw to the scenario wallet.
    Withdraw {
        /// Amount forwarded to the wallet.
        amount: Amount,
    },
    /// Run the profitability gate only.
    Estimate,
    /// Rebalance if profitable.
    Rebalance,
    /// Change a backend's yield.
    SetApy {
        /// Backend to change.
        backend: BackendId,
        /// New yield.
        apy_bp: u32,
    },
    /// Credit simple interest on every backend.
    Accrue {
        /// Days of interest.
        days: u32,
    },
    /// Make a backend reject calls.
    SetFailure {
        /// Backend to change.
        backend: BackendId,
        /// Reject deposits.
        #[serde(default)]
        deposits: bool,
        /// Reject withdrawals.
        #[serde(default)]
        withdrawals: bool,
    },
    /// Register another backend.
    AddBackend(BackendSpec),
    /// Unregister a backend.
    RemoveBackend {
        /// Backend to remove.
        backend: BackendId,
    },
    /// Change the concentration cap and participation floor.
    SetLimits {
        /// New cap.
        max_allocation_per_backend_bp: u32,
        /// New floor.
        min_allocation_threshold_bp: u32,
    },
    /// Print the current state.
    Report,
}

impl Step {
    /// Short label for reports.
    pub fn label(&self) -> String {
        match self {
            Self::Allocate { amount } => format!("allocate {amount}"),
            Self::Withdraw { amount } => format!("withdraw {amount}"),
            Self::Estimate => "estimate".to_string(),
            Self::Rebalance => "rebalance".to_string(),
            Self::SetApy { backend, apy_bp } => format!("set_apy {backend} {apy_bp}bp"),
            Self::Accrue { days } => format!("accrue {days}d"),
            Self::SetFailure {
                backend,
                deposits,
                withdrawals,
            } => format!("set_failure {backend} deposits={deposits} withdrawals={withdrawals}"),
            Self::AddBackend(spec) => format!("add_backend {}", spec.id),
            Self::RemoveBackend { backend } => format!("remove_backend {backend}"),
            Self::SetLimits {
                max_allocation_per_backend_bp,
                min_allocation_threshold_bp,
            } => format!(
                "set_limits cap={max_allocation_per_backend_bp}bp floor={min_allocation_threshold_bp}bp"
            ),
            Self::Report => "report".to_string(),
        }
    }
}

impl Validatable for Scenario {
    fn validate(&self) -> Result<(), ConfigError> {
        self.manager.validate()?;

        let mut known = HashSet::new();
        for spec in &self.backends {
            if !known.insert(spec.id.clone()) {
                return Err(ConfigError::invalid_value(
                    "backends",
                    format!("duplicate backend id '{}'", spec.id),
                ));
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::AddBackend(spec) => {
                    known.insert(spec.id.clone());
                }
                Step::SetApy { backend, .. }
                | Step::SetFailure { backend, .. }
                | Step::RemoveBackend { backend } => {
                    if !known.contains(backend) {
                        return Err(ConfigError::invalid_value(
                            format!("steps[{index}]"),
                            format!("unknown backend '{backend}'"),
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Configurable for Scenario {
    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.manager.apply_env_overrides(prefix)?;
        if let Some(price) = parse_env_var(&format!("{prefix}_EXECUTION_PRICE"))? {
            self.execution_price = price;
        }
        Ok(())
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        let mut names = ManagerConfig::env_var_names(prefix);
        names.push(format!("{prefix}_EXECUTION_PRICE"));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::config::{ConfigFormat, ConfigLoader};

    const BASIC: &str = r"
manager:
  asset: USDC
  min_tvl_for_rebalance: 1000
execution_price: 2
backends:
  - id: aave
    name: Aave v3
    apy_bp: 420
  - id: comp
    apy_bp: 380
    balance: 500
steps:
  - action: allocate
    amount: 1000000
  - action: set_apy
    backend: comp
    apy_bp: 900
  - action: add_backend
    id: morpho
    apy_bp: 700
  - action: set_failure
    backend: morpho
    deposits: true
  - action: rebalance
  - action: report
";

    fn load(yaml: &str) -> Result<Scenario, ConfigError> {
        let scenario: Scenario = ConfigLoader::new().load_str(yaml, ConfigFormat::Yaml)?;
        ConfigLoader::new().finish(scenario)
    }

    #[test]
    fn test_parse_basic_scenario() {
        let scenario = load(BASIC).unwrap();
        assert_eq!(scenario.execution_price, Amount::new(2));
        assert_eq!(scenario.backends.len(), 2);
        assert_eq!(scenario.backends[0].display_name(), "Aave v3");
        assert_eq!(scenario.backends[1].display_name(), "comp");
        assert_eq!(scenario.backends[1].balance, Amount::new(500));
        assert_eq!(
            scenario.steps[0],
            Step::Allocate {
                amount: Amount::new(1_000_000)
            }
        );
        assert!(matches!(
            scenario.steps[3],
            Step::SetFailure {
                deposits: true,
                withdrawals: false,
                ..
            }
        ));
        assert_eq!(scenario.steps[4], Step::Rebalance);
    }

    #[test]
    fn test_defaults() {
        let scenario = load("manager:\n  asset: USDC\n").unwrap();
        assert_eq!(scenario.execution_price, Amount::new(1));
        assert!(scenario.backends.is_empty());
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn test_duplicate_backend_rejected() {
        let yaml = r"
manager:
  asset: USDC
backends:
  - id: aave
    apy_bp: 1
  - id: aave
    apy_bp: 2
";
        let err = load(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate backend id"));
    }

    #[test]
    fn test_unknown_backend_in_step_rejected() {
        let yaml = r"
manager:
  asset: USDC
steps:
  - action: set_apy
    backend: ghost
    apy_bp: 10
";
        let err = load(yaml).unwrap_err();
        assert!(err.to_string().contains("steps[0]"));
    }

    #[test]
    fn test_invalid_manager_limits_rejected() {
        let yaml = r"
manager:
  asset: USDC
  max_allocation_per_backend_bp: 1000
  min_allocation_threshold_bp: 2000
";
        assert!(load(yaml).is_err());
    }

    #[test]
    fn test_step_labels() {
        assert_eq!(
            Step::Allocate {
                amount: Amount::new(5)
            }
            .label(),
            "allocate 5"
        );
        assert_eq!(Step::Accrue { days: 7 }.label(), "accrue 7d");
    }

    #[test]
    fn test_env_var_names_include_price() {
        let names = Scenario::env_var_names("SLUICE");
        assert!(names.contains(&"SLUICE_EXECUTION_PRICE".to_string()));
        assert!(names.contains(&"SLUICE_ASSET".to_string()));
    }
}
