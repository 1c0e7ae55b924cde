//! Config validation command.
//!
//! Loads a manager configuration or a full scenario, applies `SLUICE_*`
//! environment overrides and reports the effective values.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use sluice_core::config::{ConfigFormat, ConfigLoader, Configurable, ManagerConfig};

use crate::ValidateArgs;
use crate::scenario::Scenario;

/// Validates the file named by `args` and prints the effective configuration.
///
/// # Errors
///
/// Returns error if the file cannot be read, parsed or validated.
pub fn run(args: ValidateArgs, env_prefix: &str) -> Result<()> {
    let path = Path::new(&args.file);
    let loader = ConfigLoader::new().with_env_prefix(env_prefix);

    let (kind, rendered) = if args.scenario {
        let scenario: Scenario = loader
            .load_validated(path)
            .with_context(|| format!("Invalid scenario: {}", args.file))?;
        info!(
            backends = scenario.backends.len(),
            steps = scenario.steps.len(),
            "Scenario is valid"
        );
        ("scenario", ConfigFormat::Yaml.render(&scenario)?)
    } else {
        let config: ManagerConfig = loader
            .load_validated(path)
            .with_context(|| format!("Invalid manager config: {}", args.file))?;
        info!(asset = %config.asset, "Manager config is valid");
        ("manager config", ConfigFormat::Yaml.render(&config)?)
    };

    println!("{} OK: {}", kind, args.file);
    println!();
    println!("Effective values:");
    println!("{rendered}");

    if args.show_env {
        let names = if args.scenario {
            Scenario::env_var_names(env_prefix)
        } else {
            ManagerConfig::env_var_names(env_prefix)
        };
        println!("Environment overrides:");
        for name in names {
            println!("  {name}");
        }
    }

    Ok(())
}
