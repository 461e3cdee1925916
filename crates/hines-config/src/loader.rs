// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values, defaults for anything missing)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, HinesConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "hines.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `HINES_CONFIG_PATH` environment variable
/// 2. Current working directory: `./hines.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("HINES_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by HINES_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet HINES_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Parse configuration from TOML text (no overrides applied)
pub fn parse_config(content: &str) -> ConfigResult<HinesConfig> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides keyed by dotted name
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or an
/// override cannot be parsed. Range checks are left to
/// [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<HinesConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config = parse_config(&content)?;
    info!("Loaded configuration from {}", config_file.display());

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `HINES_SOLVER_MODE` -> `solver.mode`
/// - `HINES_WARPSIZE` -> `solver.warpsize`
/// - `HINES_NWARP` -> `solver.nwarp`
/// - `HINES_BACKEND` -> `execution.backend`
/// - `HINES_NTHREAD` -> `execution.nthread`
/// - `HINES_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut HinesConfig) -> ConfigResult<()> {
    const ENV_KEYS: [(&str, &str); 6] = [
        ("HINES_SOLVER_MODE", "solver.mode"),
        ("HINES_WARPSIZE", "solver.warpsize"),
        ("HINES_NWARP", "solver.nwarp"),
        ("HINES_BACKEND", "execution.backend"),
        ("HINES_NTHREAD", "execution.nthread"),
        ("HINES_LOG_LEVEL", "logging.level"),
    ];

    for (var, key) in ENV_KEYS {
        if let Ok(value) = env::var(var) {
            debug!("Config override from {}: {} = {}", var, key, value);
            set_value(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Dotted keys to values (e.g., `{"solver.mode": "per-cell"}`)
///
/// # Errors
///
/// `ConfigError::InvalidValue` for an unknown key or an unparseable value
pub fn apply_cli_overrides(
    config: &mut HinesConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        set_value(config, key, value)?;
    }
    Ok(())
}

fn set_value(config: &mut HinesConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "solver.mode" => config.solver.mode = value.to_string(),
        "solver.warpsize" => config.solver.warpsize = parse_value(key, value)?,
        "solver.nwarp" => config.solver.nwarp = parse_value(key, value)?,
        "solver.collect_statistics" => config.solver.collect_statistics = parse_flag(key, value)?,
        "solver.validate_schedules" => config.solver.validate_schedules = parse_flag(key, value)?,
        "execution.backend" => config.execution.backend = value.to_string(),
        "execution.nthread" => config.execution.nthread = parse_value(key, value)?,
        "logging.level" => config.logging.level = value.to_string(),
        "logging.log_dir" => config.logging.log_dir = value.to_string(),
        _ => {
            return Err(ConfigError::InvalidValue(format!(
                "unknown configuration key '{}'",
                key
            )))
        }
    }
    Ok(())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!("{} = '{}'", key, value))),
    }
}
