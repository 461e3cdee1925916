// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Rejects values the solver cannot run with, so a bad mode or warp size
//! fails at startup instead of at the first schedule build.

use hines_solver_tree::{SolverMode, MAX_WARPSIZE};

use crate::{ConfigError, ConfigResult, HinesConfig};

/// Accepted `execution.backend` values
pub const BACKENDS: [&str; 4] = ["cpu", "wgpu", "gpu", "auto"];

/// Accepted `logging.level` values
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    UnknownChoice {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },
    OutOfRange {
        field: String,
        value: usize,
        min: usize,
        max: usize,
    },
    Unparsable {
        field: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownChoice {
                field,
                value,
                allowed,
            } => write!(
                f,
                "{} = '{}' is not one of: {}",
                field,
                value,
                allowed.join(", ")
            ),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{} = {} is outside {}..={}", field, value, min, max),
            Self::Unparsable { field, reason } => write!(f, "{}: {}", field, reason),
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Known solver mode, backend and log level
/// - Warp size in `1..=1024`
/// - At least one thread
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &HinesConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_choices(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn check_choice(
    field: &str,
    value: &str,
    allowed: &'static [&'static str],
    errors: &mut Vec<ConfigValidationError>,
) {
    let normalized = value.trim().to_lowercase();
    if !allowed.contains(&normalized.as_str()) {
        errors.push(ConfigValidationError::UnknownChoice {
            field: field.to_string(),
            value: value.to_string(),
            allowed,
        });
    }
}

fn validate_choices(config: &HinesConfig, errors: &mut Vec<ConfigValidationError>) {
    if let Err(e) = config.solver.mode.parse::<SolverMode>() {
        errors.push(ConfigValidationError::Unparsable {
            field: "solver.mode".to_string(),
            reason: e.to_string(),
        });
    }
    check_choice("execution.backend", &config.execution.backend, &BACKENDS, errors);
    check_choice("logging.level", &config.logging.level, &LOG_LEVELS, errors);
}

fn validate_value_ranges(config: &HinesConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.solver.warpsize == 0 || config.solver.warpsize > MAX_WARPSIZE {
        errors.push(ConfigValidationError::OutOfRange {
            field: "solver.warpsize".to_string(),
            value: config.solver.warpsize,
            min: 1,
            max: MAX_WARPSIZE,
        });
    }
    if config.execution.nthread == 0 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "execution.nthread".to_string(),
            value: 0,
            min: 1,
            max: usize::MAX,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_rejected() {
        let mut config = HinesConfig::default();
        config.solver.mode = "diagonal".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("solver.mode"));
    }

    #[test]
    fn test_choices_are_case_insensitive() {
        let mut config = HinesConfig::default();
        config.solver.mode = "Per-Cell".to_string();
        config.execution.backend = "GPU".to_string();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_mode_aliases_accepted() {
        let mut config = HinesConfig::default();
        for mode in ["warp", "cell", "1", "2", "per_cell"] {
            config.solver.mode = mode.to_string();
            assert!(validate_config(&config).is_ok(), "mode {}", mode);
        }
    }

    #[test]
    fn test_warpsize_limit_matches_solver() {
        let mut config = HinesConfig::default();
        config.solver.warpsize = MAX_WARPSIZE;
        assert!(validate_config(&config).is_ok());
        config.solver.warpsize = MAX_WARPSIZE + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_all_problems_reported() {
        let mut config = HinesConfig::default();
        config.solver.warpsize = 4096;
        config.execution.nthread = 0;
        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("solver.warpsize"));
        assert!(message.contains("execution.nthread"));
    }
}
