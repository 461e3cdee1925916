// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Structs mapping to the sections of `hines.toml`. Every section and field
//! has a default, so an empty file is a complete configuration.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HinesConfig {
    pub solver: SolverConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

/// Interleaving strategy and schedule packing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// "warp-cyclic" or "per-cell"
    pub mode: String,
    /// Lanes per warp the warp-cyclic schedule is packed for
    pub warpsize: usize,
    /// 0 = ceil(ncell / warpsize)
    pub nwarp: usize,
    pub collect_statistics: bool,
    pub validate_schedules: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: "warp-cyclic".to_string(),
            warpsize: 32,
            nwarp: 0,
            collect_statistics: false,
            validate_schedules: false,
        }
    }
}

impl SolverConfig {
    /// Warp count override, `None` when the builder should derive it
    pub fn nwarp_override(&self) -> Option<usize> {
        (self.nwarp > 0).then_some(self.nwarp)
    }
}

/// Where solves run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// "cpu", "wgpu" or "auto"
    pub backend: String,
    /// Simulation threads (one schedule each)
    pub nthread: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            backend: "cpu".to_string(),
            nthread: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error
    pub level: String,
    /// Crates to run at debug level regardless of `level`
    pub debug_crates: Vec<String>,
    /// Directory for rolling log files (empty = console only)
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_crates: Vec::new(),
            log_dir: String::new(),
        }
    }
}
