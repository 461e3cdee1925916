// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solver mode selection

use super::error::{Result, TreeError};

/// Which interleaving strategy a thread's schedule is built for.
///
/// Chosen once per run, before any schedule exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SolverMode {
    /// Lanes of fixed-width warps walk cycles of interleaved nodes in lock-step
    #[default]
    WarpCyclic,

    /// One logical task per cell walks a shared stride array
    PerCell,
}

impl SolverMode {
    /// Canonical configuration spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverMode::WarpCyclic => "warp-cyclic",
            SolverMode::PerCell => "per-cell",
        }
    }
}

impl core::fmt::Display for SolverMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SolverMode {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "warp-cyclic" | "warp_cyclic" | "warp" | "2" => Ok(SolverMode::WarpCyclic),
            "per-cell" | "per_cell" | "cell" | "1" => Ok(SolverMode::PerCell),
            other => Err(TreeError::InvalidMode(other.to_string())),
        }
    }
}
