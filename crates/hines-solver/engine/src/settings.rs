// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solver settings handed to [`crate::TreeSolver::new`]
//!
//! Kept free of any configuration-file types so the engine does not depend on
//! the config crate; the application layer translates its config into this.

use hines_solver_tree::{check_warpsize, SolverMode};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverSettings {
    /// Interleaving strategy for every thread of the run
    pub mode: SolverMode,

    /// Lanes per warp the warp-cyclic schedule is packed for
    pub warpsize: usize,

    /// Warp count override (None = ceil(ncell / warpsize))
    pub nwarp: Option<usize>,

    /// Compute and log schedule statistics at setup
    pub collect_statistics: bool,

    /// Run the schedule self-check at setup
    pub validate_schedules: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            mode: SolverMode::WarpCyclic,
            warpsize: 32,
            nwarp: None,
            collect_statistics: false,
            validate_schedules: false,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<()> {
        check_warpsize(self.warpsize)?;
        Ok(())
    }

    pub fn with_mode(mut self, mode: SolverMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_warpsize(mut self, warpsize: usize) -> Self {
        self.warpsize = warpsize;
        self
    }
}
