// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # CPU Backend
//!
//! Runs the interleaved kernels on the host, emulating each warp with a
//! [`LockstepEmulator`]. Produces the same numbers as the GPU kernel since
//! both walk the schedule cycle by cycle.

use hines_solver_runtime::MatrixStorage;
use hines_solver_tree::{solve_interleaved, InterleaveInfo, LockstepEmulator, ScheduleLayout};
use tracing::trace;

use super::SolverBackend;
use crate::error::Result;

/// CPU backend with lock-step emulation
#[derive(Debug, Clone)]
pub struct CpuBackend {
    /// Backend name for logging
    name: String,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            name: "CPU (lock-step emulation)".to_string(),
        }
    }

    /// One emulated lane per schedule lane
    fn lane_group(info: &InterleaveInfo) -> LockstepEmulator {
        let width = match &info.layout {
            ScheduleLayout::WarpCyclic(ws) => ws.warpsize,
            ScheduleLayout::PerCell(_) => 1,
        };
        LockstepEmulator::new(width)
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MatrixStorage> SolverBackend<S> for CpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn solve(&self, ith: usize, info: &InterleaveInfo, state: &mut S) -> Result<()> {
        let mut group = Self::lane_group(info);
        solve_interleaved(info, &mut state.tree_arrays_mut(), &mut group)?;
        trace!(
            target: "hines-solver-engine",
            "[CPU] thread {} solved: {} barriers, {} lane steps",
            ith,
            group.barriers,
            group.lane_steps
        );
        Ok(())
    }
}
