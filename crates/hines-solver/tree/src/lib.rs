// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hines Tree Solver Core (Platform-Agnostic)
//!
//! Everything needed to solve a forest of Hines matrices in lock-step:
//! - **Order**: ordering oracle turning a parent array into a permutation and
//!   a schedule (warp-cyclic or per-cell)
//! - **Interleave**: the schedule itself, its self-check and its packed
//!   device image
//! - **Lane**: lane-group abstraction and the CPU lock-step emulator
//! - **Kernels**: triangularization and back-substitution
//! - **Stats**: advisory schedule counters
//!
//! No allocation happens inside a solve.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod types;

pub mod interleave;
pub mod kernels;
pub mod lane;
pub mod order;
pub mod stats;

pub use interleave::{
    CellSchedule, InterleaveInfo, ScheduleArena, ScheduleLayout, ScheduleOffsets, WarpSchedule,
};
pub use kernels::{solve_interleaved, solve_per_cell, solve_sequential, solve_warp_cyclic, TreeArraysMut};
pub use lane::{LaneGroup, LockstepEmulator};
pub use order::{apply_order_to_parent, interleave_order, inverse_permutation, lpt, warp_count};
pub use stats::{GroupStatistics, InterleaveStatistics};
pub use types::{
    check_solution_order, check_warpsize, Error, Result, SolverMode, TreeError, MAX_WARPSIZE,
    NO_PARENT,
};
