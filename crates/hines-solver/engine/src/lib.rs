// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Hines Solver Engine
//!
//! Runs the interleaved tree solve for every thread of a simulation.
//!
//! ## Architecture
//! - **Store**: one cached schedule per thread, with a generation counter
//! - **Backends**: CPU lock-step emulation, WGPU compute (feature `gpu`)
//! - **Dispatcher**: [`TreeSolver`] builds schedules at setup and routes
//!   each thread's solve to the backend its residency flag asks for
//!
//! ## Usage
//!
//! ```rust
//! use hines_solver_engine::{BackendType, SolverSettings, TreeSolver};
//! use hines_solver_runtime::{MatrixStorage, ThreadState};
//!
//! let mut state = ThreadState::from_topology(1, &[0, 0, 1]).unwrap();
//! for i in 0..3 {
//!     let off = if i == 0 { 0.0 } else { -1.0 };
//!     state.set_row(i, off, off, 2.0, 1.0).unwrap();
//! }
//!
//! let mut solver = TreeSolver::new(SolverSettings::default(), BackendType::Cpu).unwrap();
//! solver.create_interleave_info(1);
//! solver.setup_thread(0, &mut state).unwrap();
//! solver.solve_thread(0, &mut state).unwrap();
//! assert!((state.rhs()[0] - 1.5).abs() < 1e-12);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod error;
pub mod settings;
pub mod solver;
pub mod store;

pub use backend::{is_gpu_available, resolve_backend, BackendType, CpuBackend, SolverBackend};
#[cfg(feature = "gpu")]
pub use backend::WgpuBackend;
pub use error::{Result, SolverError};
pub use settings::SolverSettings;
pub use solver::{SolvePath, SolverStats, TreeSolver};
pub use store::InterleaveStore;
