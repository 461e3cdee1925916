// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Hines - Interleaved Parallel Tree-Matrix Solver
//!
//! Solves the tree-shaped (Hines) linear systems of compartmental neuron
//! models, many trees at a time, in lock-step on GPU SIMD hardware or with
//! a CPU emulation of it.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hines = "0.1"                                      # CPU only
//! hines = { version = "0.1", features = ["gpu"] }    # + WGPU backend
//! ```
//!
//! ## Feature Flags
//! - **`gpu`**: WGPU compute backend (adapter must expose `SHADER_F64`)
//! - **`file-logging`**: rolling log file next to console output
//!
//! ## Usage
//!
//! ```rust
//! use hines::prelude::*;
//!
//! let mut sim = Simulation::from_config(&HinesConfig::default())?;
//!
//! // One cell: a three-compartment chain
//! let order = sim.load_thread(0, 1, &[NO_PARENT, 0, 1])?.to_vec();
//! let state = sim.thread_mut(0)?;
//! for (old, &new) in order.iter().enumerate() {
//!     let off = if old == 0 { 0.0 } else { -1.0 };
//!     state.set_row(new, off, off, 2.0, 1.0)?;
//! }
//!
//! sim.step()?;
//! let root = sim.thread(0)?.rhs()[order[0]];
//! assert!((root - 1.5).abs() < 1e-12);
//! # Ok::<(), hines::HinesError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export foundation
pub use hines_config as config;
pub use hines_observability as observability;

// Re-export solver subsystem
pub use hines_solver_engine as engine;
pub use hines_solver_runtime as runtime;
pub use hines_solver_tree as tree;

pub mod simulation;

pub use simulation::{
    backend_from_config, init_logging_from_config, log_settings_from_config,
    settings_from_config, HinesError, Result, Simulation,
};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::HinesConfig;
    pub use crate::engine::{BackendType, SolvePath, SolverSettings, TreeSolver};
    pub use crate::runtime::{MatrixStorage, ThreadState};
    pub use crate::simulation::Simulation;
    pub use crate::tree::{InterleaveInfo, SolverMode, NO_PARENT};
}
