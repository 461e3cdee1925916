// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the solver engine

use hines_solver_runtime::RuntimeError;
use hines_solver_tree::TreeError;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// GPU-resident thread with compartments but no schedule
    #[error("Thread {thread} has {nnode} compartments but no interleave schedule for GPU execution")]
    MissingSchedule { thread: usize, nnode: usize },

    #[error("Invalid thread index {thread}: store holds {nthread} threads")]
    InvalidThread { thread: usize, nthread: usize },

    #[error("Unsupported solver mode: {0}")]
    InvalidMode(String),

    #[error("Invalid backend: {0}")]
    InvalidBackend(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, SolverError>;
