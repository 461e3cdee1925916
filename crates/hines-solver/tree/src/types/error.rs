// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for tree scheduling and elimination

/// Errors raised while building or executing a tree schedule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Invalid topology at node {node}: {reason}")]
    InvalidTopology { node: usize, reason: String },

    #[error("Array size mismatch: expected {expected}, got {actual}")]
    ArraySizeMismatch { expected: usize, actual: usize },

    #[error("Invalid warp size {warpsize}: must be between 1 and {max}")]
    InvalidWarpSize { warpsize: usize, max: usize },

    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("Schedule violation: {0}")]
    ScheduleViolation(String),

    #[error("Unsupported solver mode: {0}")]
    InvalidMode(String),
}

pub type Result<T> = core::result::Result<T, TreeError>;
pub type Error = TreeError;
