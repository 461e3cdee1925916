// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for thread storage operations

use hines_solver_tree::TreeError;

/// Runtime errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Capacity exceeded
    #[error("Capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Requested node count
        requested: usize,
        /// Padded capacity of the arrays
        available: usize,
    },

    /// A caller-supplied array does not match the thread's node count
    #[error("Array size mismatch: expected {expected}, got {actual}")]
    ArraySizeMismatch {
        /// Thread node count
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Topology or permutation rejected by the tree core
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Result type for runtime operations
pub type Result<T> = core::result::Result<T, RuntimeError>;
