// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Storage abstraction for one simulation thread's Hines matrix
//!
//! ## Design Philosophy
//!
//! - **Storage Abstraction**: the solver only sees slices, never the container
//! - **Split Borrows**: coefficients shared and `D`/`RHS` mutable in one call
//! - **Padding**: arrays may be longer than the node count; slices returned
//!   here are always trimmed to the real nodes

use hines_solver_tree::TreeArraysMut;

use crate::traits::error::Result;

/// Matrix storage trait: Abstracts the System-of-Arrays of one thread
///
/// Implementations might use Vec (std), pinned host memory, or device
/// mirrors. Every slice accessor returns exactly `node_count()` entries.
pub trait MatrixStorage: Send + Sync {
    // === Shape ===

    /// Number of independent trees; roots occupy ids `[0, ncell)`
    fn ncell(&self) -> usize;

    /// Number of real compartments
    fn node_count(&self) -> usize;

    /// Padded array length
    fn capacity(&self) -> usize;

    /// Thread has no compartments
    fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    // === Residency ===

    /// Arrays of this thread live on an accelerator
    fn compute_gpu(&self) -> bool;

    /// Execution stream the thread's device work is ordered on
    fn stream_id(&self) -> usize {
        0
    }

    // === Arrays (Read-Only) ===

    /// Parent ids, [`hines_solver_tree::NO_PARENT`] for roots
    fn parents(&self) -> &[usize];

    /// Membrane voltages
    fn voltages(&self) -> &[f64];

    /// Sub-diagonal coefficients
    fn a(&self) -> &[f64];

    /// Super-diagonal coefficients
    fn b(&self) -> &[f64];

    /// Diagonal
    fn d(&self) -> &[f64];

    /// Right-hand side (solution after a solve)
    fn rhs(&self) -> &[f64];

    // === Arrays (Mutable) ===

    /// Diagonal, consumed as elimination scratch
    fn d_mut(&mut self) -> &mut [f64];

    /// Right-hand side, overwritten with the solution
    fn rhs_mut(&mut self) -> &mut [f64];

    /// Borrow everything a solve touches at once
    fn tree_arrays_mut(&mut self) -> TreeArraysMut<'_>;

    // === Topology ===

    /// Renumber every array and parent pointer, `order[old] = new`
    fn apply_permutation(&mut self, order: &[usize]) -> Result<()>;
}
