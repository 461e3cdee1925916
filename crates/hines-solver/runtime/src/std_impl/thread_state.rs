// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Standard thread state implementation
//!
//! Uses `Vec` storage padded to a whole number of 64-byte lines.

use hines_solver_tree::{
    apply_order_to_parent, inverse_permutation, TreeArraysMut, TreeError, NO_PARENT,
};
use tracing::debug;

use crate::traits::{MatrixStorage, Result, RuntimeError};

/// `f64` entries per padding unit
pub const PAD_WORDS: usize = 8;

/// Round a node count up to the padded array length
pub fn padded_size(n: usize) -> usize {
    n.div_ceil(PAD_WORDS) * PAD_WORDS
}

/// Numeric state of one simulation thread
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    /// Number of trees
    pub ncell: usize,

    /// Number of real compartments
    pub count: usize,

    /// Arrays live on an accelerator
    pub compute_gpu: bool,

    /// Device stream id for GPU-resident threads
    pub stream_id: usize,

    /// Membrane voltages
    pub voltages: Vec<f64>,

    /// Sub-diagonal (row of the parent)
    pub a: Vec<f64>,

    /// Super-diagonal (row of the node)
    pub b: Vec<f64>,

    /// Diagonal
    pub d: Vec<f64>,

    /// Right-hand side, solution after a solve
    pub rhs: Vec<f64>,

    /// Parent ids, one per real compartment
    pub parent: Vec<usize>,
}

impl ThreadState {
    /// Create an empty thread with room for `capacity` compartments
    pub fn new(capacity: usize) -> Self {
        let capacity = padded_size(capacity);
        Self {
            ncell: 0,
            count: 0,
            compute_gpu: false,
            stream_id: 0,
            voltages: vec![0.0; capacity],
            a: vec![0.0; capacity],
            b: vec![0.0; capacity],
            d: vec![1.0; capacity],
            rhs: vec![0.0; capacity],
            parent: Vec::with_capacity(capacity),
        }
    }

    /// Create a thread sized exactly for a topology
    pub fn from_topology(ncell: usize, parent: &[usize]) -> Result<Self> {
        let mut state = Self::new(parent.len());
        state.set_topology(ncell, parent)?;
        Ok(state)
    }

    /// Install a topology; roots are `[0, ncell)` and their parents are
    /// normalized to [`NO_PARENT`]
    pub fn set_topology(&mut self, ncell: usize, parent: &[usize]) -> Result<()> {
        if parent.len() > self.capacity() {
            return Err(RuntimeError::CapacityExceeded {
                requested: parent.len(),
                available: self.capacity(),
            });
        }
        if ncell > parent.len() {
            return Err(TreeError::ArraySizeMismatch {
                expected: ncell,
                actual: parent.len(),
            }
            .into());
        }
        self.parent.clear();
        self.parent.extend_from_slice(parent);
        for p in self.parent.iter_mut().take(ncell) {
            *p = NO_PARENT;
        }
        self.ncell = ncell;
        self.count = parent.len();
        Ok(())
    }

    /// Mark the thread as device resident on `stream_id`
    pub fn with_gpu(mut self, stream_id: usize) -> Self {
        self.compute_gpu = true;
        self.stream_id = stream_id;
        self
    }

    /// Set the matrix row of one compartment
    pub fn set_row(&mut self, i: usize, a: f64, b: f64, d: f64, rhs: f64) -> Result<()> {
        if i >= self.count {
            return Err(RuntimeError::CapacityExceeded {
                requested: i + 1,
                available: self.count,
            });
        }
        self.a[i] = a;
        self.b[i] = b;
        self.d[i] = d;
        self.rhs[i] = rhs;
        Ok(())
    }

    /// Overwrite `D` and `RHS` (e.g. with values read back from a device)
    pub fn load_solution(&mut self, d: &[f64], rhs: &[f64]) -> Result<()> {
        for len in [d.len(), rhs.len()] {
            if len != self.count {
                return Err(RuntimeError::ArraySizeMismatch {
                    expected: self.count,
                    actual: len,
                });
            }
        }
        self.d[..self.count].copy_from_slice(d);
        self.rhs[..self.count].copy_from_slice(rhs);
        Ok(())
    }
}

/// `values[new] = values[old]` over the first `inverse.len()` entries
fn permute_prefix(values: &mut [f64], inverse: &[usize]) {
    let permuted: Vec<f64> = inverse.iter().map(|&old| values[old]).collect();
    values[..inverse.len()].copy_from_slice(&permuted);
}

impl MatrixStorage for ThreadState {
    fn ncell(&self) -> usize {
        self.ncell
    }

    fn node_count(&self) -> usize {
        self.count
    }

    fn capacity(&self) -> usize {
        self.rhs.len()
    }

    fn compute_gpu(&self) -> bool {
        self.compute_gpu
    }

    fn stream_id(&self) -> usize {
        self.stream_id
    }

    fn parents(&self) -> &[usize] {
        &self.parent
    }

    fn voltages(&self) -> &[f64] {
        &self.voltages[..self.count]
    }

    fn a(&self) -> &[f64] {
        &self.a[..self.count]
    }

    fn b(&self) -> &[f64] {
        &self.b[..self.count]
    }

    fn d(&self) -> &[f64] {
        &self.d[..self.count]
    }

    fn rhs(&self) -> &[f64] {
        &self.rhs[..self.count]
    }

    fn d_mut(&mut self) -> &mut [f64] {
        &mut self.d[..self.count]
    }

    fn rhs_mut(&mut self) -> &mut [f64] {
        &mut self.rhs[..self.count]
    }

    fn tree_arrays_mut(&mut self) -> TreeArraysMut<'_> {
        let n = self.count;
        TreeArraysMut {
            a: &self.a[..n],
            b: &self.b[..n],
            d: &mut self.d[..n],
            rhs: &mut self.rhs[..n],
            parent: &self.parent,
        }
    }

    fn apply_permutation(&mut self, order: &[usize]) -> Result<()> {
        if order.len() != self.count {
            return Err(RuntimeError::ArraySizeMismatch {
                expected: self.count,
                actual: order.len(),
            });
        }
        let inverse = inverse_permutation(order)?;
        if order.iter().take(self.ncell).any(|&r| r >= self.ncell) {
            return Err(TreeError::InvalidPermutation("root moved out of [0, ncell)".to_string()).into());
        }
        self.parent = apply_order_to_parent(self.ncell, &self.parent, order)?;

        for values in [
            &mut self.voltages,
            &mut self.a,
            &mut self.b,
            &mut self.d,
            &mut self.rhs,
        ] {
            permute_prefix(values, &inverse);
        }

        debug!(
            target: "hines-solver-runtime",
            "Permuted thread state: {} cells, {} nodes",
            self.ncell,
            self.count
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padded_size(0), 0);
        assert_eq!(padded_size(1), 8);
        assert_eq!(padded_size(16), 16);
        assert_eq!(ThreadState::new(3).capacity(), 8);
    }

    #[test]
    fn test_slices_trim_padding() {
        let state = ThreadState::from_topology(1, &[0, 0, 1]).unwrap();
        assert_eq!(state.rhs().len(), 3);
        assert_eq!(state.parents(), &[NO_PARENT, 0, 1]);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut state = ThreadState::new(8);
        let parent = vec![0; 9];
        assert!(matches!(
            state.set_topology(1, &parent),
            Err(RuntimeError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_permutation_moves_rows_with_nodes() {
        // 0 <- 2 <- 1, renumbered to the chain 0 <- 1 <- 2
        let mut state = ThreadState::from_topology(1, &[NO_PARENT, 2, 0]).unwrap();
        state.set_row(1, -1.0, -1.0, 3.0, 7.0).unwrap();
        state.set_row(2, -2.0, -2.0, 4.0, 8.0).unwrap();
        state.apply_permutation(&[0, 2, 1]).unwrap();

        assert_eq!(state.parents(), &[NO_PARENT, 0, 1]);
        assert_eq!(state.rhs(), &[0.0, 8.0, 7.0]);
        assert_eq!(state.d(), &[1.0, 4.0, 3.0]);
    }

    #[test]
    fn test_permutation_rejects_root_escape() {
        let mut state = ThreadState::from_topology(1, &[NO_PARENT, 0]).unwrap();
        assert!(state.apply_permutation(&[1, 0]).is_err());
    }

    #[test]
    fn test_load_solution_length_checked() {
        let mut state = ThreadState::from_topology(1, &[NO_PARENT, 0]).unwrap();
        assert!(state.load_solution(&[1.0], &[1.0, 2.0]).is_err());
        state.load_solution(&[2.0, 2.0], &[1.0, 2.0]).unwrap();
        assert_eq!(state.rhs(), &[1.0, 2.0]);
    }
}
