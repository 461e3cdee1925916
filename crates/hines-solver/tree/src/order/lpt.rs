// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Least-processing-time bin packing
//!
//! Largest piece goes into the least loaded bag. Used to spread cells over
//! warps so every warp carries a similar number of compartments.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Assign each piece to one of `nbag` bags.
///
/// Returns the bag index per piece (parallel to `pieces`) and the resulting
/// load balance (mean load / max load, 1.0 is perfect). Ties go to the
/// lower bag index so the assignment is deterministic.
pub fn lpt(nbag: usize, pieces: &[usize]) -> (Vec<usize>, f64) {
    if nbag == 0 || pieces.is_empty() {
        return (vec![0; pieces.len()], 1.0);
    }

    let mut by_size: Vec<usize> = (0..pieces.len()).collect();
    by_size.sort_by_key(|&i| Reverse(pieces[i]));

    let mut bags: BinaryHeap<Reverse<(usize, usize)>> =
        (0..nbag).map(|bag| Reverse((0, bag))).collect();
    let mut assignment = vec![0; pieces.len()];

    for i in by_size {
        if let Some(Reverse((load, bag))) = bags.pop() {
            assignment[i] = bag;
            bags.push(Reverse((load + pieces[i], bag)));
        }
    }

    let loads: Vec<usize> = bags.into_iter().map(|Reverse((load, _))| load).collect();
    (assignment, load_balance(&loads))
}

/// Mean over max of a set of loads
pub fn load_balance(loads: &[usize]) -> f64 {
    if loads.is_empty() {
        return 1.0;
    }
    let sum: usize = loads.iter().sum();
    let max = loads.iter().copied().max().unwrap_or(1).max(1);
    (sum as f64 / loads.len() as f64) / max as f64
}
