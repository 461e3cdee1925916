// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Ordering Oracle
//!
//! Turns a thread's parent-pointer array into a node permutation plus the
//! schedule the elimination kernels walk. Both strategies produce a numbering
//! in solution order (roots first, parents before children).

mod cell;
mod forest;
pub mod lpt;
mod warp;

pub use lpt::{load_balance, lpt};
pub use warp::warp_count;

use tracing::info;

use crate::interleave::{InterleaveInfo, ScheduleLayout};
use crate::types::{check_warpsize, Result, SolverMode, TreeError, NO_PARENT};
use forest::Forest;

/// Build the permutation and schedule for one thread.
///
/// `order[old] = new`. Root parents (`i < ncell`) may use either
/// [`NO_PARENT`] or any placeholder; they are normalized. `nwarp` overrides
/// the warp count in warp-cyclic mode and is ignored in per-cell mode.
pub fn interleave_order(
    ncell: usize,
    parent: &[usize],
    mode: SolverMode,
    warpsize: usize,
    nwarp: Option<usize>,
) -> Result<(Vec<usize>, InterleaveInfo)> {
    check_warpsize(warpsize)?;
    let forest = Forest::new(ncell, parent)?;
    let nnode = forest.nnode();

    let (order, layout) = match mode {
        SolverMode::WarpCyclic => {
            let (order, ws) = warp::order_warp_cyclic(&forest, warpsize, nwarp);
            (order, ScheduleLayout::WarpCyclic(ws))
        }
        SolverMode::PerCell => {
            let (order, cs) = cell::order_per_cell(&forest);
            (order, ScheduleLayout::PerCell(cs))
        }
    };

    info!(
        target: "hines-solver-tree",
        "[ORDER] {} schedule built: {} cells, {} nodes",
        mode,
        ncell,
        nnode
    );

    Ok((order, InterleaveInfo::new(ncell, nnode, layout)))
}

/// `inverse[new] = old` for a permutation `order[old] = new`
pub fn inverse_permutation(order: &[usize]) -> Result<Vec<usize>> {
    let mut inverse = vec![NO_PARENT; order.len()];
    for (old, &new) in order.iter().enumerate() {
        if new >= order.len() || inverse[new] != NO_PARENT {
            return Err(TreeError::InvalidPermutation(format!(
                "entry {} maps to {}",
                old, new
            )));
        }
        inverse[new] = old;
    }
    Ok(inverse)
}

/// Parent array in the new numbering; roots map to [`NO_PARENT`]
pub fn apply_order_to_parent(ncell: usize, parent: &[usize], order: &[usize]) -> Result<Vec<usize>> {
    if parent.len() != order.len() {
        return Err(TreeError::ArraySizeMismatch {
            expected: order.len(),
            actual: parent.len(),
        });
    }
    let mut permuted = vec![NO_PARENT; parent.len()];
    for (old, &p) in parent.iter().enumerate() {
        let new = order[old];
        if new >= parent.len() {
            return Err(TreeError::InvalidPermutation(format!(
                "entry {} maps to {}",
                old, new
            )));
        }
        if old >= ncell {
            permuted[new] = *order.get(p).ok_or_else(|| TreeError::InvalidTopology {
                node: old,
                reason: format!("parent {} out of range", p as isize),
            })?;
        }
    }
    Ok(permuted)
}
