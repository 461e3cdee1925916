// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-cell ordering: each cell is one task, and position `k` of every cell
//! that reaches it shares block `k` of the node range.

use std::cmp::Reverse;

use super::forest::Forest;
use crate::interleave::CellSchedule;
use crate::types::NO_PARENT;

pub(crate) fn order_per_cell(forest: &Forest) -> (Vec<usize>, CellSchedule) {
    let ncell = forest.ncell;
    let nnode = forest.nnode();

    // Largest cells first so block k always holds ranks [0, stride[k])
    let mut ranked: Vec<usize> = (0..ncell).collect();
    ranked.sort_by_key(|&c| Reverse(forest.cell_nodes[c]));

    let nstride = forest.cell_nodes.iter().copied().max().unwrap_or(0);
    let mut stride = vec![0usize; nstride];
    for &size in &forest.cell_nodes {
        for s in stride.iter_mut().take(size) {
            *s += 1;
        }
    }

    let mut blockstart = Vec::with_capacity(nstride);
    let mut begin = ncell;
    for &s in &stride {
        blockstart.push(begin);
        begin += s;
    }

    let mut order = vec![NO_PARENT; nnode];
    let mut firstnode = vec![0; ncell];
    let mut lastnode = vec![0; ncell];
    let mut cellsize = vec![0; ncell];

    for (rank, &c) in ranked.iter().enumerate() {
        order[c] = rank;
        let nodes = forest.breadth_first(c);
        for (k, &n) in nodes.iter().enumerate() {
            order[n] = blockstart[k] + rank;
        }
        cellsize[rank] = nodes.len();
        match nodes.len() {
            0 => {
                firstnode[rank] = rank;
                lastnode[rank] = rank;
            }
            size => {
                firstnode[rank] = blockstart[0] + rank;
                lastnode[rank] = blockstart[size - 1] + rank;
            }
        }
    }

    let schedule = CellSchedule {
        nstride,
        stride,
        firstnode,
        lastnode,
        cellsize,
    };
    (order, schedule)
}
