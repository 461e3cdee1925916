// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Warp-cyclic ordering
//!
//! Cells are spread over warps with LPT, then each warp's nodes are packed
//! into lock-step cycles by greedy list scheduling. A node becomes ready once
//! its parent is a root or sits in an earlier cycle; every cycle takes the
//! ready nodes with the deepest remaining subtree first and never admits two
//! children of the same parent.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::debug;

use super::forest::Forest;
use super::lpt::lpt;
use crate::interleave::WarpSchedule;
use crate::types::NO_PARENT;

/// Number of warps for a thread: explicit override or `ceil(ncell / warpsize)`,
/// never more than one warp per cell.
pub fn warp_count(ncell: usize, warpsize: usize, nwarp: Option<usize>) -> usize {
    if ncell == 0 {
        return 0;
    }
    let n = match nwarp {
        Some(n) if n > 0 => n,
        _ => ncell.div_ceil(warpsize.max(1)),
    };
    n.min(ncell)
}

pub(crate) fn order_warp_cyclic(
    forest: &Forest,
    warpsize: usize,
    nwarp: Option<usize>,
) -> (Vec<usize>, WarpSchedule) {
    let ncell = forest.ncell;
    let nnode = forest.nnode();
    let nwarp = warp_count(ncell, warpsize, nwarp);

    let pieces: Vec<usize> = forest.cell_nodes.iter().map(|n| n + 1).collect();
    let (bags, balance) = lpt(nwarp, &pieces);
    debug!(
        target: "hines-solver-tree",
        "[ORDER] {} cells over {} warps, load balance {:.3}",
        ncell,
        nwarp,
        balance
    );

    let mut warp_cells: Vec<Vec<usize>> = vec![Vec::new(); nwarp];
    for (cell, &bag) in bags.iter().enumerate() {
        warp_cells[bag].push(cell);
    }

    let mut order = vec![NO_PARENT; nnode];
    let mut rootbegin = Vec::with_capacity(nwarp + 1);
    let mut next_root = 0;
    rootbegin.push(0);
    for cells in &warp_cells {
        for &c in cells {
            order[c] = next_root;
            next_root += 1;
        }
        rootbegin.push(next_root);
    }

    let mut stride = Vec::new();
    let mut stridedispl = Vec::with_capacity(nwarp + 1);
    let mut firstnode = Vec::with_capacity(nwarp);
    let mut lastnode = Vec::with_capacity(nwarp);
    let mut ncycle = Vec::with_capacity(nwarp);
    stridedispl.push(0);

    // Ready children of each parent, best candidate last. Only a parent's
    // best child competes in the heap, which keeps siblings in separate cycles.
    let mut queues: Vec<Vec<usize>> = vec![Vec::new(); nnode];
    let mut heap: BinaryHeap<Reverse<(Reverse<usize>, usize)>> = BinaryHeap::new();
    let priority = |n: usize| Reverse((Reverse(forest.height[n]), n));
    let mut next_node = ncell;

    let release = |p: usize,
                   queues: &mut [Vec<usize>],
                   heap: &mut BinaryHeap<Reverse<(Reverse<usize>, usize)>>| {
        let mut kids = forest.children(p).to_vec();
        kids.sort_by_key(|&n| priority(n));
        if let Some(&best) = kids.last() {
            heap.push(priority(best));
        }
        queues[p] = kids;
    };

    for cells in &warp_cells {
        firstnode.push(next_node);
        for &c in cells {
            release(c, &mut queues, &mut heap);
        }

        let mut cycles = 0;
        let mut picked = Vec::with_capacity(warpsize);
        while !heap.is_empty() {
            picked.clear();
            while picked.len() < warpsize {
                let Some(Reverse((_, n))) = heap.pop() else {
                    break;
                };
                picked.push(n);
            }

            for &n in &picked {
                let p = forest.parent[n];
                queues[p].pop();
                if let Some(&sibling) = queues[p].last() {
                    heap.push(priority(sibling));
                }
                order[n] = next_node;
                next_node += 1;
            }
            stride.push(picked.len());
            cycles += 1;

            for &n in &picked {
                release(n, &mut queues, &mut heap);
            }
        }

        lastnode.push(next_node);
        ncycle.push(cycles);
        stridedispl.push(stride.len());
    }

    let schedule = WarpSchedule {
        warpsize,
        nwarp,
        stride,
        stridedispl,
        rootbegin,
        firstnode,
        lastnode,
        ncycle,
    };
    (order, schedule)
}
