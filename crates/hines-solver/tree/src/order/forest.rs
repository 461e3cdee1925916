// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topology analysis shared by both ordering strategies

use std::collections::VecDeque;

use crate::types::{Result, TreeError, NO_PARENT};

/// Validated forest view over a raw parent-pointer array.
///
/// Children are stored CSR-style (`child_start`/`child_list`) so the
/// ordering passes never allocate per node.
#[derive(Debug, Clone)]
pub(crate) struct Forest {
    pub ncell: usize,
    pub parent: Vec<usize>,
    /// Root id owning each node
    pub cell: Vec<usize>,
    /// Edges from each node down to its deepest descendant
    pub height: Vec<usize>,
    /// Non-root node count per cell
    pub cell_nodes: Vec<usize>,
    child_start: Vec<usize>,
    child_list: Vec<usize>,
}

impl Forest {
    /// Normalize root parents to [`NO_PARENT`] and validate the topology.
    pub fn new(ncell: usize, parent: &[usize]) -> Result<Self> {
        let nnode = parent.len();
        if ncell > nnode {
            return Err(TreeError::ArraySizeMismatch {
                expected: ncell,
                actual: nnode,
            });
        }

        let mut parent = parent.to_vec();
        for p in parent.iter_mut().take(ncell) {
            *p = NO_PARENT;
        }
        for (i, &p) in parent.iter().enumerate().skip(ncell) {
            if p == NO_PARENT {
                return Err(TreeError::InvalidTopology {
                    node: i,
                    reason: "non-root node has no parent".to_string(),
                });
            }
            if p >= nnode || p == i {
                return Err(TreeError::InvalidTopology {
                    node: i,
                    reason: format!("parent {} out of range", p),
                });
            }
        }

        let cell = assign_cells(ncell, &parent)?;

        let mut child_start = vec![0usize; nnode + 1];
        for &p in parent.iter().skip(ncell) {
            child_start[p + 1] += 1;
        }
        for i in 0..nnode {
            child_start[i + 1] += child_start[i];
        }
        let mut fill = child_start.clone();
        let mut child_list = vec![0usize; nnode - ncell];
        for (i, &p) in parent.iter().enumerate().skip(ncell) {
            child_list[fill[p]] = i;
            fill[p] += 1;
        }

        let mut forest = Self {
            ncell,
            parent,
            cell,
            height: vec![0; nnode],
            cell_nodes: vec![0; ncell],
            child_start,
            child_list,
        };

        let order = forest.breadth_first_all();
        for &i in order.iter().rev() {
            let p = forest.parent[i];
            if p != NO_PARENT {
                forest.height[p] = forest.height[p].max(forest.height[i] + 1);
            }
        }
        for i in ncell..nnode {
            forest.cell_nodes[forest.cell[i]] += 1;
        }

        Ok(forest)
    }

    pub fn nnode(&self) -> usize {
        self.parent.len()
    }

    pub fn children(&self, i: usize) -> &[usize] {
        &self.child_list[self.child_start[i]..self.child_start[i + 1]]
    }

    /// Non-root nodes of one cell, parents before children
    pub fn breadth_first(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.cell_nodes[root]);
        let mut queue: VecDeque<usize> = self.children(root).iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            out.push(i);
            queue.extend(self.children(i).iter().copied());
        }
        out
    }

    fn breadth_first_all(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nnode());
        let mut queue: VecDeque<usize> = (0..self.ncell).collect();
        while let Some(i) = queue.pop_front() {
            out.push(i);
            queue.extend(self.children(i).iter().copied());
        }
        out
    }
}

/// Walk every node up to its root, memoizing the owning cell.
fn assign_cells(ncell: usize, parent: &[usize]) -> Result<Vec<usize>> {
    let nnode = parent.len();
    let mut cell = vec![NO_PARENT; nnode];
    for (r, c) in cell.iter_mut().enumerate().take(ncell) {
        *c = r;
    }

    let mut path = Vec::new();
    for start in ncell..nnode {
        let mut i = start;
        while cell[i] == NO_PARENT {
            path.push(i);
            if path.len() > nnode {
                return Err(TreeError::InvalidTopology {
                    node: start,
                    reason: "parent chain contains a cycle".to_string(),
                });
            }
            i = parent[i];
        }
        let c = cell[i];
        for n in path.drain(..) {
            cell[n] = c;
        }
    }
    Ok(cell)
}
