// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Elimination Kernels
//!
//! Triangularization (leaves to root) and back-substitution (root to leaves)
//! over a thread's flat Hines arrays, driven by an [`InterleaveInfo`].
//!
//! With `M[parent(i)][i] = A(i)` and `M[i][parent(i)] = B(i)`:
//! ```text
//! eliminate(i):   p = A(i) / D(i)
//!                 D(parent(i))   -= p * B(i)
//!                 RHS(parent(i)) -= p * RHS(i)
//! root(r):        RHS(r) /= D(r)
//! substitute(i):  RHS(i) -= B(i) * RHS(parent(i))
//!                 RHS(i) /= D(i)
//! ```
//!
//! `RHS` receives the solution in place; `D` is left holding the
//! triangularized diagonal.

use crate::interleave::{CellSchedule, InterleaveInfo, ScheduleLayout, WarpSchedule};
use crate::lane::LaneGroup;
use crate::types::{check_solution_order, Result, TreeError};

/// Split borrow of one thread's matrix: coefficients shared, `D` and `RHS`
/// mutable.
#[derive(Debug)]
pub struct TreeArraysMut<'a> {
    pub a: &'a [f64],
    pub b: &'a [f64],
    pub d: &'a mut [f64],
    pub rhs: &'a mut [f64],
    pub parent: &'a [usize],
}

impl<'a> TreeArraysMut<'a> {
    /// Number of real nodes (the parent array is never padded)
    pub fn nnode(&self) -> usize {
        self.parent.len()
    }

    fn check(&self, nnode: usize) -> Result<()> {
        if self.parent.len() != nnode {
            return Err(TreeError::ArraySizeMismatch {
                expected: nnode,
                actual: self.parent.len(),
            });
        }
        for len in [self.a.len(), self.b.len(), self.d.len(), self.rhs.len()] {
            if len < nnode {
                return Err(TreeError::ArraySizeMismatch {
                    expected: nnode,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn eliminate(&mut self, i: usize) {
        let ip = self.parent[i];
        let p = self.a[i] / self.d[i];
        self.d[ip] -= p * self.b[i];
        self.rhs[ip] -= p * self.rhs[i];
    }

    #[inline]
    fn solve_root(&mut self, r: usize) {
        self.rhs[r] /= self.d[r];
    }

    #[inline]
    fn substitute(&mut self, i: usize) {
        let ip = self.parent[i];
        self.rhs[i] -= self.b[i] * self.rhs[ip];
        self.rhs[i] /= self.d[i];
    }
}

/// Triangularize one warp, deepest cycle first
pub fn triang_warp<G: LaneGroup>(
    ws: &WarpSchedule,
    iwarp: usize,
    m: &mut TreeArraysMut<'_>,
    group: &mut G,
) {
    let mut i = ws.lastnode[iwarp];
    for &istride in ws.warp_strides(iwarp).iter().rev() {
        i -= istride;
        let base = i;
        group.run_cycle(|ic| {
            if ic < istride {
                m.eliminate(base + ic);
            }
        });
        group.sync();
    }
}

/// Solve one warp's roots, then back-substitute its cycles shallowest first
pub fn bksub_warp<G: LaneGroup>(
    ws: &WarpSchedule,
    iwarp: usize,
    m: &mut TreeArraysMut<'_>,
    group: &mut G,
) {
    let roots = ws.warp_roots(iwarp);
    let width = group.width();
    group.run_cycle(|ic| {
        let mut r = roots.start + ic;
        while r < roots.end {
            m.solve_root(r);
            r += width;
        }
    });
    group.sync();

    let mut i = ws.firstnode[iwarp];
    for &istride in ws.warp_strides(iwarp) {
        let base = i;
        group.run_cycle(|ic| {
            if ic < istride {
                m.substitute(base + ic);
            }
        });
        group.sync();
        i += istride;
    }
}

/// Triangularize one cell, walking back from its last node
pub fn triang_cell(cs: &CellSchedule, icell: usize, m: &mut TreeArraysMut<'_>) {
    let size = cs.cellsize[icell];
    let mut i = cs.lastnode[icell];
    for k in (0..size).rev() {
        m.eliminate(i);
        if k > 0 {
            i -= cs.stride[k - 1];
        }
    }
}

/// Solve one cell's root and substitute forward from its first node
pub fn bksub_cell(cs: &CellSchedule, icell: usize, m: &mut TreeArraysMut<'_>) {
    m.solve_root(icell);
    let mut i = cs.firstnode[icell];
    for k in 0..cs.cellsize[icell] {
        m.substitute(i);
        i += cs.stride[k];
    }
}

/// Warp-cyclic solve: every warp triangularizes, then every warp
/// back-substitutes. `group` must be at least as wide as the schedule.
pub fn solve_warp_cyclic<G: LaneGroup>(
    ws: &WarpSchedule,
    m: &mut TreeArraysMut<'_>,
    group: &mut G,
) -> Result<()> {
    if group.width() < ws.warpsize {
        return Err(TreeError::ScheduleViolation(format!(
            "lane group of width {} cannot run a schedule packed for {} lanes",
            group.width(),
            ws.warpsize
        )));
    }
    for iwarp in 0..ws.nwarp {
        triang_warp(ws, iwarp, m, group);
    }
    for iwarp in 0..ws.nwarp {
        bksub_warp(ws, iwarp, m, group);
    }
    Ok(())
}

/// Per-cell solve: cells are independent tasks
pub fn solve_per_cell(cs: &CellSchedule, ncell: usize, m: &mut TreeArraysMut<'_>) {
    for icell in 0..ncell {
        triang_cell(cs, icell, m);
    }
    for icell in 0..ncell {
        bksub_cell(cs, icell, m);
    }
}

/// Run whichever solver the schedule was built for
pub fn solve_interleaved<G: LaneGroup>(
    info: &InterleaveInfo,
    m: &mut TreeArraysMut<'_>,
    group: &mut G,
) -> Result<()> {
    m.check(info.nnode)?;
    match &info.layout {
        ScheduleLayout::WarpCyclic(ws) => solve_warp_cyclic(ws, m, group),
        ScheduleLayout::PerCell(cs) => {
            solve_per_cell(cs, info.ncell, m);
            Ok(())
        }
    }
}

/// Reference Hines solve in the current numbering, no schedule needed.
///
/// Requires the solution-order invariant.
pub fn solve_sequential(ncell: usize, m: &mut TreeArraysMut<'_>) -> Result<()> {
    let nnode = m.nnode();
    m.check(nnode)?;
    check_solution_order(m.parent, ncell)?;

    for i in (ncell..nnode).rev() {
        m.eliminate(i);
    }
    for r in 0..ncell {
        m.solve_root(r);
    }
    for i in ncell..nnode {
        m.substitute(i);
    }
    Ok(())
}
