// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Interleave Schedule
//!
//! Per-thread execution schedule produced by the ordering oracle and consumed
//! by the elimination kernels. A schedule only stores node ids and lengths;
//! the numeric arrays it indexes into stay with the thread state.
//!
//! ## Warp-cyclic layout
//! ```text
//! roots:  [rootbegin[0] .. rootbegin[1]) [rootbegin[1] .. rootbegin[2]) ...
//! nodes:  [firstnode[0] .. lastnode[0])  [firstnode[1] .. lastnode[1])  ...
//!          cycle 0 | cycle 1 | ...        (stride[c] consecutive ids per cycle)
//! stride: [stridedispl[w] .. stridedispl[w+1]) belongs to warp w
//! ```
//!
//! ## Per-cell layout
//! Block `k` holds position `k` of every cell deep enough to have one,
//! `stride[k]` consecutive ids in cell order. Cell `c` starts at
//! `firstnode[c]`, steps forward by `stride[k]` and backward by `stride[k-1]`.

use core::ops::Range;

use crate::stats::InterleaveStatistics;
use crate::types::{Result, SolverMode, TreeError, NO_PARENT};

/// Warp-cyclic schedule (one entry per warp unless noted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpSchedule {
    /// Lane count per warp the schedule was packed for
    pub warpsize: usize,
    pub nwarp: usize,
    /// Active lanes per cycle, all warps concatenated
    pub stride: Vec<usize>,
    /// `nwarp + 1` displacements into `stride`
    pub stridedispl: Vec<usize>,
    /// `nwarp + 1` displacements into the root segment `[0, ncell)`
    pub rootbegin: Vec<usize>,
    /// First node of the shallowest cycle
    pub firstnode: Vec<usize>,
    /// One past the last node of the deepest cycle
    pub lastnode: Vec<usize>,
    /// Cycle count
    pub ncycle: Vec<usize>,
}

impl WarpSchedule {
    /// Total number of cycles across all warps
    pub fn nstride(&self) -> usize {
        self.stride.len()
    }

    pub fn warp_strides(&self, iwarp: usize) -> &[usize] {
        &self.stride[self.stridedispl[iwarp]..self.stridedispl[iwarp + 1]]
    }

    pub fn warp_roots(&self, iwarp: usize) -> Range<usize> {
        self.rootbegin[iwarp]..self.rootbegin[iwarp + 1]
    }

    fn validate(&self, parent: &[usize], ncell: usize) -> Result<()> {
        let nwarp = self.nwarp;
        let nnode = parent.len();
        check_len("stridedispl", &self.stridedispl, nwarp + 1)?;
        check_len("rootbegin", &self.rootbegin, nwarp + 1)?;
        check_len("firstnode", &self.firstnode, nwarp)?;
        check_len("lastnode", &self.lastnode, nwarp)?;
        check_len("ncycle", &self.ncycle, nwarp)?;

        if nwarp == 0 {
            if ncell != 0 || nnode != 0 {
                return Err(violation("no warps for a non-empty thread"));
            }
            return Ok(());
        }
        if self.rootbegin[0] != 0 || self.rootbegin[nwarp] != ncell {
            return Err(violation("root displacements do not span [0, ncell)"));
        }
        if self.stridedispl[0] != 0 || self.stridedispl[nwarp] != self.stride.len() {
            return Err(violation("stride displacements do not span the stride array"));
        }
        if self.firstnode[0] != ncell || self.lastnode[nwarp - 1] != nnode {
            return Err(violation("node segments do not span [ncell, nnode)"));
        }

        for w in 0..nwarp {
            if self.rootbegin[w] > self.rootbegin[w + 1] {
                return Err(violation(format!("warp {} roots decrease", w)));
            }
            if w + 1 < nwarp && self.lastnode[w] != self.firstnode[w + 1] {
                return Err(violation(format!("warp {} segment is not contiguous", w)));
            }
            let strides = self.warp_strides(w);
            if strides.len() != self.ncycle[w] {
                return Err(violation(format!("warp {} cycle count mismatch", w)));
            }
            if strides.iter().any(|&s| s == 0 || s > self.warpsize) {
                return Err(violation(format!("warp {} stride outside 1..=warpsize", w)));
            }

            // Forward walk: every node's parent is a warp root or sits in an
            // earlier cycle of the same warp
            let roots = self.warp_roots(w);
            let mut i = self.firstnode[w];
            for &istride in strides {
                let cycle_begin = i;
                for n in i..i + istride {
                    if n >= nnode {
                        return Err(violation(format!("warp {} walks past node {}", w, nnode)));
                    }
                    let p = parent[n];
                    let ok = roots.contains(&p) || (p >= self.firstnode[w] && p < cycle_begin);
                    if !ok {
                        return Err(violation(format!(
                            "node {} (warp {}) has parent {} outside its earlier cycles",
                            n, w, p as isize
                        )));
                    }
                }
                i += istride;
            }
            if i != self.lastnode[w] {
                return Err(violation(format!("warp {} forward walk ends at {}", w, i)));
            }

            // Backward walk from lastnode lands exactly on firstnode
            let mut j = self.lastnode[w];
            for &istride in strides.iter().rev() {
                j -= istride;
            }
            if j != self.firstnode[w] {
                return Err(violation(format!("warp {} backward walk ends at {}", w, j)));
            }
        }
        Ok(())
    }
}

/// Per-cell schedule (one entry per cell unless noted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSchedule {
    /// Deepest non-root node count among the thread's cells
    pub nstride: usize,
    /// Shared stride array, length `nstride`
    pub stride: Vec<usize>,
    /// First non-root node of the cell
    pub firstnode: Vec<usize>,
    /// Last non-root node of the cell (inclusive)
    pub lastnode: Vec<usize>,
    /// Number of strides the cell walks
    pub cellsize: Vec<usize>,
}

impl CellSchedule {
    fn validate(&self, parent: &[usize], ncell: usize) -> Result<()> {
        let nnode = parent.len();
        check_len("stride", &self.stride, self.nstride)?;
        check_len("firstnode", &self.firstnode, ncell)?;
        check_len("lastnode", &self.lastnode, ncell)?;
        check_len("cellsize", &self.cellsize, ncell)?;

        let mut owner = vec![NO_PARENT; nnode];
        let mut visited = 0usize;
        for c in 0..ncell {
            let size = self.cellsize[c];
            if size > self.nstride {
                return Err(violation(format!("cell {} walks past nstride", c)));
            }
            let mut i = self.firstnode[c];
            let mut last = i;
            for k in 0..size {
                if i >= nnode || i < ncell || owner[i] != NO_PARENT {
                    return Err(violation(format!("cell {} visits invalid node {}", c, i)));
                }
                let p = parent[i];
                let ok = p == c || (p < i && p < nnode && owner[p] == c);
                if !ok {
                    return Err(violation(format!(
                        "node {} (cell {}) has parent {} outside its cell",
                        i, c, p as isize
                    )));
                }
                owner[i] = c;
                visited += 1;
                last = i;
                i += self.stride[k];
            }
            if size > 0 && last != self.lastnode[c] {
                return Err(violation(format!("cell {} ends at {} not {}", c, last, self.lastnode[c])));
            }
        }
        if visited != nnode - ncell {
            return Err(violation(format!(
                "schedule covers {} of {} non-root nodes",
                visited,
                nnode - ncell
            )));
        }
        Ok(())
    }
}

/// Mode-specific layout of a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleLayout {
    WarpCyclic(WarpSchedule),
    PerCell(CellSchedule),
}

/// One thread's schedule plus optional tuning counters
#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveInfo {
    pub ncell: usize,
    pub nnode: usize,
    pub layout: ScheduleLayout,
    pub stats: Option<InterleaveStatistics>,
}

impl InterleaveInfo {
    pub fn new(ncell: usize, nnode: usize, layout: ScheduleLayout) -> Self {
        Self {
            ncell,
            nnode,
            layout,
            stats: None,
        }
    }

    pub fn mode(&self) -> SolverMode {
        match self.layout {
            ScheduleLayout::WarpCyclic(_) => SolverMode::WarpCyclic,
            ScheduleLayout::PerCell(_) => SolverMode::PerCell,
        }
    }

    /// Attach diagnostics computed against the permuted parent array
    pub fn with_statistics(mut self, parent: &[usize]) -> Self {
        self.stats = Some(InterleaveStatistics::compute(self.ncell, &self.layout, parent));
        self
    }

    /// Check the schedule against a parent array in schedule numbering.
    ///
    /// Verifies the walk contract of the layout: every non-root node is
    /// visited exactly once, parents are always visited before children, and
    /// the backward and forward walks agree.
    pub fn validate(&self, parent: &[usize]) -> Result<()> {
        if parent.len() != self.nnode {
            return Err(TreeError::ArraySizeMismatch {
                expected: self.nnode,
                actual: parent.len(),
            });
        }
        crate::types::check_solution_order(parent, self.ncell)?;
        match &self.layout {
            ScheduleLayout::WarpCyclic(ws) => ws.validate(parent, self.ncell),
            ScheduleLayout::PerCell(cs) => cs.validate(parent, self.ncell),
        }
    }

    /// Pack every schedule array into one `u32` buffer for device upload
    pub fn to_arena(&self) -> Result<ScheduleArena> {
        let mut data = Vec::new();
        let mut push = |values: &[usize]| -> Result<u32> {
            let offset = to_u32(data.len())?;
            for &v in values {
                data.push(to_u32(v)?);
            }
            Ok(offset)
        };

        let (offsets, ngroup) = match &self.layout {
            ScheduleLayout::WarpCyclic(ws) => {
                let offsets = ScheduleOffsets {
                    stride: push(&ws.stride)?,
                    stridedispl: push(&ws.stridedispl)?,
                    rootbegin: push(&ws.rootbegin)?,
                    firstnode: push(&ws.firstnode)?,
                    lastnode: push(&ws.lastnode)?,
                    ncycle: push(&ws.ncycle)?,
                };
                (offsets, ws.nwarp)
            }
            ScheduleLayout::PerCell(cs) => {
                let stride = push(&cs.stride)?;
                let empty = push(&[])?;
                let offsets = ScheduleOffsets {
                    stride,
                    stridedispl: empty,
                    rootbegin: empty,
                    firstnode: push(&cs.firstnode)?,
                    lastnode: push(&cs.lastnode)?,
                    ncycle: push(&cs.cellsize)?,
                };
                (offsets, self.ncell)
            }
        };

        Ok(ScheduleArena {
            mode: self.mode(),
            ngroup: to_u32(ngroup)?,
            offsets,
            data,
        })
    }
}

/// Word offsets of each schedule array inside [`ScheduleArena::data`].
///
/// In per-cell mode `ncycle` holds `cellsize` and the warp-only arrays are
/// empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleOffsets {
    pub stride: u32,
    pub stridedispl: u32,
    pub rootbegin: u32,
    pub firstnode: u32,
    pub lastnode: u32,
    pub ncycle: u32,
}

/// Flat device image of a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleArena {
    pub mode: SolverMode,
    /// Warps (warp-cyclic) or cells (per-cell)
    pub ngroup: u32,
    pub offsets: ScheduleOffsets,
    pub data: Vec<u32>,
}

fn to_u32(v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| violation(format!("index {} exceeds device range", v)))
}

fn check_len(name: &str, values: &[usize], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(violation(format!(
            "{} has {} entries, expected {}",
            name,
            values.len(),
            expected
        )));
    }
    Ok(())
}

fn violation(msg: impl Into<String>) -> TreeError {
    TreeError::ScheduleViolation(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root 0 with chain 0 <- 1 <- 2, hand-packed for a 1-warp schedule
    fn chain_schedule() -> InterleaveInfo {
        InterleaveInfo::new(
            1,
            3,
            ScheduleLayout::WarpCyclic(WarpSchedule {
                warpsize: 4,
                nwarp: 1,
                stride: vec![1, 1],
                stridedispl: vec![0, 2],
                rootbegin: vec![0, 1],
                firstnode: vec![1],
                lastnode: vec![3],
                ncycle: vec![2],
            }),
        )
    }

    #[test]
    fn test_validate_hand_packed_chain() {
        let info = chain_schedule();
        assert!(info.validate(&[NO_PARENT, 0, 1]).is_ok());
    }

    #[test]
    fn test_validate_rejects_same_cycle_parent() {
        let mut info = chain_schedule();
        if let ScheduleLayout::WarpCyclic(ws) = &mut info.layout {
            // Both chain nodes squeezed into one cycle: node 2's parent is co-active
            ws.stride = vec![2];
            ws.stridedispl = vec![0, 1];
            ws.ncycle = vec![1];
        }
        let err = info.validate(&[NO_PARENT, 0, 1]).unwrap_err();
        assert!(matches!(err, TreeError::ScheduleViolation(_)));
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let info = chain_schedule();
        assert!(matches!(
            info.validate(&[NO_PARENT, 0]),
            Err(TreeError::ArraySizeMismatch { .. })
        ));
    }

    #[test]
    fn test_arena_offsets() {
        let arena = chain_schedule().to_arena().unwrap();
        assert_eq!(arena.mode, SolverMode::WarpCyclic);
        assert_eq!(arena.ngroup, 1);
        let o = arena.offsets;
        assert_eq!(&arena.data[o.stride as usize..o.stride as usize + 2], &[1, 1]);
        assert_eq!(arena.data[o.lastnode as usize], 3);
        assert_eq!(arena.data[o.ncycle as usize], 2);
        assert_eq!(arena.data.len(), 2 + 2 + 2 + 1 + 1 + 1);
    }

    #[test]
    fn test_per_cell_validate() {
        // Two cells: cell 0 chain of two, cell 1 single child
        // ids: roots 0,1 ; block 0 = [2 (cell0), 3 (cell1)] ; block 1 = [4 (cell0)]
        let info = InterleaveInfo::new(
            2,
            5,
            ScheduleLayout::PerCell(CellSchedule {
                nstride: 2,
                stride: vec![2, 1],
                firstnode: vec![2, 3],
                lastnode: vec![4, 3],
                cellsize: vec![2, 1],
            }),
        );
        assert!(info.validate(&[NO_PARENT, NO_PARENT, 0, 1, 2]).is_ok());
        // Node 4 pointing into the other cell breaks the contract
        assert!(info.validate(&[NO_PARENT, NO_PARENT, 0, 1, 3]).is_err());
    }
}
