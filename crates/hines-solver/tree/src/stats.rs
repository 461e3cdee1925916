// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Schedule diagnostics
//!
//! Advisory counters for tuning a schedule. Nothing here changes how a solve
//! runs; the dispatcher only logs them.

use crate::interleave::ScheduleLayout;

/// `f64` entries per 64-byte cache line
const LINE_WORDS: usize = 8;

/// Counters for one warp (warp-cyclic) or one stride level (per-cell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupStatistics {
    /// Nodes processed, roots included
    pub nnode: usize,
    pub ncycle: usize,
    /// Lane slots left empty across all cycles
    pub idle: usize,
    /// Distinct cache lines touched by parent updates, summed over cycles
    pub cache_access: usize,
    /// Parent updates that hit a parent already updated in the same cycle
    pub child_race: usize,
}

impl GroupStatistics {
    fn accumulate(&mut self, other: &GroupStatistics) {
        self.nnode += other.nnode;
        self.ncycle += other.ncycle;
        self.idle += other.idle;
        self.cache_access += other.cache_access;
        self.child_race += other.child_race;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterleaveStatistics {
    pub groups: Vec<GroupStatistics>,
}

impl InterleaveStatistics {
    pub fn compute(ncell: usize, layout: &ScheduleLayout, parent: &[usize]) -> Self {
        let mut scratch = Vec::new();
        let groups = match layout {
            ScheduleLayout::WarpCyclic(ws) => (0..ws.nwarp)
                .map(|w| {
                    let strides = ws.warp_strides(w);
                    let mut group = GroupStatistics {
                        nnode: ws.warp_roots(w).len(),
                        ..Default::default()
                    };
                    let mut i = ws.firstnode[w];
                    for &istride in strides {
                        let cycle = cycle_statistics(
                            &parent[i..i + istride],
                            ws.warpsize,
                            &mut scratch,
                        );
                        group.accumulate(&cycle);
                        i += istride;
                    }
                    group
                })
                .collect(),
            ScheduleLayout::PerCell(cs) => {
                let mut begin = ncell;
                cs.stride
                    .iter()
                    .map(|&istride| {
                        let group =
                            cycle_statistics(&parent[begin..begin + istride], ncell, &mut scratch);
                        begin += istride;
                        group
                    })
                    .collect()
            }
        };
        Self { groups }
    }

    pub fn total(&self) -> GroupStatistics {
        let mut total = GroupStatistics::default();
        for group in &self.groups {
            total.accumulate(group);
        }
        total
    }

    /// Fraction of lane slots doing work (1.0 means no idle lanes)
    pub fn lane_efficiency(&self) -> f64 {
        let total = self.total();
        let busy: usize = total.nnode;
        let slots = busy + total.idle;
        if slots == 0 {
            1.0
        } else {
            busy as f64 / slots as f64
        }
    }
}

/// Counters for one cycle whose active lanes update `parents`
fn cycle_statistics(parents: &[usize], lanes: usize, scratch: &mut Vec<usize>) -> GroupStatistics {
    scratch.clear();
    scratch.extend_from_slice(parents);
    scratch.sort_unstable();
    let before = scratch.len();
    scratch.dedup();
    let child_race = before - scratch.len();

    let mut lines = 0usize;
    let mut last_line = None;
    for &p in scratch.iter() {
        let line = p / LINE_WORDS;
        if last_line != Some(line) {
            lines += 1;
            last_line = Some(line);
        }
    }

    GroupStatistics {
        nnode: parents.len(),
        ncycle: 1,
        idle: lanes.saturating_sub(parents.len()),
        cache_access: lines,
        child_race,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_statistics_counts_races_and_lines() {
        let mut scratch = Vec::new();
        let s = cycle_statistics(&[0, 0, 9, 3], 8, &mut scratch);
        assert_eq!(s.child_race, 1);
        // parents 0 and 3 share line 0, parent 9 is on line 1
        assert_eq!(s.cache_access, 2);
        assert_eq!(s.idle, 4);
        assert_eq!(s.nnode, 4);
    }

    #[test]
    fn test_lane_efficiency_empty() {
        assert_eq!(InterleaveStatistics::default().lane_efficiency(), 1.0);
    }
}
