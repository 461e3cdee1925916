// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lock-step lane groups
//!
//! The kernels are written once against [`LaneGroup`]: a cycle body runs for
//! every lane and the group returns only after all lanes finished it. On a
//! GPU a lane group is a workgroup; on CPU it is emulated serially.

/// A fixed-width set of lanes executing cycles in lock-step
pub trait LaneGroup {
    /// Number of lanes
    fn width(&self) -> usize;

    /// Run `body(ic)` for every lane `ic` in `[0, width)`.
    ///
    /// Returns only once every lane has finished the body.
    fn run_cycle<F: FnMut(usize)>(&mut self, body: F);

    /// Barrier between cycles
    fn sync(&mut self) {}
}

/// CPU stand-in for a warp: lanes run one after another in lane order.
///
/// Since the lanes of a cycle never touch the same parent, serial execution
/// gives the same result as truly concurrent lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockstepEmulator {
    width: usize,
    /// Barriers issued so far
    pub barriers: usize,
    /// Lane bodies executed so far, active or not
    pub lane_steps: usize,
}

impl LockstepEmulator {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            barriers: 0,
            lane_steps: 0,
        }
    }
}

impl LaneGroup for LockstepEmulator {
    fn width(&self) -> usize {
        self.width
    }

    fn run_cycle<F: FnMut(usize)>(&mut self, mut body: F) {
        for ic in 0..self.width {
            body(ic);
        }
        self.lane_steps += self.width;
    }

    fn sync(&mut self) {
        self.barriers += 1;
    }
}
