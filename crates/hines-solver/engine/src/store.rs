// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Interleave Store
//!
//! One schedule slot per simulation thread, allocated once for the run.
//! Each slot carries a generation that bumps on every `set` and `invalidate`
//! so device backends can tell a stale mirror from a current one.

use hines_solver_tree::InterleaveInfo;

use crate::error::{Result, SolverError};

#[derive(Debug, Clone, Default)]
struct Slot {
    info: Option<InterleaveInfo>,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct InterleaveStore {
    slots: Vec<Slot>,
}

impl InterleaveStore {
    /// Allocate `nthread` empty slots
    pub fn create(nthread: usize) -> Self {
        Self {
            slots: vec![Slot::default(); nthread],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store a thread's schedule, returning the slot's new generation
    pub fn set(&mut self, ith: usize, info: InterleaveInfo) -> Result<u64> {
        let slot = self.slot_mut(ith)?;
        slot.info = Some(info);
        slot.generation += 1;
        Ok(slot.generation)
    }

    pub fn get(&self, ith: usize) -> Option<&InterleaveInfo> {
        self.slots.get(ith).and_then(|slot| slot.info.as_ref())
    }

    pub fn generation(&self, ith: usize) -> Option<u64> {
        self.slots.get(ith).map(|slot| slot.generation)
    }

    /// Drop a thread's schedule after a topology change
    pub fn invalidate(&mut self, ith: usize) -> Result<()> {
        let slot = self.slot_mut(ith)?;
        if slot.info.take().is_some() {
            slot.generation += 1;
        }
        Ok(())
    }

    /// Free every slot
    pub fn destroy(&mut self) {
        self.slots.clear();
    }

    fn slot_mut(&mut self, ith: usize) -> Result<&mut Slot> {
        let nthread = self.slots.len();
        self.slots
            .get_mut(ith)
            .ok_or(SolverError::InvalidThread { thread: ith, nthread })
    }
}
