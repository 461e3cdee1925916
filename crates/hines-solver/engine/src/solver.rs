// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Tree Solver Dispatcher
//!
//! Owns the per-thread schedule store and the backends, and routes every
//! thread's solve:
//!
//! ```text
//! solve_thread(ith)
//!   empty thread            -> nothing to do
//!   no schedule, GPU thread -> MissingSchedule (hard error)
//!   no schedule, CPU thread -> sequential Hines solve in current numbering
//!   GPU thread              -> mirror if stale, submit, synchronize
//!   CPU thread              -> lock-step emulated interleaved solve
//! ```

use std::marker::PhantomData;

use hines_solver_runtime::MatrixStorage;
use hines_solver_tree::{interleave_order, solve_sequential};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::backend::{resolve_backend, BackendType, CpuBackend, SolverBackend};
#[cfg(feature = "gpu")]
use crate::backend::WgpuBackend;
use crate::error::{Result, SolverError};
use crate::settings::SolverSettings;
use crate::store::InterleaveStore;

/// How one thread's solve was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePath {
    /// Thread has no compartments
    Skipped,
    /// No schedule: reference solve in the current numbering
    Sequential,
    /// Interleaved solve on the host
    Cpu,
    /// Interleaved solve on the accelerator
    Gpu,
}

/// Running counters across all solves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub schedules_built: u64,
    pub cpu_solves: u64,
    pub gpu_solves: u64,
    pub sequential_fallbacks: u64,
}

impl SolverStats {
    fn record(&mut self, path: SolvePath) {
        match path {
            SolvePath::Skipped => {}
            SolvePath::Sequential => self.sequential_fallbacks += 1,
            SolvePath::Cpu => self.cpu_solves += 1,
            SolvePath::Gpu => self.gpu_solves += 1,
        }
    }
}

/// Interleaved Hines solver for every thread of a simulation
pub struct TreeSolver<S: MatrixStorage> {
    settings: SolverSettings,
    backend_type: BackendType,
    store: InterleaveStore,
    cpu: CpuBackend,
    #[cfg(feature = "gpu")]
    gpu: Option<WgpuBackend>,
    stats: SolverStats,
    _storage: PhantomData<fn(&mut S)>,
}

impl<S: MatrixStorage> TreeSolver<S> {
    /// Create a solver; `Auto` resolves to a GPU backend only when one is
    /// usable. The schedule store starts empty.
    pub fn new(settings: SolverSettings, backend: BackendType) -> Result<Self> {
        settings.validate()?;
        let backend_type = resolve_backend(backend)?;

        #[cfg(feature = "gpu")]
        let gpu = match backend_type {
            BackendType::Wgpu => Some(WgpuBackend::new(settings.warpsize)?),
            _ => None,
        };

        info!(
            "Tree solver created: mode {}, warpsize {}, backend {}",
            settings.mode, settings.warpsize, backend_type
        );

        Ok(Self {
            settings,
            backend_type,
            store: InterleaveStore::default(),
            cpu: CpuBackend::new(),
            #[cfg(feature = "gpu")]
            gpu,
            stats: SolverStats::default(),
            _storage: PhantomData,
        })
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    pub fn store(&self) -> &InterleaveStore {
        &self.store
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Allocate one empty schedule slot per thread
    pub fn create_interleave_info(&mut self, nthread: usize) {
        self.store = InterleaveStore::create(nthread);
        debug!("Interleave store created for {} threads", nthread);
    }

    /// Free every schedule (shutdown or global topology change)
    pub fn destroy_interleave_info(&mut self) {
        for ith in 0..self.store.len() {
            if let Some(gpu) = self.gpu_backend() {
                gpu.on_topology_change(ith);
            }
        }
        self.store.destroy();
    }

    /// Build the thread's schedule, renumber its state into solution order
    /// and cache the schedule. Returns the permutation `order[old] = new`.
    pub fn setup_thread(&mut self, ith: usize, state: &mut S) -> Result<Vec<usize>> {
        self.check_thread(ith)?;
        let settings = self.settings;

        let (order, mut info) = interleave_order(
            state.ncell(),
            state.parents(),
            settings.mode,
            settings.warpsize,
            settings.nwarp,
        )?;
        state.apply_permutation(&order)?;

        if settings.validate_schedules {
            info.validate(state.parents())?;
        }
        if settings.collect_statistics {
            info = info.with_statistics(state.parents());
            if let Some(stats) = &info.stats {
                let total = stats.total();
                debug!(
                    "[SCHEDULE] thread {}: {} groups, {} cycles, {} idle lanes, {} cache lines, {} child races, lane efficiency {:.3}",
                    ith,
                    stats.groups.len(),
                    total.ncycle,
                    total.idle,
                    total.cache_access,
                    total.child_race,
                    stats.lane_efficiency()
                );
            }
        }

        let generation = self.store.set(ith, info)?;

        if state.compute_gpu() {
            if let Err(e) = self.mirror_schedule(ith, generation, state) {
                // Drop the schedule the device never received
                self.invalidate_thread(ith)?;
                return Err(e);
            }
        }
        self.stats.schedules_built += 1;

        info!(
            "Thread {} schedule ready: {} cells, {} nodes ({})",
            ith,
            state.ncell(),
            state.node_count(),
            settings.mode
        );
        Ok(order)
    }

    /// Mark a thread's topology as changed; the next solve needs a new setup
    pub fn invalidate_thread(&mut self, ith: usize) -> Result<()> {
        self.store.invalidate(ith)?;
        if let Some(gpu) = self.gpu_backend() {
            gpu.on_topology_change(ith);
        }
        Ok(())
    }

    /// Solve one thread, returning only once `RHS` holds the solution
    pub fn solve_thread(&mut self, ith: usize, state: &mut S) -> Result<SolvePath> {
        self.check_thread(ith)?;
        let path = self.submit(ith, state)?;
        if path == SolvePath::Gpu {
            self.require_gpu(ith)?.synchronize(ith, state)?;
        }
        self.stats.record(path);
        Ok(path)
    }

    /// Solve every thread: `states[ith]` belongs to thread `ith`.
    ///
    /// CPU threads run concurrently on the rayon pool; GPU threads are all
    /// submitted first and then waited on.
    pub fn solve_all(&mut self, states: &mut [S]) -> Result<Vec<SolvePath>> {
        if states.len() > self.store.len() {
            return Err(SolverError::InvalidThread {
                thread: states.len() - 1,
                nthread: self.store.len(),
            });
        }

        let this = &*self;
        let mut paths: Vec<SolvePath> = states
            .par_iter_mut()
            .enumerate()
            .map(|(ith, state)| {
                if state.compute_gpu() {
                    // Device submission stays on the calling thread
                    Ok(SolvePath::Skipped)
                } else {
                    this.submit(ith, state)
                }
            })
            .collect::<Result<_>>()?;

        for (ith, state) in states.iter_mut().enumerate() {
            if state.compute_gpu() {
                paths[ith] = self.submit(ith, state)?;
            }
        }
        for (ith, state) in states.iter_mut().enumerate() {
            if paths[ith] == SolvePath::Gpu {
                self.require_gpu(ith)?.synchronize(ith, state)?;
            }
        }

        for &path in &paths {
            self.stats.record(path);
        }
        Ok(paths)
    }

    /// Start a thread's solve; GPU work is left in flight
    fn submit(&self, ith: usize, state: &mut S) -> Result<SolvePath> {
        if state.is_empty() {
            return Ok(SolvePath::Skipped);
        }

        let Some(info) = self.store.get(ith) else {
            if state.compute_gpu() {
                return Err(SolverError::MissingSchedule {
                    thread: ith,
                    nnode: state.node_count(),
                });
            }
            warn!(
                "Thread {} has no interleave schedule, falling back to sequential solve",
                ith
            );
            solve_sequential(state.ncell(), &mut state.tree_arrays_mut())?;
            return Ok(SolvePath::Sequential);
        };

        if state.compute_gpu() {
            let gpu = self.require_gpu(ith)?;
            let generation = self.store.generation(ith).unwrap_or(0);
            gpu.upload_schedule(ith, generation, info, state)?;
            gpu.solve(ith, info, state)?;
            Ok(SolvePath::Gpu)
        } else {
            SolverBackend::<S>::solve(&self.cpu, ith, info, state)?;
            Ok(SolvePath::Cpu)
        }
    }

    fn mirror_schedule(&self, ith: usize, generation: u64, state: &S) -> Result<()> {
        let info = self.store.get(ith).ok_or(SolverError::MissingSchedule {
            thread: ith,
            nnode: state.node_count(),
        })?;
        self.require_gpu(ith)?
            .upload_schedule(ith, generation, info, state)
    }

    fn check_thread(&self, ith: usize) -> Result<()> {
        if ith >= self.store.len() {
            return Err(SolverError::InvalidThread {
                thread: ith,
                nthread: self.store.len(),
            });
        }
        Ok(())
    }

    #[cfg(feature = "gpu")]
    fn gpu_backend(&self) -> Option<&dyn SolverBackend<S>> {
        self.gpu.as_ref().map(|gpu| gpu as &dyn SolverBackend<S>)
    }

    #[cfg(not(feature = "gpu"))]
    fn gpu_backend(&self) -> Option<&dyn SolverBackend<S>> {
        None
    }

    fn require_gpu(&self, ith: usize) -> Result<&dyn SolverBackend<S>> {
        self.gpu_backend().ok_or_else(|| {
            SolverError::Gpu(format!(
                "Thread {} is GPU resident but no GPU backend is active",
                ith
            ))
        })
    }
}
