// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Simulation
//!
//! Wires a validated [`HinesConfig`] into a [`TreeSolver`] and owns one
//! [`ThreadState`] per simulation thread.
//!
//! Per timestep the caller assembles `A/B/D/RHS` into each thread (in the
//! thread's solution numbering, see [`Simulation::order`]) and calls
//! [`Simulation::step`].

use hines_config::{validate_config, ConfigError, ExecutionConfig, HinesConfig, LoggingConfig, SolverConfig};
use hines_observability::{CrateDebugFlags, LogSettings, LoggingGuard};
use hines_solver_engine::{BackendType, SolvePath, SolverError, SolverSettings, TreeSolver};
use hines_solver_runtime::{RuntimeError, ThreadState};
use hines_solver_tree::{SolverMode, TreeError};
use tracing::info;

/// Errors surfaced by the umbrella crate
#[derive(Debug, thiserror::Error)]
pub enum HinesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, HinesError>;

/// `[solver]` section to engine settings
pub fn settings_from_config(config: &SolverConfig) -> Result<SolverSettings> {
    let mode: SolverMode = config.mode.parse()?;
    let settings = SolverSettings {
        mode,
        warpsize: config.warpsize,
        nwarp: config.nwarp_override(),
        collect_statistics: config.collect_statistics,
        validate_schedules: config.validate_schedules,
    };
    settings.validate()?;
    Ok(settings)
}

/// `[execution]` section to a backend request
pub fn backend_from_config(config: &ExecutionConfig) -> Result<BackendType> {
    Ok(config.backend.parse()?)
}

/// `[logging]` section to logging options
pub fn log_settings_from_config(config: &LoggingConfig) -> LogSettings {
    let settings = LogSettings::default().with_level(config.level.to_lowercase());
    if config.log_dir.is_empty() {
        settings
    } else {
        settings.with_log_dir(&config.log_dir)
    }
}

/// Install logging from config; `debug_crates`, `--debug-*` and
/// `HINES_DEBUG` are merged
pub fn init_logging_from_config(config: &HinesConfig) -> anyhow::Result<LoggingGuard> {
    let mut flags: CrateDebugFlags = hines_observability::parse_debug_flags();
    for crate_name in &config.logging.debug_crates {
        flags.enable(crate_name);
    }
    hines_observability::init_logging(&log_settings_from_config(&config.logging), &flags)
}

/// Solver plus per-thread numeric state for a whole run
pub struct Simulation {
    solver: TreeSolver<ThreadState>,
    threads: Vec<ThreadState>,
    /// `orders[ith][old] = new` from the last setup of each thread
    orders: Vec<Vec<usize>>,
}

impl Simulation {
    /// Validate the configuration and build an empty simulation with
    /// `execution.nthread` threads
    pub fn from_config(config: &HinesConfig) -> Result<Self> {
        validate_config(config)?;
        let settings = settings_from_config(&config.solver)?;
        let backend = backend_from_config(&config.execution)?;
        Self::new(settings, backend, config.execution.nthread)
    }

    pub fn new(settings: SolverSettings, backend: BackendType, nthread: usize) -> Result<Self> {
        let mut solver = TreeSolver::new(settings, backend)?;
        solver.create_interleave_info(nthread);
        info!(
            "Simulation ready: {} threads, {} mode on {}",
            nthread,
            settings.mode,
            solver.backend_type()
        );
        Ok(Self {
            solver,
            threads: vec![ThreadState::new(0); nthread],
            orders: vec![Vec::new(); nthread],
        })
    }

    pub fn nthread(&self) -> usize {
        self.threads.len()
    }

    pub fn solver(&self) -> &TreeSolver<ThreadState> {
        &self.solver
    }

    /// Install a topology into thread `ith` and build its schedule.
    ///
    /// Returns `order[old] = new`; rows must be assembled at `order[old]`.
    /// Residency set through [`Simulation::set_gpu`] is kept. On error the
    /// previous state stays in place without a schedule.
    pub fn load_thread(&mut self, ith: usize, ncell: usize, parent: &[usize]) -> Result<&[usize]> {
        let current = self.thread(ith)?;
        let (compute_gpu, stream_id) = (current.compute_gpu, current.stream_id);

        let mut state = ThreadState::from_topology(ncell, parent)?;
        state.compute_gpu = compute_gpu;
        state.stream_id = stream_id;

        self.solver.invalidate_thread(ith)?;
        let order = self.solver.setup_thread(ith, &mut state)?;
        self.threads[ith] = state;
        self.orders[ith] = order;
        Ok(&self.orders[ith])
    }

    /// Mark thread `ith` as GPU resident from the next step on; the current
    /// schedule is mirrored to the device on first use
    pub fn set_gpu(&mut self, ith: usize, stream_id: usize) -> Result<()> {
        let state = self.thread_mut(ith)?;
        state.compute_gpu = true;
        state.stream_id = stream_id;
        Ok(())
    }

    /// The thread's topology changed outside [`Simulation::load_thread`];
    /// its next solve runs without a schedule until reloaded
    pub fn topology_changed(&mut self, ith: usize) -> Result<()> {
        self.solver.invalidate_thread(ith)?;
        Ok(())
    }

    pub fn thread(&self, ith: usize) -> Result<&ThreadState> {
        let nthread = self.threads.len();
        self.threads
            .get(ith)
            .ok_or(HinesError::Solver(SolverError::InvalidThread { thread: ith, nthread }))
    }

    pub fn thread_mut(&mut self, ith: usize) -> Result<&mut ThreadState> {
        let nthread = self.threads.len();
        self.threads
            .get_mut(ith)
            .ok_or(HinesError::Solver(SolverError::InvalidThread { thread: ith, nthread }))
    }

    /// Permutation from the last load of thread `ith`
    pub fn order(&self, ith: usize) -> Option<&[usize]> {
        self.orders.get(ith).map(Vec::as_slice)
    }

    /// Solve every thread in place
    pub fn step(&mut self) -> Result<Vec<SolvePath>> {
        Ok(self.solver.solve_all(&mut self.threads)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = settings_from_config(&SolverConfig::default()).unwrap();
        assert_eq!(settings, SolverSettings::default());
    }

    #[test]
    fn test_bad_mode_is_tree_error() {
        let config = SolverConfig {
            mode: "diagonal".to_string(),
            ..SolverConfig::default()
        };
        assert!(matches!(
            settings_from_config(&config),
            Err(HinesError::Tree(TreeError::InvalidMode(_)))
        ));
    }

    #[test]
    fn test_log_dir_only_when_set() {
        let mut logging = LoggingConfig::default();
        assert!(log_settings_from_config(&logging).log_dir.is_none());
        logging.log_dir = "logs".to_string();
        logging.level = "DEBUG".to_string();
        let settings = log_settings_from_config(&logging);
        assert_eq!(settings.level, "debug");
        assert!(settings.log_dir.is_some());
    }
}
