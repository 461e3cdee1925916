// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Solver Backend Abstraction
//!
//! Provides a unified interface for the places a thread's tree solve can run
//! (host CPU, GPU via WGPU). The dispatcher picks a backend per thread from
//! the thread's residency flag; the algorithm is the same on both.

mod cpu;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

use hines_solver_runtime::MatrixStorage;
use hines_solver_tree::InterleaveInfo;
use tracing::{info, warn};

use crate::error::{Result, SolverError};

/// Solver backend trait (CPU, GPU)
///
/// Methods take `&self` so one backend can serve many threads at once;
/// backends with per-thread state keep it behind their own locks.
///
/// Generic over:
/// - `S: MatrixStorage` - thread storage implementation
pub trait SolverBackend<S: MatrixStorage>: Send + Sync {
    /// Get backend type name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Mirror a thread's schedule to the backend.
    ///
    /// Called before every solve with the store's slot generation; backends
    /// that keep a mirror re-upload only when the generation changed. For
    /// CPU backends this is a no-op.
    fn upload_schedule(
        &self,
        _ith: usize,
        _generation: u64,
        _info: &InterleaveInfo,
        _state: &S,
    ) -> Result<()> {
        Ok(())
    }

    /// Run (or submit) the solve for one thread
    fn solve(&self, ith: usize, info: &InterleaveInfo, state: &mut S) -> Result<()>;

    /// Wait for outstanding work of one thread and make results visible in
    /// `state`. Must be called before anything reads `RHS`.
    fn synchronize(&self, _ith: usize, _state: &mut S) -> Result<()> {
        Ok(())
    }

    /// Drop any per-thread mirror after a topology change
    fn on_topology_change(&self, _ith: usize) {}
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Host CPU with lock-step emulation
    #[default]
    Cpu,

    /// GPU via WGPU (Metal/Vulkan/DirectX - cross-platform)
    Wgpu,

    /// WGPU when an f64-capable adapter is present, CPU otherwise
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Cpu => write!(f, "cpu"),
            BackendType::Wgpu => write!(f, "wgpu"),
            BackendType::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(BackendType::Cpu),
            "wgpu" | "gpu" => Ok(BackendType::Wgpu),
            "auto" => Ok(BackendType::Auto),
            _ => Err(SolverError::InvalidBackend(s.to_string())),
        }
    }
}

/// Turn `Auto` into a concrete backend and reject what this build cannot do
pub fn resolve_backend(requested: BackendType) -> Result<BackendType> {
    match requested {
        BackendType::Cpu => Ok(BackendType::Cpu),
        BackendType::Wgpu => {
            if cfg!(feature = "gpu") {
                Ok(BackendType::Wgpu)
            } else {
                Err(SolverError::InvalidBackend(
                    "wgpu requested but the 'gpu' feature is not enabled".to_string(),
                ))
            }
        }
        BackendType::Auto => {
            if is_gpu_available() {
                info!("Backend auto-selection: wgpu (f64-capable adapter found)");
                Ok(BackendType::Wgpu)
            } else {
                if cfg!(feature = "gpu") {
                    warn!("Backend auto-selection: no f64-capable GPU adapter, using cpu");
                }
                Ok(BackendType::Cpu)
            }
        }
    }
}

/// Check if a GPU adapter with f64 shader support is available
#[cfg(feature = "gpu")]
pub fn is_gpu_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .map(|adapter| adapter.features().contains(wgpu::Features::SHADER_F64))
    .unwrap_or(false)
}

/// Check if a GPU adapter with f64 shader support is available
#[cfg(not(feature = "gpu"))]
pub fn is_gpu_available() -> bool {
    false
}
