// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # WGPU Backend
//!
//! GPU tree solve using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows) on adapters
//! exposing `SHADER_F64`.
//!
//! Per thread the backend keeps a schedule mirror (one packed `u32` arena),
//! the parent array, the coefficients and a staging buffer for readback.
//! `solve` writes the coefficients, dispatches and queues the readback copy;
//! `synchronize` waits on that submission and copies `D`/`RHS` back.

use ahash::AHashMap;
use hines_solver_runtime::MatrixStorage;
use hines_solver_tree::{InterleaveInfo, ScheduleLayout, SolverMode, NO_PARENT};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use super::SolverBackend;
use crate::error::{Result, SolverError};

const SHADER_SOURCE: &str = include_str!("shaders/tree_solve.wgsl");

/// Invocations per workgroup of the per-cell entry point
const PER_CELL_WORKGROUP: u32 = 64;

/// Uniform block mirrored by `Params` in the shader
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParams {
    nnode: u32,
    ncell: u32,
    ngroup: u32,
    mode: u32,
    off_stride: u32,
    off_stridedispl: u32,
    off_rootbegin: u32,
    off_firstnode: u32,
    off_lastnode: u32,
    off_ncycle: u32,
    _pad0: u32,
    _pad1: u32,
}

/// Device mirror of one thread
struct ThreadBuffers {
    generation: u64,
    /// Stream the mirror was built for; a residency move rebuilds it
    stream: usize,
    mode: SolverMode,
    nnode: usize,
    ngroup: u32,
    ab: wgpu::Buffer,
    d: wgpu::Buffer,
    rhs: wgpu::Buffer,
    staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    // Keep the bound buffers alive alongside the bind group
    _params: wgpu::Buffer,
    _schedule: wgpu::Buffer,
    _parent: wgpu::Buffer,
    /// Submission the next `synchronize` waits on
    pending: Option<wgpu::SubmissionIndex>,
}

/// WGPU backend for GPU tree solves
pub struct WgpuBackend {
    /// Backend name for logging
    name: String,

    device: wgpu::Device,
    queue: wgpu::Queue,

    warpsize: usize,
    warp_cyclic_pipeline: wgpu::ComputePipeline,
    per_cell_pipeline: wgpu::ComputePipeline,

    /// Per-thread device buffers, keyed by thread index
    threads: Mutex<AHashMap<usize, ThreadBuffers>>,
}

impl WgpuBackend {
    /// Create a backend whose warp-cyclic kernel runs `warpsize` lanes per
    /// workgroup
    pub fn new(warpsize: usize) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| SolverError::Gpu("Failed to find WGPU adapter".to_string()))?;

        if !adapter.features().contains(wgpu::Features::SHADER_F64) {
            return Err(SolverError::Gpu(
                "Adapter does not support f64 shaders".to_string(),
            ));
        }

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Hines Solver Device"),
                required_features: wgpu::Features::SHADER_F64,
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| SolverError::Gpu(format!("Failed to create device: {}", e)))?;

        let limits = device.limits();
        if warpsize as u32 > limits.max_compute_workgroup_size_x
            || warpsize as u32 > limits.max_compute_invocations_per_workgroup
        {
            return Err(SolverError::Gpu(format!(
                "Warp size {} exceeds the device workgroup limit {}",
                warpsize, limits.max_compute_workgroup_size_x
            )));
        }

        let source = SHADER_SOURCE.replace("{{WARPSIZE}}", &warpsize.to_string());
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Tree Solve Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let warp_cyclic_pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Warp-Cyclic Tree Solve Pipeline"),
                layout: None, // Auto-layout from shader
                module: &module,
                entry_point: "warp_cyclic_main",
            });
        let per_cell_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Per-Cell Tree Solve Pipeline"),
            layout: None,
            module: &module,
            entry_point: "per_cell_main",
        });

        info!("{} ready, warp size {}", name, warpsize);

        Ok(Self {
            name,
            device,
            queue,
            warpsize,
            warp_cyclic_pipeline,
            per_cell_pipeline,
            threads: Mutex::new(AHashMap::new()),
        })
    }

    fn pipeline(&self, mode: SolverMode) -> &wgpu::ComputePipeline {
        match mode {
            SolverMode::WarpCyclic => &self.warp_cyclic_pipeline,
            SolverMode::PerCell => &self.per_cell_pipeline,
        }
    }

    fn storage_buffer(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        // Zero-sized bindings are invalid; pad empty arrays to one word
        let size = contents.len().max(8) as u64;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if !contents.is_empty() {
            self.queue.write_buffer(&buffer, 0, contents);
        }
        buffer
    }

    fn build_thread_buffers<S: MatrixStorage>(
        &self,
        generation: u64,
        info: &InterleaveInfo,
        state: &S,
    ) -> Result<ThreadBuffers> {
        let arena = info.to_arena()?;
        if let ScheduleLayout::WarpCyclic(ws) = &info.layout {
            if ws.warpsize > self.warpsize {
                return Err(SolverError::Gpu(format!(
                    "Schedule packed for {} lanes but the kernel runs {}",
                    ws.warpsize, self.warpsize
                )));
            }
        }

        let nnode = state.node_count();
        let to_u32 = |v: usize| -> Result<u32> {
            u32::try_from(v).map_err(|_| SolverError::Gpu(format!("{} exceeds u32 range", v)))
        };
        let parent: Vec<u32> = state
            .parents()
            .iter()
            .map(|&p| if p == NO_PARENT { Ok(u32::MAX) } else { to_u32(p) })
            .collect::<Result<_>>()?;

        let o = arena.offsets;
        let params = GpuParams {
            nnode: to_u32(nnode)?,
            ncell: to_u32(state.ncell())?,
            ngroup: arena.ngroup,
            mode: match arena.mode {
                SolverMode::WarpCyclic => 0,
                SolverMode::PerCell => 1,
            },
            off_stride: o.stride,
            off_stridedispl: o.stridedispl,
            off_rootbegin: o.rootbegin,
            off_firstnode: o.firstnode,
            off_lastnode: o.lastnode,
            off_ncycle: o.ncycle,
            _pad0: 0,
            _pad1: 0,
        };

        let f64_bytes = (nnode * std::mem::size_of::<f64>()) as u64;
        let params_buffer = self.storage_buffer(
            "Tree Params",
            bytemuck::bytes_of(&params),
            wgpu::BufferUsages::UNIFORM,
        );
        let schedule = self.storage_buffer(
            "Tree Schedule",
            bytemuck::cast_slice(&arena.data),
            wgpu::BufferUsages::STORAGE,
        );
        let parent_buffer = self.storage_buffer(
            "Tree Parent",
            bytemuck::cast_slice(&parent),
            wgpu::BufferUsages::STORAGE,
        );
        let ab = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tree A|B"),
            size: 2 * f64_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let readwrite = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;
        let d = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tree D"),
            size: f64_bytes,
            usage: readwrite,
            mapped_at_creation: false,
        });
        let rhs = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tree RHS"),
            size: f64_bytes,
            usage: readwrite,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tree D|RHS Staging"),
            size: 2 * f64_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = self.pipeline(info.mode()).get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tree Solve Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: schedule.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: parent_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: ab.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: d.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: rhs.as_entire_binding(),
                },
            ],
        });

        Ok(ThreadBuffers {
            generation,
            stream: state.stream_id(),
            mode: info.mode(),
            nnode,
            ngroup: arena.ngroup,
            ab,
            d,
            rhs,
            staging,
            bind_group,
            _params: params_buffer,
            _schedule: schedule,
            _parent: parent_buffer,
            pending: None,
        })
    }
}

impl<S: MatrixStorage> SolverBackend<S> for WgpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn upload_schedule(
        &self,
        ith: usize,
        generation: u64,
        info: &InterleaveInfo,
        state: &S,
    ) -> Result<()> {
        if state.is_empty() {
            return Ok(());
        }
        let mut threads = self.threads.lock();
        if let Some(existing) = threads.get(&ith) {
            if existing.generation == generation
                && existing.nnode == state.node_count()
                && existing.stream == state.stream_id()
            {
                return Ok(());
            }
        }
        let buffers = self.build_thread_buffers(generation, info, state)?;
        debug!(
            target: "hines-solver-engine",
            "[WGPU] thread {} schedule mirrored (generation {}, stream {}, {} nodes)",
            ith,
            generation,
            buffers.stream,
            buffers.nnode
        );
        threads.insert(ith, buffers);
        Ok(())
    }

    fn solve(&self, ith: usize, _info: &InterleaveInfo, state: &mut S) -> Result<()> {
        let mut threads = self.threads.lock();
        let buffers = threads
            .get_mut(&ith)
            .ok_or(SolverError::MissingSchedule {
                thread: ith,
                nnode: state.node_count(),
            })?;
        if buffers.nnode != state.node_count() {
            return Err(SolverError::Gpu(format!(
                "Thread {} mirror holds {} nodes, state has {}",
                ith,
                buffers.nnode,
                state.node_count()
            )));
        }

        let nnode = buffers.nnode;
        let f64_bytes = (nnode * std::mem::size_of::<f64>()) as u64;
        self.queue
            .write_buffer(&buffers.ab, 0, bytemuck::cast_slice(state.a()));
        self.queue
            .write_buffer(&buffers.ab, f64_bytes, bytemuck::cast_slice(state.b()));
        self.queue
            .write_buffer(&buffers.d, 0, bytemuck::cast_slice(state.d()));
        self.queue
            .write_buffer(&buffers.rhs, 0, bytemuck::cast_slice(state.rhs()));

        let workgroups = match buffers.mode {
            SolverMode::WarpCyclic => buffers.ngroup,
            SolverMode::PerCell => buffers.ngroup.div_ceil(PER_CELL_WORKGROUP),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Tree Solve Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Tree Solve Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(self.pipeline(buffers.mode));
            compute_pass.set_bind_group(0, &buffers.bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&buffers.d, 0, &buffers.staging, 0, f64_bytes);
        encoder.copy_buffer_to_buffer(&buffers.rhs, 0, &buffers.staging, f64_bytes, f64_bytes);

        buffers.pending = Some(self.queue.submit(Some(encoder.finish())));
        Ok(())
    }

    fn synchronize(&self, ith: usize, state: &mut S) -> Result<()> {
        let mut threads = self.threads.lock();
        let Some(buffers) = threads.get_mut(&ith) else {
            return Ok(());
        };
        let Some(submission) = buffers.pending.take() else {
            return Ok(());
        };

        self.device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(submission));

        let buffer_slice = buffers.staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| SolverError::Gpu("Failed to receive staging map result".to_string()))?
            .map_err(|e| SolverError::Gpu(format!("Failed to map staging buffer: {:?}", e)))?;

        {
            let data = buffer_slice.get_mapped_range();
            let values: &[f64] = bytemuck::cast_slice(&data);
            let (d, rhs) = values.split_at(buffers.nnode);
            state.d_mut().copy_from_slice(d);
            state.rhs_mut().copy_from_slice(rhs);
        }
        buffers.staging.unmap();
        trace!(
            target: "hines-solver-engine",
            "[WGPU] thread {} synchronized on stream {}",
            ith,
            buffers.stream
        );
        Ok(())
    }

    fn on_topology_change(&self, ith: usize) {
        self.threads.lock().remove(&ith);
    }
}
