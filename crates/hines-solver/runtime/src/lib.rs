// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Hines Runtime Abstraction
//!
//! Per-thread matrix storage for the tree solver.
//!
//! This crate provides:
//! - **Traits**: `MatrixStorage`, the slice view the engine solves against
//! - **Std Implementation**: `ThreadState`, padded `Vec` arrays
//!
//! ## Usage
//!
//! ```rust
//! use hines_solver_runtime::{MatrixStorage, ThreadState};
//!
//! let state = ThreadState::from_topology(1, &[0, 0, 1]).unwrap();
//! assert_eq!(state.node_count(), 3);
//! ```

#![warn(missing_docs)]

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Traits module (always available)
pub mod traits;

pub use traits::{MatrixStorage, Result, RuntimeError};

// Standard library implementation
pub mod std_impl;

pub use std_impl::{padded_size, ThreadState};
