// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Storage traits consumed by the solver engine

pub mod error;
pub mod storage;

// Re-export key types
pub use error::{Result, RuntimeError};
pub use storage::MatrixStorage;
