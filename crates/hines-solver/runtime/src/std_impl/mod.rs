// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Hines Runtime - Standard (Desktop/Server)
//!
//! `Vec`-backed thread state with padded arrays.

pub mod thread_state;

pub use thread_state::{padded_size, ThreadState, PAD_WORDS};
