// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # hines-observability
//!
//! Logging setup shared by every Hines binary and test, with per-crate debug
//! flag support (`--debug-hines-solver-tree`, `HINES_DEBUG=all`, ...).
//!
//! ## Features
//! - `file-logging`: daily-rotated log file next to console output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known Hines crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "hines",
    "hines-config",
    "hines-observability",
    "hines-solver-tree",
    "hines-solver-runtime",
    "hines-solver-engine",
];
