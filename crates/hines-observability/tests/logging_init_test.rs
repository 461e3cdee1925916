// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization tests

use hines_observability::{build_filter, init_test_logging, CrateDebugFlags, LogSettings};

#[test]
fn test_bad_level_is_rejected() {
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    let settings = LogSettings::default().with_level("very=loud=please");
    assert!(build_filter(&settings, &CrateDebugFlags::default()).is_err());
}

#[test]
fn test_flags_build_a_filter() {
    let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
    assert!(build_filter(&LogSettings::default(), &flags).is_ok());
}

#[test]
fn test_test_logging_is_idempotent() {
    init_test_logging();
    init_test_logging();
    tracing::info!("logging initialized twice without panic");
}
