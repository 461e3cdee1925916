// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Config loading integration tests: full file, defaults, validation

use hines_config::{load_config, parse_config, validate_config, ConfigError, HinesConfig};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_full_file_round_trips_every_section() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[solver]
mode = "per-cell"
warpsize = 64
nwarp = 8
collect_statistics = true
validate_schedules = true

[execution]
backend = "auto"
nthread = 12

[logging]
level = "debug"
debug_crates = ["hines-solver-tree"]
"#
    )
    .unwrap();

    let config = load_config(Some(file.path()), None).unwrap();
    assert_eq!(config.solver.mode, "per-cell");
    assert_eq!(config.solver.warpsize, 64);
    assert_eq!(config.solver.nwarp_override(), Some(8));
    assert!(config.solver.collect_statistics);
    assert_eq!(config.execution.backend, "auto");
    assert_eq!(config.execution.nthread, 12);
    assert_eq!(config.logging.debug_crates, vec!["hines-solver-tree"]);
    validate_config(&config).unwrap();
}

#[test]
fn test_empty_file_gives_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config, HinesConfig::default());
    assert_eq!(config.solver.nwarp_override(), None);
}

#[test]
fn test_bad_toml_is_parse_error() {
    assert!(matches!(
        parse_config("[solver\nmode = 1"),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_wrong_type_is_parse_error() {
    assert!(matches!(
        parse_config("[solver]\nwarpsize = \"wide\""),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_zero_warpsize_fails_validation() {
    let config = parse_config("[solver]\nwarpsize = 0").unwrap();
    assert!(matches!(
        validate_config(&config),
        Err(ConfigError::ValidationError(_))
    ));
}
