// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Schedule and accuracy report on synthetic forests.
//!
//! Builds one random forest per configured thread, runs one interleaved
//! solve and prints per-thread schedule statistics together with the largest
//! deviation from the sequential Hines solve.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use hines::config::{load_config, ConfigError, HinesConfig};
use hines::prelude::*;
use hines::tree::{solve_sequential, InterleaveStatistics};
use hines::{init_logging_from_config, Simulation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Args {
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
    ncell: usize,
    nodes_per_cell: usize,
    seed: u64,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: solve_report [--config <path>] [--set <key>=<value>]... \n\
         \x20                   [--cells <n>] [--nodes-per-cell <n>] [--seed <n>]\n\n\
         Defaults:\n\
         - config: hines.toml discovery, built-in defaults if none found\n\
         - cells: 256, nodes-per-cell: 100, seed: 1\n\n\
         {}",
        hines::observability::debug_flags_help()
    );
    process::exit(2);
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> T {
    let value = value.unwrap_or_else(|| usage_and_exit());
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid value for {flag}: {value}");
        usage_and_exit()
    })
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        overrides: HashMap::new(),
        ncell: 256,
        nodes_per_cell: 100,
        seed: 1,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config = Some(PathBuf::from(v));
            }
            "--set" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                let (key, value) = v.split_once('=').unwrap_or_else(|| usage_and_exit());
                parsed.overrides.insert(key.to_string(), value.to_string());
            }
            "--cells" => parsed.ncell = parse_number(&arg, args.next()),
            "--nodes-per-cell" => parsed.nodes_per_cell = parse_number(&arg, args.next()),
            "--seed" => parsed.seed = parse_number(&arg, args.next()),
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    parsed
}

fn load(args: &Args) -> Result<HinesConfig> {
    match load_config(args.config.as_deref(), Some(&args.overrides)) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = HinesConfig::default();
            hines::config::apply_environment_overrides(&mut config)?;
            hines::config::apply_cli_overrides(&mut config, &args.overrides)?;
            Ok(config)
        }
        Err(e) => Err(e).context("Failed to load configuration"),
    }
}

/// Parent array of `ncell` random trees, roots first
fn random_forest(rng: &mut StdRng, ncell: usize, nodes_per_cell: usize) -> Vec<usize> {
    let per_cell = nodes_per_cell.saturating_sub(1);
    let mut parent = vec![NO_PARENT; ncell * (per_cell + 1)];
    for c in 0..ncell {
        let base = ncell + c * per_cell;
        for k in 0..per_cell {
            parent[base + k] = if k == 0 { c } else { base + rng.gen_range(0..k) };
        }
    }
    parent
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = load(&args)?;
    let _guard = init_logging_from_config(&config)?;

    let mut sim = Simulation::from_config(&config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    for ith in 0..sim.nthread() {
        let parent = random_forest(&mut rng, args.ncell, args.nodes_per_cell);
        sim.load_thread(ith, args.ncell, &parent)?;
        let state = sim.thread_mut(ith)?;
        for i in 0..state.node_count() {
            let off = if i < state.ncell { 0.0 } else { -rng.gen_range(0.1f64..0.5) };
            state.set_row(i, off, off, rng.gen_range(4.0f64..6.0), rng.gen_range(-1.0f64..1.0))?;
        }
    }

    let mut references: Vec<ThreadState> = Vec::with_capacity(sim.nthread());
    for ith in 0..sim.nthread() {
        let mut reference = sim.thread(ith)?.clone();
        let ncell = reference.ncell;
        solve_sequential(ncell, &mut reference.tree_arrays_mut())?;
        references.push(reference);
    }

    let paths = sim.step()?;

    println!(
        "{:>6} {:>8} {:>8} {:>7} {:>8} {:>8} {:>6} {:>10} {:>11}",
        "thread", "cells", "nodes", "groups", "cycles", "idle", "races", "lane eff", "max |dx|"
    );
    for (ith, reference) in references.iter().enumerate() {
        let state = sim.thread(ith)?;
        let max_dx = state
            .rhs()
            .iter()
            .zip(reference.rhs())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0f64, f64::max);

        let info = sim.solver().store().get(ith);
        let stats = info.map(|info| match &info.stats {
            Some(stats) => stats.clone(),
            None => InterleaveStatistics::compute(info.ncell, &info.layout, state.parents()),
        });
        let (ngroup, total, efficiency) = match &stats {
            Some(s) => (s.groups.len(), s.total(), s.lane_efficiency()),
            None => (0, Default::default(), 0.0),
        };

        println!(
            "{:>6} {:>8} {:>8} {:>7} {:>8} {:>8} {:>6} {:>10.3} {:>11.3e}   {:?}",
            ith,
            state.ncell,
            state.node_count(),
            ngroup,
            total.ncycle,
            total.idle,
            total.child_race,
            efficiency,
            max_dx,
            paths[ith]
        );
    }

    Ok(())
}
