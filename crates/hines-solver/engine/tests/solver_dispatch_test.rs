// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solver Dispatch Tests
//!
//! End-to-end through `TreeSolver` on the CPU backend:
//! - results match a dense Gaussian elimination of the same system
//! - both interleaving modes and several warp widths agree
//! - missing-schedule routing (sequential fallback vs hard error)
//! - invalidation and whole-simulation solves

use hines_solver_engine::{
    BackendType, SolvePath, SolverError, SolverSettings, TreeSolver,
};
use hines_solver_runtime::{MatrixStorage, ThreadState};
use hines_solver_tree::{SolverMode, NO_PARENT};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-10;

fn cpu_solver(settings: SolverSettings, nthread: usize) -> TreeSolver<ThreadState> {
    let mut solver = TreeSolver::new(settings, BackendType::Cpu).unwrap();
    solver.create_interleave_info(nthread);
    solver
}

/// Three-node chain with D=2, A=B=-1, RHS=1; solution is [1.5, 2, 1.5]
fn chain_state() -> ThreadState {
    let mut state = ThreadState::from_topology(1, &[NO_PARENT, 0, 1]).unwrap();
    for i in 0..3 {
        let off = if i == 0 { 0.0 } else { -1.0 };
        state.set_row(i, off, off, 2.0, 1.0).unwrap();
    }
    state
}

/// Random forest in solution order with a diagonally dominant matrix
fn random_state(rng: &mut StdRng, ncell: usize, nnode: usize) -> ThreadState {
    let mut parent = vec![NO_PARENT; nnode];
    for (i, p) in parent.iter_mut().enumerate().skip(ncell) {
        *p = rng.gen_range(0..i);
    }
    let mut state = ThreadState::from_topology(ncell, &parent).unwrap();

    let mut off_sum = vec![0.0f64; nnode];
    let mut ab = vec![(0.0f64, 0.0f64); nnode];
    for i in ncell..nnode {
        let a = -rng.gen_range(0.1f64..1.0);
        let b = -rng.gen_range(0.1f64..1.0);
        ab[i] = (a, b);
        off_sum[i] += b.abs();
        off_sum[parent[i]] += a.abs();
    }
    for i in 0..nnode {
        let d = off_sum[i] + rng.gen_range(0.5f64..2.0);
        let rhs = rng.gen_range(-1.0f64..1.0);
        state.set_row(i, ab[i].0, ab[i].1, d, rhs).unwrap();
    }
    state
}

/// Solve the state's system densely (no pivoting; the matrix is dominant)
fn dense_solve(state: &ThreadState) -> Vec<f64> {
    let n = state.node_count();
    let mut m = Array2::<f64>::zeros((n, n));
    let mut x = Array1::from(state.rhs().to_vec());
    for i in 0..n {
        m[[i, i]] = state.d()[i];
        let p = state.parents()[i];
        if p != NO_PARENT {
            m[[p, i]] = state.a()[i];
            m[[i, p]] = state.b()[i];
        }
    }

    for k in 0..n {
        for r in k + 1..n {
            let f = m[[r, k]] / m[[k, k]];
            if f == 0.0 {
                continue;
            }
            for c in k..n {
                m[[r, c]] -= f * m[[k, c]];
            }
            x[r] -= f * x[k];
        }
    }
    for k in (0..n).rev() {
        let mut s = x[k];
        for c in k + 1..n {
            s -= m[[k, c]] * x[c];
        }
        x[k] = s / m[[k, k]];
    }
    x.to_vec()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (x, y)) in actual.iter().zip(expected).enumerate() {
        assert!((x - y).abs() < TOL, "node {}: {} vs {}", i, x, y);
    }
}

#[test]
fn test_chain_in_both_modes() {
    for mode in [SolverMode::WarpCyclic, SolverMode::PerCell] {
        let mut solver = cpu_solver(SolverSettings::default().with_mode(mode), 1);
        let mut state = chain_state();
        let order = solver.setup_thread(0, &mut state).unwrap();
        assert_eq!(solver.solve_thread(0, &mut state).unwrap(), SolvePath::Cpu);

        let expected = [1.5, 2.0, 1.5];
        for (old, &new) in order.iter().enumerate() {
            assert!((state.rhs()[new] - expected[old]).abs() < 1e-12);
        }
    }
}

#[test]
fn test_random_forests_match_dense_solve() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(ncell, nnode) in &[(1, 40), (5, 60), (33, 200), (70, 400)] {
        for mode in [SolverMode::WarpCyclic, SolverMode::PerCell] {
            let settings = SolverSettings {
                validate_schedules: true,
                collect_statistics: true,
                ..SolverSettings::default().with_mode(mode)
            };
            let mut solver = cpu_solver(settings, 1);
            let mut state = random_state(&mut rng, ncell, nnode);
            solver.setup_thread(0, &mut state).unwrap();

            let expected = dense_solve(&state);
            solver.solve_thread(0, &mut state).unwrap();
            assert_close(state.rhs(), &expected);
        }
    }
}

#[test]
fn test_warp_width_does_not_change_solution() {
    let mut rng = StdRng::seed_from_u64(11);
    let reference = random_state(&mut rng, 40, 300);

    let mut solutions: Vec<Vec<f64>> = Vec::new();
    for warpsize in [1, 32, 64] {
        let mut solver = cpu_solver(SolverSettings::default().with_warpsize(warpsize), 1);
        let mut state = reference.clone();
        let order = solver.setup_thread(0, &mut state).unwrap();
        solver.solve_thread(0, &mut state).unwrap();
        // Back to the caller's numbering
        solutions.push(order.iter().map(|&new| state.rhs()[new]).collect());
    }
    assert_close(&solutions[1], &solutions[0]);
    assert_close(&solutions[2], &solutions[0]);
}

#[test]
fn test_modes_agree_in_original_numbering() {
    let mut rng = StdRng::seed_from_u64(3);
    let reference = random_state(&mut rng, 17, 150);

    let run = |mode: SolverMode| -> Vec<f64> {
        let mut solver = cpu_solver(SolverSettings::default().with_mode(mode), 1);
        let mut state = reference.clone();
        let order = solver.setup_thread(0, &mut state).unwrap();
        solver.solve_thread(0, &mut state).unwrap();
        order.iter().map(|&new| state.rhs()[new]).collect()
    };
    let warp = run(SolverMode::WarpCyclic);
    let cell = run(SolverMode::PerCell);
    assert_close(&cell, &warp);
}

#[test]
fn test_single_node_cells() {
    for mode in [SolverMode::WarpCyclic, SolverMode::PerCell] {
        for warpsize in [1, 32, 64] {
            for n in [1, 31, 33, 65, 200] {
                let mut state = ThreadState::from_topology(n, &vec![NO_PARENT; n]).unwrap();
                for i in 0..n {
                    state.set_row(i, 0.0, 0.0, (i + 1) as f64, 2.0 * (i + 1) as f64).unwrap();
                }
                let settings = SolverSettings::default()
                    .with_mode(mode)
                    .with_warpsize(warpsize);
                let mut solver = cpu_solver(settings, 1);
                solver.setup_thread(0, &mut state).unwrap();
                assert_eq!(solver.solve_thread(0, &mut state).unwrap(), SolvePath::Cpu);
                assert!(
                    state.rhs().iter().all(|&x| (x - 2.0).abs() < 1e-12),
                    "{} cells, {} mode, warp {}",
                    n,
                    mode,
                    warpsize
                );
            }
        }
    }
}

#[test]
fn test_root_with_two_leaves_at_every_width() {
    let build = || {
        let mut state = ThreadState::from_topology(1, &[NO_PARENT, 0, 0]).unwrap();
        state.set_row(0, 0.0, 0.0, 3.0, 1.0).unwrap();
        state.set_row(1, -1.0, -0.5, 2.5, 0.5).unwrap();
        state.set_row(2, -0.25, -1.0, 4.0, -1.0).unwrap();
        state
    };
    let expected = dense_solve(&build());

    for mode in [SolverMode::WarpCyclic, SolverMode::PerCell] {
        for warpsize in [1, 32, 64] {
            let settings = SolverSettings {
                validate_schedules: true,
                ..SolverSettings::default().with_mode(mode).with_warpsize(warpsize)
            };
            let mut solver = cpu_solver(settings, 1);
            let mut state = build();
            let order = solver.setup_thread(0, &mut state).unwrap();
            solver.solve_thread(0, &mut state).unwrap();
            let solution: Vec<f64> = order.iter().map(|&new| state.rhs()[new]).collect();
            assert_close(&solution, &expected);
        }
    }
}

#[test]
fn test_empty_thread_is_skipped() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    let mut state = ThreadState::new(0);
    solver.setup_thread(0, &mut state).unwrap();
    assert_eq!(solver.solve_thread(0, &mut state).unwrap(), SolvePath::Skipped);
}

#[test]
fn test_cpu_thread_without_schedule_falls_back() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    let mut state = chain_state();
    assert_eq!(
        solver.solve_thread(0, &mut state).unwrap(),
        SolvePath::Sequential
    );
    assert_close(state.rhs(), &[1.5, 2.0, 1.5]);
    assert_eq!(solver.stats().sequential_fallbacks, 1);
}

#[test]
fn test_gpu_thread_without_schedule_is_an_error() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    let mut state = chain_state().with_gpu(0);
    let err = solver.solve_thread(0, &mut state).unwrap_err();
    assert!(matches!(
        err,
        SolverError::MissingSchedule { thread: 0, nnode: 3 }
    ));
}

#[test]
fn test_gpu_thread_needs_gpu_backend() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    let mut state = chain_state().with_gpu(0);
    assert!(matches!(
        solver.setup_thread(0, &mut state),
        Err(SolverError::Gpu(_))
    ));
}

#[test]
fn test_invalidate_drops_schedule() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    let mut state = chain_state();
    solver.setup_thread(0, &mut state).unwrap();
    let before = solver.store().generation(0).unwrap();

    solver.invalidate_thread(0).unwrap();
    assert!(solver.store().get(0).is_none());
    assert!(solver.store().generation(0).unwrap() > before);

    // Rebuild after the "topology change" and solve again
    let mut fresh = chain_state();
    solver.setup_thread(0, &mut fresh).unwrap();
    assert_eq!(solver.solve_thread(0, &mut fresh).unwrap(), SolvePath::Cpu);
}

#[test]
fn test_solve_all_threads() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut states: Vec<ThreadState> = (0..6)
        .map(|t| random_state(&mut rng, 3 + t, 40 + 10 * t))
        .collect();

    let mut solver = cpu_solver(SolverSettings::default(), states.len());
    // Leave the last thread unscheduled
    let nscheduled = states.len() - 1;
    for (ith, state) in states.iter_mut().take(nscheduled).enumerate() {
        solver.setup_thread(ith, state).unwrap();
    }
    let expected: Vec<Vec<f64>> = states.iter().map(dense_solve).collect();

    let paths = solver.solve_all(&mut states).unwrap();
    assert_eq!(&paths[..nscheduled], vec![SolvePath::Cpu; nscheduled].as_slice());
    assert_eq!(paths[nscheduled], SolvePath::Sequential);
    for (state, expected) in states.iter().zip(&expected) {
        assert_close(state.rhs(), expected);
    }

    let stats = solver.stats();
    assert_eq!(stats.cpu_solves, nscheduled as u64);
    assert_eq!(stats.sequential_fallbacks, 1);
}

#[test]
fn test_solve_all_rejects_extra_threads() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    let mut states = vec![chain_state(), chain_state()];
    assert!(matches!(
        solver.solve_all(&mut states),
        Err(SolverError::InvalidThread { .. })
    ));
}

#[test]
fn test_destroy_then_solve_is_invalid_thread() {
    let mut solver = cpu_solver(SolverSettings::default(), 1);
    solver.destroy_interleave_info();
    let mut state = chain_state();
    assert!(matches!(
        solver.solve_thread(0, &mut state),
        Err(SolverError::InvalidThread { .. })
    ));
}
