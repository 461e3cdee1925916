// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Schedule Contract Tests
//!
//! Random forests through both ordering strategies:
//! - solution order and walk contract after every build
//! - no two lanes of one cycle share a parent
//! - both solvers agree with the sequential reference
//! - lane-group barrier accounting

use hines_solver_tree::{
    apply_order_to_parent, check_solution_order, interleave_order, solve_interleaved,
    solve_sequential, InterleaveStatistics, LockstepEmulator, ScheduleLayout, SolverMode,
    TreeArraysMut, NO_PARENT,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Forest with `ncell` roots and shuffled non-root ids (not in solution order)
fn random_forest(rng: &mut StdRng, ncell: usize, nnode: usize) -> Vec<usize> {
    let mut parent = vec![NO_PARENT; nnode];
    for i in ncell..nnode {
        parent[i] = rng.gen_range(0..i);
    }
    // Relabel non-root ids to break solution order
    let mut relabel: Vec<usize> = (0..nnode).collect();
    relabel[ncell..].shuffle(rng);
    let mut shuffled = vec![NO_PARENT; nnode];
    for i in ncell..nnode {
        shuffled[relabel[i]] = relabel[parent[i]];
    }
    shuffled
}

struct Matrix {
    a: Vec<f64>,
    b: Vec<f64>,
    d: Vec<f64>,
    rhs: Vec<f64>,
}

fn random_matrix(rng: &mut StdRng, nnode: usize) -> Matrix {
    let a: Vec<f64> = (0..nnode).map(|_| -rng.gen_range(0.1f64..1.0)).collect();
    Matrix {
        b: a.iter().map(|x| x * 0.9).collect(),
        a,
        d: (0..nnode).map(|_| rng.gen_range(4.0..6.0)).collect(),
        rhs: (0..nnode).map(|_| rng.gen_range(-1.0..1.0)).collect(),
    }
}

fn permute(values: &[f64], order: &[usize]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    for (old, &new) in order.iter().enumerate() {
        out[new] = values[old];
    }
    out
}

/// Solve in the given numbering (must already be solution order)
fn reference_solve(ncell: usize, parent: &[usize], m: &Matrix) -> Vec<f64> {
    let mut d = m.d.clone();
    let mut rhs = m.rhs.clone();
    let mut arrays = TreeArraysMut {
        a: &m.a,
        b: &m.b,
        d: &mut d,
        rhs: &mut rhs,
        parent,
    };
    solve_sequential(ncell, &mut arrays).unwrap();
    rhs
}

/// Build, permute and solve; returns the solution in original numbering
fn interleaved_solve(
    ncell: usize,
    parent: &[usize],
    m: &Matrix,
    mode: SolverMode,
    warpsize: usize,
) -> Vec<f64> {
    let (order, info) = interleave_order(ncell, parent, mode, warpsize, None).unwrap();
    let permuted_parent = apply_order_to_parent(ncell, parent, &order).unwrap();
    check_solution_order(&permuted_parent, ncell).unwrap();
    info.validate(&permuted_parent).unwrap();

    let a = permute(&m.a, &order);
    let b = permute(&m.b, &order);
    let mut d = permute(&m.d, &order);
    let mut rhs = permute(&m.rhs, &order);
    let mut arrays = TreeArraysMut {
        a: &a,
        b: &b,
        d: &mut d,
        rhs: &mut rhs,
        parent: &permuted_parent,
    };
    let mut group = LockstepEmulator::new(warpsize);
    solve_interleaved(&info, &mut arrays, &mut group).unwrap();

    order.iter().map(|&new| rhs[new]).collect()
}

fn assert_close(x: &[f64], y: &[f64]) {
    assert_eq!(x.len(), y.len());
    for (i, (a, b)) in x.iter().zip(y).enumerate() {
        assert!((a - b).abs() < 1e-10, "node {}: {} vs {}", i, a, b);
    }
}

#[test]
fn test_random_forests_hold_contract_in_both_modes() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let ncell = rng.gen_range(1..40);
        let nnode = ncell + rng.gen_range(0..400);
        let parent = random_forest(&mut rng, ncell, nnode);
        for mode in [SolverMode::WarpCyclic, SolverMode::PerCell] {
            let (order, info) = interleave_order(ncell, &parent, mode, 8, None).unwrap();
            let permuted = apply_order_to_parent(ncell, &parent, &order).unwrap();
            info.validate(&permuted).unwrap();
            assert!(order.iter().take(ncell).all(|&r| r < ncell));
        }
    }
}

#[test]
fn test_warp_cycles_never_share_a_parent() {
    let mut rng = StdRng::seed_from_u64(7);
    let parent = random_forest(&mut rng, 12, 600);
    let (order, info) = interleave_order(12, &parent, SolverMode::WarpCyclic, 32, None).unwrap();
    let permuted = apply_order_to_parent(12, &parent, &order).unwrap();
    let info = info.with_statistics(&permuted);
    let stats = info.stats.as_ref().unwrap();
    assert_eq!(stats.total().child_race, 0);
    assert_eq!(stats.total().nnode, 600);
}

#[test]
fn test_solvers_agree_with_sequential_reference() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..10 {
        let ncell = rng.gen_range(1..20);
        let nnode = ncell + rng.gen_range(0..300);
        let parent = random_forest(&mut rng, ncell, nnode);
        let m = random_matrix(&mut rng, nnode);

        // Reference in a plain solution order: per-cell ordering renumbering
        let (order, _) = interleave_order(ncell, &parent, SolverMode::PerCell, 1, None).unwrap();
        let ordered_parent = apply_order_to_parent(ncell, &parent, &order).unwrap();
        let ordered = Matrix {
            a: permute(&m.a, &order),
            b: permute(&m.b, &order),
            d: permute(&m.d, &order),
            rhs: permute(&m.rhs, &order),
        };
        let solved = reference_solve(ncell, &ordered_parent, &ordered);
        let expected: Vec<f64> = order.iter().map(|&new| solved[new]).collect();

        assert_close(
            &interleaved_solve(ncell, &parent, &m, SolverMode::WarpCyclic, 32),
            &expected,
        );
        assert_close(
            &interleaved_solve(ncell, &parent, &m, SolverMode::PerCell, 32),
            &expected,
        );
    }
}

#[test]
fn test_warp_width_invariance() {
    let mut rng = StdRng::seed_from_u64(99);
    let parent = random_forest(&mut rng, 10, 250);
    let m = random_matrix(&mut rng, 250);
    let base = interleave_solve_width(&parent, &m, 1);
    for warpsize in [32, 64] {
        assert_close(&interleave_solve_width(&parent, &m, warpsize), &base);
    }
}

fn interleave_solve_width(parent: &[usize], m: &Matrix, warpsize: usize) -> Vec<f64> {
    interleaved_solve(10, parent, m, SolverMode::WarpCyclic, warpsize)
}

#[test]
fn test_one_barrier_per_cycle_per_sweep_plus_root_step() {
    let mut rng = StdRng::seed_from_u64(5);
    let parent = random_forest(&mut rng, 6, 120);
    let (order, info) = interleave_order(6, &parent, SolverMode::WarpCyclic, 4, None).unwrap();
    let permuted_parent = apply_order_to_parent(6, &parent, &order).unwrap();
    let m = random_matrix(&mut rng, 120);
    let mut d = m.d.clone();
    let mut rhs = m.rhs.clone();
    let mut arrays = TreeArraysMut {
        a: &m.a,
        b: &m.b,
        d: &mut d,
        rhs: &mut rhs,
        parent: &permuted_parent,
    };
    let mut group = LockstepEmulator::new(4);
    solve_interleaved(&info, &mut arrays, &mut group).unwrap();

    let ScheduleLayout::WarpCyclic(ws) = &info.layout else {
        panic!("expected warp-cyclic layout");
    };
    let expected: usize = ws.ncycle.iter().map(|c| 2 * c + 1).sum();
    assert_eq!(group.barriers, expected);
}

#[test]
fn test_narrow_lane_group_is_rejected() {
    let parent = [NO_PARENT, 0, 0];
    let (_, info) = interleave_order(1, &parent, SolverMode::WarpCyclic, 32, None).unwrap();
    let a = [0.0; 3];
    let mut d = [1.0; 3];
    let mut rhs = [1.0; 3];
    let mut arrays = TreeArraysMut {
        a: &a,
        b: &a,
        d: &mut d,
        rhs: &mut rhs,
        parent: &[NO_PARENT, 0, 0],
    };
    assert!(solve_interleaved(&info, &mut arrays, &mut LockstepEmulator::new(16)).is_err());
}

#[test]
fn test_oracle_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(3);
    let parent = random_forest(&mut rng, 9, 200);
    for mode in [SolverMode::WarpCyclic, SolverMode::PerCell] {
        let first = interleave_order(9, &parent, mode, 32, None).unwrap();
        let second = interleave_order(9, &parent, mode, 32, None).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_per_cell_statistics_cover_every_level() {
    let parent = [NO_PARENT, NO_PARENT, 0, 1, 2];
    let (order, info) = interleave_order(2, &parent, SolverMode::PerCell, 32, None).unwrap();
    let permuted = apply_order_to_parent(2, &parent, &order).unwrap();
    let stats = InterleaveStatistics::compute(2, &info.layout, &permuted);
    assert_eq!(stats.groups.len(), 2);
    assert_eq!(stats.total().nnode, 3);
    assert_eq!(stats.groups[1].idle, 1);
}
