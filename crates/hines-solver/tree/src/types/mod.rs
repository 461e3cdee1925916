// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core types shared by the ordering oracle, the schedule and the kernels

pub mod error;
pub mod mode;

pub use error::{Error, Result, TreeError};
pub use mode::SolverMode;

/// Parent sentinel for root compartments
pub const NO_PARENT: usize = usize::MAX;

/// Largest warp width a schedule may be built for
pub const MAX_WARPSIZE: usize = 1024;

/// Check that a warp width is usable
pub fn check_warpsize(warpsize: usize) -> Result<()> {
    if warpsize == 0 || warpsize > MAX_WARPSIZE {
        return Err(TreeError::InvalidWarpSize {
            warpsize,
            max: MAX_WARPSIZE,
        });
    }
    Ok(())
}

/// Verify the solution-order invariant: roots occupy `[0, ncell)` and every
/// other node's parent has a smaller id.
pub fn check_solution_order(parent: &[usize], ncell: usize) -> Result<()> {
    if ncell > parent.len() {
        return Err(TreeError::ArraySizeMismatch {
            expected: ncell,
            actual: parent.len(),
        });
    }
    for (i, &p) in parent.iter().enumerate() {
        if i < ncell {
            if p != NO_PARENT {
                return Err(TreeError::InvalidTopology {
                    node: i,
                    reason: format!("root has parent {}", p),
                });
            }
        } else if p == NO_PARENT || p >= i {
            return Err(TreeError::InvalidTopology {
                node: i,
                reason: format!("parent {} does not precede node", p as isize),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_order_accepts_chain() {
        assert!(check_solution_order(&[NO_PARENT, 0, 1], 1).is_ok());
    }

    #[test]
    fn test_solution_order_rejects_forward_parent() {
        let err = check_solution_order(&[NO_PARENT, 2, 0], 1).unwrap_err();
        assert!(matches!(err, TreeError::InvalidTopology { node: 1, .. }));
    }

    #[test]
    fn test_solution_order_rejects_parented_root() {
        assert!(check_solution_order(&[0, 0], 1).is_err());
    }

    #[test]
    fn test_warpsize_bounds() {
        assert!(check_warpsize(1).is_ok());
        assert!(check_warpsize(MAX_WARPSIZE).is_ok());
        assert!(check_warpsize(0).is_err());
        assert!(check_warpsize(MAX_WARPSIZE + 1).is_err());
    }
}
