//! Direct solvers for the structured systems the spline builders produce:
//! banded LU with partial pivoting (collocation matrices) and the
//! Thomas / Sherman-Morrison pair for (cyclic) tridiagonal systems.
#![allow(non_snake_case)]
use thiserror::Error;

/// compact band storage and banded LU decomposition with partial pivoting
pub mod lu_band_nalg;
/// Thomas algorithm and its cyclic variant
pub mod tridiagonal;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("zero or negligible pivot at row {row}")]
    ZeroPivot { row: usize },
    #[error("dimension mismatch: system of size {expected}, right-hand side of size {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("cyclic tridiagonal system needs at least 3 unknowns, got {0}")]
    CyclicTooSmall(usize),
}
