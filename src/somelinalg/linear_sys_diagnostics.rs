use log::warn;
use nalgebra::DMatrix;

/// The condition number of a matrix is the ratio of its largest to its smallest singular
/// value. It measures how much relative perturbations of the data are amplified in the
/// solution. Returns infinity for a singular matrix.
pub fn condition_number(A: &DMatrix<f64>) -> f64 {
    let singular_values = A.singular_values();
    if singular_values.is_empty() {
        return f64::INFINITY;
    }
    let max_sigma = singular_values.max();
    let min_sigma = singular_values.min();
    if min_sigma == 0.0 {
        f64::INFINITY
    } else {
        max_sigma / min_sigma
    }
}

/// A system is poorly conditioned if the condition number of its matrix exceeds `threshold`.
pub fn poorly_conditioned(A: &DMatrix<f64>, threshold: f64) -> bool {
    let cond = condition_number(A);
    let poorly_conditioned = cond > threshold;
    if poorly_conditioned {
        warn!(
            "The system of linear equations is poorly conditioned. Condition number = {:.3e}",
            cond
        );
    }
    poorly_conditioned
}

/// Cheap check after a pivoted LU: the ratio of the largest to the smallest pivot of U
/// bounds the condition number from below.
pub fn pivot_ratio_check(min_pivot: f64, max_pivot: f64, threshold: f64) -> bool {
    let ratio = if min_pivot == 0.0 {
        f64::INFINITY
    } else {
        max_pivot / min_pivot
    };
    let poorly_conditioned = ratio > threshold;
    if poorly_conditioned {
        warn!(
            "Pivot ratio {:.3e} of the factorized system exceeds {:.1e}; the solution may be inaccurate",
            ratio, threshold
        );
    }
    poorly_conditioned
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// famous example of ill-conditioned matrix
    fn hilbert_matrix(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| 1.0 / (i as f64 + j as f64 + 1.0))
    }

    #[test]
    fn test_poorly_conditioned() {
        let A = DMatrix::from_vec(2, 2, vec![1.0, 1.0, 1.00001, 1.0]);
        assert!(poorly_conditioned(&A, 1e5));
        assert!(!poorly_conditioned(&DMatrix::identity(3, 3), 1e5));
    }

    #[test]
    fn test_poorly_conditioned_hilbert() {
        assert!(poorly_conditioned(&hilbert_matrix(6), 1e5));
    }

    #[test]
    fn test_condition_number_diagonal() {
        let A = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1.0, 4.0, 0.5]));
        assert_relative_eq!(condition_number(&A), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pivot_ratio() {
        assert!(pivot_ratio_check(1e-13, 1.0, 1e12));
        assert!(!pivot_ratio_check(0.1, 1.0, 1e12));
        assert!(pivot_ratio_check(0.0, 1.0, 1e12));
    }
}
