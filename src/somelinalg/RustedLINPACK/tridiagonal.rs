#![allow(non_snake_case)]
use super::LinalgError;

/// Thomas algorithm for a tridiagonal system.
///
/// `sub[i]` multiplies `x[i-1]` in row `i` (`sub[0]` is ignored), `diag[i]` multiplies
/// `x[i]` and `sup[i]` multiplies `x[i+1]` (`sup[n-1]` is ignored). No pivoting is
/// done, so a (near) zero pivot is reported as an error instead of returning garbage;
/// the cubic spline systems are diagonally dominant apart from the not-a-knot rows.
pub fn thomas_solve(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    rhs: &[f64],
    pivot_tol: f64,
) -> Result<Vec<f64>, LinalgError> {
    let n = diag.len();
    for len in [sub.len(), sup.len(), rhs.len()] {
        if len != n {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                actual: len,
            });
        }
    }
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    let mut denom = diag[0];
    if !(denom.abs() > pivot_tol) {
        return Err(LinalgError::ZeroPivot { row: 0 });
    }
    c_prime[0] = sup[0] / denom;
    d_prime[0] = rhs[0] / denom;
    for i in 1..n {
        denom = diag[i] - sub[i] * c_prime[i - 1];
        if !(denom.abs() > pivot_tol) {
            return Err(LinalgError::ZeroPivot { row: i });
        }
        c_prime[i] = if i + 1 < n { sup[i] / denom } else { 0.0 };
        d_prime[i] = (rhs[i] - sub[i] * d_prime[i - 1]) / denom;
    }

    let mut x = d_prime;
    for i in (0..n - 1).rev() {
        x[i] -= c_prime[i] * x[i + 1];
    }
    Ok(x)
}

/// Cyclic tridiagonal system: the tridiagonal matrix plus a `corner_low` entry at
/// (n-1, 0) and a `corner_up` entry at (0, n-1).
///
/// Sherman-Morrison reduction: the corners are written as a rank-one update u·vᵀ of a
/// modified tridiagonal matrix, which is solved twice (for the rhs and for u).
pub fn cyclic_thomas_solve(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    corner_low: f64,
    corner_up: f64,
    rhs: &[f64],
    pivot_tol: f64,
) -> Result<Vec<f64>, LinalgError> {
    let n = diag.len();
    if n < 3 {
        return Err(LinalgError::CyclicTooSmall(n));
    }
    let gamma = -diag[0];
    let mut bb = diag.to_vec();
    bb[0] = diag[0] - gamma;
    bb[n - 1] = diag[n - 1] - corner_low * corner_up / gamma;

    let x = thomas_solve(sub, &bb, sup, rhs, pivot_tol)?;

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = corner_low;
    let z = thomas_solve(sub, &bb, sup, &u, pivot_tol)?;

    let denom = 1.0 + z[0] + corner_up * z[n - 1] / gamma;
    if !(denom.abs() > pivot_tol) {
        return Err(LinalgError::ZeroPivot { row: n - 1 });
    }
    let fact = (x[0] + corner_up * x[n - 1] / gamma) / denom;
    Ok(x.iter().zip(z.iter()).map(|(xi, zi)| xi - fact * zi).collect())
}
