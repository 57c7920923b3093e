//! Least-squares B-spline fitting on given knots, with an optional roughness penalty.
//!
//! Minimizes `sum_i w_i (y_i - S(x_i))^2 + lam * int S''(x)^2 dx` over the coefficients
//! of `S`. The normal equations `(B^T W B + lam R) c = B^T W y` are symmetric positive
//! definite when the sites satisfy the Schoenberg-Whitney condition and are solved by
//! Cholesky factorization.
use crate::numerical::interpolation::batch::BatchLayout;
use crate::numerical::interpolation::bspline::{
    BSpline, basis_functions_nonzero, check_knots, schoenberg_whitney_subsequence,
};
use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use crate::numerical::interpolation::ppoly::Extrapolate;
use crate::numerical::interpolation::settings::SplineSettings;
use crate::somelinalg::linear_sys_diagnostics::poorly_conditioned;
use gauss_quad::GaussLegendre;
use log::{debug, info};
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayViewD};

/// Systems up to this size get a full condition number check.
const CONDITION_CHECK_MAX_SIZE: usize = 400;

/// Weighted least-squares spline with knots `t` and degree `k`.
///
/// Sites must be non-decreasing and inside the base interval, weights (default 1)
/// non-negative and finite, and there must be at least as many sites as coefficients.
pub fn make_lsq_spline(
    x: &[f64],
    y: ArrayViewD<'_, f64>,
    t: &[f64],
    k: usize,
    w: Option<&[f64]>,
    axis: usize,
) -> SplineResult<BSpline> {
    fit_penalized(x, y, t, k, w, 0.0, axis, &SplineSettings::default())
}

/// Least-squares spline plus `lam` times the integral of the squared second derivative.
/// `lam == 0` is the plain least-squares fit; `lam > 0` needs `k >= 2`.
pub fn make_smoothing_spline(
    x: &[f64],
    y: ArrayViewD<'_, f64>,
    t: &[f64],
    k: usize,
    w: Option<&[f64]>,
    lam: f64,
    axis: usize,
) -> SplineResult<BSpline> {
    fit_penalized(x, y, t, k, w, lam, axis, &SplineSettings::default())
}

#[allow(clippy::too_many_arguments)]
pub fn fit_penalized(
    x: &[f64],
    y: ArrayViewD<'_, f64>,
    t: &[f64],
    k: usize,
    w: Option<&[f64]>,
    lam: f64,
    axis: usize,
    settings: &SplineSettings,
) -> SplineResult<BSpline> {
    let m = x.len();
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SplineError::invalid("x", "sites must be finite"));
    }
    if let Some(i) = x.windows(2).position(|p| p[1] < p[0]) {
        return Err(SplineError::invalid(
            "x",
            format!("sites must be non-decreasing (violated at index {})", i + 1),
        ));
    }
    if !lam.is_finite() || lam < 0.0 {
        return Err(SplineError::invalid("lam", format!("must be finite and >= 0, got {}", lam)));
    }
    if lam > 0.0 && k < 2 {
        return Err(SplineError::invalid(
            "k",
            format!("a curvature penalty needs degree >= 2, got {}", k),
        ));
    }
    if t.len() < 2 * k + 2 {
        return Err(SplineError::InvalidKnots(format!(
            "need at least {} knots for degree {}, got {}",
            2 * k + 2,
            k,
            t.len()
        )));
    }
    let n = t.len() - k - 1;
    check_knots(t, k, n)?;
    if m < n {
        return Err(SplineError::InsufficientPoints {
            context: format!("least-squares spline with {} coefficients", n),
            required: n,
            actual: m,
        });
    }
    let weights: Vec<f64> = match w {
        Some(w) => {
            if w.len() != m {
                return Err(SplineError::LengthMismatch {
                    context: "weights vs sites",
                    expected: m,
                    actual: w.len(),
                });
            }
            if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(SplineError::invalid("w", "weights must be finite and non-negative"));
            }
            w.to_vec()
        }
        None => vec![1.0; m],
    };
    let (lo, hi) = (t[k], t[n]);
    if x[0] < lo || x[m - 1] > hi {
        return Err(SplineError::NoSolutionForKnots(format!(
            "sites [{}, {}] leave the base interval [{}, {}]",
            x[0],
            x[m - 1],
            lo,
            hi
        )));
    }
    let (layout, yy) = BatchLayout::from_values(&y, axis, m)?;
    if yy.iter().any(|v| !v.is_finite()) {
        return Err(SplineError::invalid("y", "values must be finite"));
    }
    let active: Vec<f64> = x
        .iter()
        .zip(weights.iter())
        .filter(|(_, w)| **w > 0.0)
        .map(|(x, _)| *x)
        .collect();
    if lam == 0.0 && !schoenberg_whitney_subsequence(&active, t, k) {
        return Err(SplineError::NoSolutionForKnots(
            "no subsequence of the weighted sites satisfies Schoenberg-Whitney".to_string(),
        ));
    }

    let nc = yy.ncols();
    // rows of zero weight drop out of both sides
    let design = BSpline::design_matrix(x, t, k, false)?;
    let weighted = DMatrix::from_fn(m, n, |i, j| weights[i] * design[(i, j)]);
    let values = DMatrix::from_fn(m, nc, |i, jp| yy[[i, jp]]);
    let mut normal = design.transpose() * &weighted;
    let rhs = weighted.transpose() * values;
    if lam > 0.0 {
        let penalty = roughness_matrix(t, k)?;
        normal += penalty * lam;
    }
    if n <= CONDITION_CHECK_MAX_SIZE {
        poorly_conditioned(&normal, settings.condition_threshold);
    }
    debug!("normal equations of size {} with {} right-hand sides", n, nc);
    let chol = normal.cholesky().ok_or_else(|| {
        SplineError::SingularSystem(
            "normal equations are not positive definite (knots without data?)".to_string(),
        )
    })?;
    let sol = chol.solve(&rhs);
    let c = Array2::from_shape_fn((n, nc), |(i, j)| sol[(i, j)]);
    info!(
        "least-squares spline of degree {}: {} sites, {} coefficients, lam = {}",
        k, m, n, lam
    );
    Ok(BSpline::construct_fast(t.to_vec(), c, k, Extrapolate::Bool(true), layout))
}

/// `R_ij = int B_i''(x) B_j''(x) dx` over the base interval.
///
/// On each knot span the integrand is a polynomial of degree `2(k-2)`; Gauss-Legendre
/// with `max(k, 2)` nodes integrates it exactly.
pub fn roughness_matrix(t: &[f64], k: usize) -> SplineResult<DMatrix<f64>> {
    let n = t.len() - k - 1;
    let mut r = DMatrix::zeros(n, n);
    if k < 2 {
        return Ok(r);
    }
    let quad = GaussLegendre::new(k.max(2)).map_err(|e| {
        SplineError::invalid("k", format!("failed to create Gauss-Legendre quadrature: {:?}", e))
    })?;
    for ell in k..n {
        let (a, b) = (t[ell], t[ell + 1]);
        if b <= a {
            continue;
        }
        let second = |x: f64| basis_functions_nonzero(t, x, k, ell, 2);
        for p in 0..=k {
            for q in p..=k {
                let f = |x: f64| {
                    let h = second(x);
                    h[p] * h[q]
                };
                let v = quad.integrate(a, b, &f);
                r[(ell - k + p, ell - k + q)] += v;
                if p != q {
                    r[(ell - k + q, ell - k + p)] += v;
                }
            }
        }
    }
    Ok(r)
}
