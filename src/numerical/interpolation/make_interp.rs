//! Interpolating B-spline of arbitrary degree.
//!
//! The coefficients solve the collocation system `sum_j c_j B_j(x_i) = y_i`, optionally
//! extended by derivative rows at the ends. The matrix is banded and is factorized
//! once by banded LU with partial pivoting; every batch column then reuses the
//! factorization.
use crate::numerical::interpolation::batch::{BatchLayout, columns_to_array2};
use crate::numerical::interpolation::bspline::{
    BSpline, basis_functions_nonzero, check_knots, find_interval, schoenberg_whitney,
};
use crate::numerical::interpolation::errors::{
    SplineError, SplineResult, check_strictly_increasing,
};
use crate::numerical::interpolation::ppoly::Extrapolate;
use crate::numerical::interpolation::settings::SplineSettings;
use crate::somelinalg::RustedLINPACK::lu_band_nalg::{BandMatrix, LU_nalgebra};
use crate::somelinalg::linear_sys_diagnostics::pivot_ratio_check;
use log::{debug, info};
use ndarray::{Array2, ArrayViewD};
use rayon::prelude::*;

/// Derivative conditions at the ends of the interpolation interval:
/// lists of `(derivative order, value)`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DerivativeConstraints {
    pub left: Vec<(usize, f64)>,
    pub right: Vec<(usize, f64)>,
}

impl DerivativeConstraints {
    pub fn new(left: Vec<(usize, f64)>, right: Vec<(usize, f64)>) -> Self {
        DerivativeConstraints { left, right }
    }

    /// Derivatives of orders `(k+1)/2 ..= k-1` vanish at both ends
    /// (the second derivative for cubics). Odd degrees only.
    pub fn natural(k: usize) -> SplineResult<Self> {
        let half = Self::half_count(k)?;
        let orders: Vec<(usize, f64)> = (half + 1..=2 * half).map(|o| (o, 0.0)).collect();
        Ok(DerivativeConstraints {
            left: orders.clone(),
            right: orders,
        })
    }

    /// Derivatives of orders `1 ..= (k-1)/2` vanish at both ends
    /// (the first derivative for cubics). Odd degrees only.
    pub fn clamped(k: usize) -> SplineResult<Self> {
        let half = Self::half_count(k)?;
        let orders: Vec<(usize, f64)> = (1..=half).map(|o| (o, 0.0)).collect();
        Ok(DerivativeConstraints {
            left: orders.clone(),
            right: orders,
        })
    }

    fn half_count(k: usize) -> SplineResult<usize> {
        if k % 2 == 0 || k < 3 {
            return Err(SplineError::invalid(
                "bc",
                format!("symmetric end conditions need an odd degree >= 3, got {}", k),
            ));
        }
        Ok((k - 1) / 2)
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Default knots for interpolation at `x` without derivative constraints: odd degree
/// uses the not-a-knot sites, even degree the midpoints between sites.
pub fn not_a_knot_knots(x: &[f64], k: usize) -> Vec<f64> {
    let n = x.len();
    let mut t = vec![x[0]; k + 1];
    if k % 2 == 1 {
        let m = (k - 1) / 2;
        t.extend_from_slice(&x[m + 1..n - m - 1]);
    } else {
        let d = k / 2;
        t.extend((d..n - 1 - d).map(|i| 0.5 * (x[i] + x[i + 1])));
    }
    t.extend(std::iter::repeat_n(x[n - 1], k + 1));
    t
}

/// `k`-fold boundary knots around all sites (used with derivative constraints).
pub fn augmented_knots(x: &[f64], k: usize) -> Vec<f64> {
    let n = x.len();
    let mut t = vec![x[0]; k];
    t.extend_from_slice(x);
    t.extend(std::iter::repeat_n(x[n - 1], k));
    t
}

/// Interpolating B-spline of degree `k`.
///
/// `knots` overrides the default knot placement; `bc` adds derivative conditions at
/// the ends, in which case `len(left) + len(right)` extra coefficients must be
/// provided by the knots (`k - 1` with the default knots).
pub fn make_interp_spline(
    x: &[f64],
    y: ArrayViewD<'_, f64>,
    k: usize,
    knots: Option<Vec<f64>>,
    bc: Option<DerivativeConstraints>,
    axis: usize,
) -> SplineResult<BSpline> {
    make_interp_spline_with_settings(x, y, k, knots, bc, axis, &SplineSettings::default())
}

pub fn make_interp_spline_with_settings(
    x: &[f64],
    y: ArrayViewD<'_, f64>,
    k: usize,
    knots: Option<Vec<f64>>,
    bc: Option<DerivativeConstraints>,
    axis: usize,
    settings: &SplineSettings,
) -> SplineResult<BSpline> {
    check_strictly_increasing("x", x)?;
    let n = x.len();
    let (layout, yy) = BatchLayout::from_values(&y, axis, n)?;
    if yy.iter().any(|v| !v.is_finite()) {
        return Err(SplineError::invalid("y", "values must be finite"));
    }
    let bc = bc.unwrap_or_default();

    if k == 0 {
        if knots.is_some() || !bc.is_empty() {
            return Err(SplineError::invalid(
                "k",
                "degree 0 accepts neither knots nor derivative conditions",
            ));
        }
        if n < 2 {
            return Err(insufficient(k, 2, n));
        }
        let mut t = x.to_vec();
        t.push(x[n - 1]);
        return finish(t, yy, 0, layout);
    }
    if n < k + 1 {
        return Err(insufficient(k, k + 1, n));
    }
    if k == 1 && knots.is_none() {
        if !bc.is_empty() {
            return Err(SplineError::invalid(
                "bc",
                "linear interpolation accepts no derivative conditions",
            ));
        }
        let mut t = vec![x[0]];
        t.extend_from_slice(x);
        t.push(x[n - 1]);
        return finish(t, yy, 1, layout);
    }
    for &(order, _) in bc.left.iter().chain(bc.right.iter()) {
        if order > k {
            return Err(SplineError::invalid(
                "bc",
                format!("derivative order {} exceeds the degree {}", order, k),
            ));
        }
    }

    let t = match knots {
        Some(t) => t,
        None if bc.is_empty() => not_a_knot_knots(x, k),
        None => {
            if bc.len() != k - 1 {
                return Err(SplineError::invalid(
                    "bc",
                    format!(
                        "the default knots need {} derivative conditions in total, got {}",
                        k - 1,
                        bc.len()
                    ),
                ));
            }
            augmented_knots(x, k)
        }
    };
    if t.len() < k + 2 {
        return Err(SplineError::InvalidKnots(format!(
            "at least {} knots are needed for degree {}",
            k + 2,
            k
        )));
    }
    let ncoef = t.len() - k - 1;
    if n + bc.len() != ncoef {
        return Err(SplineError::LengthMismatch {
            context: "data points plus derivative conditions vs coefficients",
            expected: ncoef,
            actual: n + bc.len(),
        });
    }
    check_knots(&t, k, ncoef)?;
    if x[0] < t[k] || x[n - 1] > t[ncoef] {
        return Err(SplineError::NoSolutionForKnots(format!(
            "sites [{}, {}] leave the base interval [{}, {}]",
            x[0],
            x[n - 1],
            t[k],
            t[ncoef]
        )));
    }
    if bc.is_empty() && !schoenberg_whitney(x, &t, k) {
        return Err(SplineError::NoSolutionForKnots(
            "Schoenberg-Whitney condition is violated".to_string(),
        ));
    }

    // rows: left conditions, collocation, right conditions; (first column, values)
    let mut rows: Vec<(usize, Vec<f64>)> = Vec::with_capacity(ncoef);
    let mut rhs_fixed: Vec<Option<f64>> = Vec::with_capacity(ncoef);
    let ell_left = span(&t, k, x[0])?;
    for &(order, value) in &bc.left {
        rows.push((ell_left - k, basis_functions_nonzero(&t, x[0], k, ell_left, order)));
        rhs_fixed.push(Some(value));
    }
    let mut ell = k;
    for &xi in x {
        ell = find_interval(&t, k, xi, ell, false).ok_or_else(|| out_of_base(&t, k, xi))?;
        rows.push((ell - k, basis_functions_nonzero(&t, xi, k, ell, 0)));
        rhs_fixed.push(None);
    }
    let ell_right = span(&t, k, x[n - 1])?;
    for &(order, value) in &bc.right {
        rows.push((ell_right - k, basis_functions_nonzero(&t, x[n - 1], k, ell_right, order)));
        rhs_fixed.push(Some(value));
    }

    let (mut kl, mut ku) = (0, 0);
    for (r, (start, vals)) in rows.iter().enumerate() {
        kl = kl.max(r.saturating_sub(*start));
        ku = ku.max((start + vals.len() - 1).saturating_sub(r));
    }
    let mut band = BandMatrix::zeros(ncoef, kl, ku);
    for (r, (start, vals)) in rows.iter().enumerate() {
        for (a, &v) in vals.iter().enumerate() {
            if v != 0.0 {
                band.set(r, start + a, v);
            }
        }
    }
    let pivot_tol = settings.pivot_tolerance(band.norm_inf(), ncoef);
    debug!(
        "collocation matrix {}x{}, kl = {}, ku = {}, pivot tolerance {:.3e}",
        ncoef, ncoef, kl, ku, pivot_tol
    );
    let lu = LU_nalgebra::new(band, pivot_tol).map_err(|e| {
        SplineError::SingularSystem(format!("collocation matrix cannot be factorized: {}", e))
    })?;
    let (min_pivot, max_pivot) = lu.pivot_range();
    pivot_ratio_check(min_pivot, max_pivot, settings.condition_threshold);

    let nc = yy.ncols();
    let cols: Vec<Vec<f64>> = (0..nc)
        .into_par_iter()
        .map(|jp| -> SplineResult<Vec<f64>> {
            let mut b: Vec<f64> = Vec::with_capacity(ncoef);
            let mut site = 0;
            for fixed in &rhs_fixed {
                match fixed {
                    Some(v) => b.push(*v),
                    None => {
                        b.push(yy[[site, jp]]);
                        site += 1;
                    }
                }
            }
            lu.solve_slice_mut(&mut b)?;
            Ok(b)
        })
        .collect::<SplineResult<Vec<Vec<f64>>>>()?;
    let c = columns_to_array2(&cols, ncoef);
    info!(
        "interpolating B-spline of degree {} on {} sites ({} coefficients, {} batch columns)",
        k, n, ncoef, nc
    );
    Ok(BSpline::construct_fast(t, c, k, Extrapolate::Bool(true), layout))
}

fn finish(t: Vec<f64>, c: Array2<f64>, k: usize, layout: BatchLayout) -> SplineResult<BSpline> {
    info!(
        "interpolating B-spline of degree {} on {} sites ({} batch columns)",
        k,
        c.nrows(),
        layout.batch_size()
    );
    BSpline::new(t, c, k, Extrapolate::Bool(true))?.with_layout(layout)
}

fn span(t: &[f64], k: usize, x: f64) -> SplineResult<usize> {
    find_interval(t, k, x, k, false).ok_or_else(|| out_of_base(t, k, x))
}

fn out_of_base(t: &[f64], k: usize, x: f64) -> SplineError {
    let n = t.len() - k - 1;
    SplineError::NoSolutionForKnots(format!(
        "site {} is outside of the base interval [{}, {}]",
        x, t[k], t[n]
    ))
}

fn insufficient(k: usize, required: usize, actual: usize) -> SplineError {
    SplineError::InsufficientPoints {
        context: format!("interpolating spline of degree {}", k),
        required,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::interpolation::batch::as_values;
    use approx::assert_relative_eq;

    fn grid(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn default_knots() {
        let x = grid(7, 1.0);
        let t3 = not_a_knot_knots(&x, 3);
        assert_eq!(t3, vec![0.0, 0.0, 0.0, 0.0, 2.0, 3.0, 4.0, 6.0, 6.0, 6.0, 6.0]);
        let t2 = not_a_knot_knots(&x, 2);
        assert_eq!(t2, vec![0.0, 0.0, 0.0, 1.5, 2.5, 3.5, 4.5, 6.0, 6.0, 6.0]);
        assert_eq!(t2.len(), x.len() + 2 + 1);
        let ta = augmented_knots(&x[..3], 3);
        assert_eq!(ta, vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn interpolates_for_each_degree() {
        let x = vec![0.0, 0.4, 1.1, 1.5, 2.3, 3.0, 3.2, 4.0];
        let y: Vec<f64> = x.iter().map(|v: &f64| (1.3 * v).sin()).collect();
        for k in 0..=5 {
            let bs = make_interp_spline(&x, as_values(&y), k, None, None, 0).unwrap();
            assert_eq!(bs.degree(), k);
            let vals = bs.evaluate_flat(&x, 0, None);
            for i in 0..x.len() {
                assert_relative_eq!(vals[[i, 0]], y[i], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn cubic_reproduces_cubic_polynomial() {
        let x = grid(6, 0.5);
        let f = |v: f64| v * v * v - 2.0 * v + 1.0;
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let bs = make_interp_spline(&x, as_values(&y), 3, None, None, 0).unwrap();
        let vals = bs.evaluate_flat(&[0.3, 1.7, 2.4], 0, None);
        for (i, v) in [0.3, 1.7, 2.4].iter().enumerate() {
            assert_relative_eq!(vals[[i, 0]], f(*v), epsilon = 1e-10);
        }
    }

    #[test]
    fn natural_and_clamped_conditions() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.5];
        let y = vec![0.0, 1.0, 0.0, 2.0, 1.0];
        let nat = make_interp_spline(&x, as_values(&y), 3, None, Some(DerivativeConstraints::natural(3).unwrap()), 0)
            .unwrap();
        assert_eq!(nat.n_coefs(), x.len() + 2);
        let d2 = nat.evaluate_flat(&[0.0, 4.5], 2, None);
        assert_relative_eq!(d2[[0, 0]], 0.0, epsilon = 1e-10);
        assert_relative_eq!(d2[[1, 0]], 0.0, epsilon = 1e-10);

        let bc = DerivativeConstraints::new(vec![(1, 2.0)], vec![(1, -1.0)]);
        let cl = make_interp_spline(&x, as_values(&y), 3, None, Some(bc), 0).unwrap();
        let d1 = cl.evaluate_flat(&[0.0, 4.5], 1, None);
        assert_relative_eq!(d1[[0, 0]], 2.0, epsilon = 1e-10);
        assert_relative_eq!(d1[[1, 0]], -1.0, epsilon = 1e-10);
        let vals = cl.evaluate_flat(&x, 0, None);
        for i in 0..x.len() {
            assert_relative_eq!(vals[[i, 0]], y[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn quintic_natural_conditions() {
        let x = grid(8, 1.0);
        let y: Vec<f64> = x.iter().map(|v| v.cos()).collect();
        let bc = DerivativeConstraints::natural(5).unwrap();
        assert_eq!(bc.left, vec![(3, 0.0), (4, 0.0)]);
        let bs = make_interp_spline(&x, as_values(&y), 5, None, Some(bc), 0).unwrap();
        let d3 = bs.evaluate_flat(&[0.0, 7.0], 3, None);
        assert_relative_eq!(d3[[0, 0]], 0.0, epsilon = 1e-9);
        assert_relative_eq!(d3[[1, 0]], 0.0, epsilon = 1e-9);
        assert!(DerivativeConstraints::natural(4).is_err());
        assert_eq!(DerivativeConstraints::clamped(5).unwrap().right, vec![(1, 0.0), (2, 0.0)]);
    }

    #[test]
    fn error_cases() {
        let x = grid(3, 1.0);
        let y = vec![0.0, 1.0, 0.0];
        assert!(matches!(
            make_interp_spline(&x, as_values(&y), 3, None, None, 0),
            Err(SplineError::InsufficientPoints { required: 4, actual: 3, .. })
        ));
        let bc = DerivativeConstraints::new(vec![(1, 0.0)], vec![]);
        assert!(matches!(
            make_interp_spline(&x, as_values(&y), 3, None, Some(bc), 0),
            Err(SplineError::InsufficientPoints { .. })
        ));
        let x4 = grid(4, 1.0);
        let y4 = vec![0.0, 1.0, 0.0, 1.0];
        let bc = DerivativeConstraints::new(vec![(1, 0.0)], vec![]);
        assert!(matches!(
            make_interp_spline(&x4, as_values(&y4), 3, None, Some(bc), 0),
            Err(SplineError::InvalidParameter { parameter: "bc", .. })
        ));
        // B_1 lives on [0, 0.4] but the second site is 1.0
        let t = vec![0.0, 0.0, 0.0, 0.0, 0.2, 0.4, 3.0, 3.0, 3.0, 3.0];
        let x6 = vec![0.0, 1.0, 1.5, 2.0, 2.5, 3.0];
        let y6 = vec![0.0; 6];
        assert!(matches!(
            make_interp_spline(&x6, as_values(&y6), 3, Some(t), None, 0),
            Err(SplineError::NoSolutionForKnots(_))
        ));
        assert!(matches!(
            make_interp_spline(&[0.0, 1.0, 1.0], as_values(&y), 1, None, None, 0),
            Err(SplineError::NotStrictlyIncreasing { .. })
        ));
    }

    #[test]
    fn batch_axis_one() {
        // samples along axis 1 of a (2, 5) array
        let x = grid(5, 1.0);
        let y = ndarray::Array2::from_shape_fn((2, 5), |(r, i)| (r + 1) as f64 * i as f64 * i as f64);
        let bs = make_interp_spline(&x, y.view().into_dyn(), 3, None, None, 1).unwrap();
        assert_eq!(bs.layout().lead_shape, vec![2]);
        let vals = bs.evaluate_flat(&[1.5], 0, None);
        assert_relative_eq!(vals[[0, 0]], 2.25, epsilon = 1e-10);
        assert_relative_eq!(vals[[0, 1]], 4.5, epsilon = 1e-10);
    }
}
