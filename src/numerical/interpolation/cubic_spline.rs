//! Cubic spline with C2 continuity and a choice of end conditions.
//!
//! The unknowns are the first derivatives `s_i` at the sites. Interior rows enforce
//! continuity of the second derivative,
//!
//! `h_R s_{i-1} + 2 (h_L + h_R) s_i + h_L s_{i+1} = 3 (h_R m_L + h_L m_R)`,
//!
//! with `h_L`, `h_R` the lengths and `m_L`, `m_R` the secants of the intervals to the
//! left and right of site i. The first and last rows come from the boundary
//! condition. The tridiagonal system is solved by the Thomas algorithm, the cyclic
//! one of the periodic condition by Sherman-Morrison reduction.
use crate::numerical::interpolation::batch::{BatchLayout, columns_to_array2, solve_columns};
use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use crate::numerical::interpolation::hermite::{check_sites, hermite_coefficients};
use crate::numerical::interpolation::ppoly::{Extrapolate, PPoly};
use crate::numerical::interpolation::settings::SplineSettings;
use crate::somelinalg::RustedLINPACK::tridiagonal::{cyclic_thomas_solve, thomas_solve};
use log::{debug, info};
use ndarray::ArrayViewD;
use std::fmt;

/// End conditions of a cubic spline.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum BoundaryCondition {
    /// third derivative continuous across the second and second-to-last sites
    #[default]
    NotAKnot,
    /// zero second derivative at both ends
    Natural,
    /// prescribed first derivatives at the ends
    Clamped { left: f64, right: f64 },
    /// first and second derivatives match at the ends; needs `y[0] == y[n-1]`
    Periodic,
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryCondition::NotAKnot => write!(f, "not-a-knot"),
            BoundaryCondition::Natural => write!(f, "natural"),
            BoundaryCondition::Clamped { left, right } => write!(f, "clamped({}, {})", left, right),
            BoundaryCondition::Periodic => write!(f, "periodic"),
        }
    }
}

impl BoundaryCondition {
    pub fn min_points(&self) -> usize {
        match self {
            BoundaryCondition::NotAKnot => 3,
            _ => 2,
        }
    }
}

/// Slopes of one batch column.
fn solve_slopes(
    x: &[f64],
    y: &[f64],
    bc: &BoundaryCondition,
    settings: &SplineSettings,
) -> SplineResult<Vec<f64>> {
    let n = x.len();
    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let slope: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / dx[i]).collect();
    let scale = dx.iter().fold(0.0_f64, |acc, &h| acc.max(h));
    let pivot_tol = settings.pivot_tolerance(3.0 * scale, n);

    match bc {
        BoundaryCondition::Periodic if n == 2 => Ok(vec![0.0; 2]),
        BoundaryCondition::Periodic if n == 3 => {
            // both intervals must share slope at the sites
            let s = (slope[0] / dx[0] + slope[1] / dx[1]) / (1.0 / dx[0] + 1.0 / dx[1]);
            Ok(vec![s; 3])
        }
        BoundaryCondition::Periodic => {
            // unknowns s_0 .. s_{n-2}; s_{n-1} = s_0
            let size = n - 1;
            let mut sub = vec![0.0; size];
            let mut diag = vec![0.0; size];
            let mut sup = vec![0.0; size];
            let mut rhs = vec![0.0; size];
            for i in 0..size {
                let l = if i == 0 { n - 2 } else { i - 1 };
                let r = i;
                sub[i] = dx[r];
                diag[i] = 2.0 * (dx[l] + dx[r]);
                sup[i] = dx[l];
                rhs[i] = 3.0 * (dx[r] * slope[l] + dx[l] * slope[r]);
            }
            let corner_up = sub[0];
            let corner_low = sup[size - 1];
            let mut s = cyclic_thomas_solve(&sub, &diag, &sup, corner_low, corner_up, &rhs, pivot_tol)?;
            s.push(s[0]);
            Ok(s)
        }
        BoundaryCondition::NotAKnot if n == 3 => {
            // the single parabola through the three points; end rows carry the spacing
            // so every pivot scales like the interior one
            let sub = [0.0, dx[1], dx[1]];
            let diag = [dx[0], 2.0 * (dx[0] + dx[1]), dx[1]];
            let sup = [dx[0], dx[0], 0.0];
            let rhs = [
                2.0 * dx[0] * slope[0],
                3.0 * (dx[0] * slope[1] + dx[1] * slope[0]),
                2.0 * dx[1] * slope[1],
            ];
            Ok(thomas_solve(&sub, &diag, &sup, &rhs, pivot_tol)?)
        }
        _ => {
            let mut sub = vec![0.0; n];
            let mut diag = vec![0.0; n];
            let mut sup = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                sub[i] = dx[i];
                diag[i] = 2.0 * (dx[i - 1] + dx[i]);
                sup[i] = dx[i - 1];
                rhs[i] = 3.0 * (dx[i] * slope[i - 1] + dx[i - 1] * slope[i]);
            }
            match bc {
                BoundaryCondition::Natural => {
                    diag[0] = 2.0 * dx[0];
                    sup[0] = dx[0];
                    rhs[0] = 3.0 * dx[0] * slope[0];
                    sub[n - 1] = dx[n - 2];
                    diag[n - 1] = 2.0 * dx[n - 2];
                    rhs[n - 1] = 3.0 * dx[n - 2] * slope[n - 2];
                }
                BoundaryCondition::Clamped { left, right } => {
                    // s = value, scaled by the end interval
                    diag[0] = dx[0];
                    rhs[0] = dx[0] * left;
                    diag[n - 1] = dx[n - 2];
                    rhs[n - 1] = dx[n - 2] * right;
                }
                _ => {
                    // not-a-knot
                    let d = x[2] - x[0];
                    diag[0] = dx[1];
                    sup[0] = d;
                    rhs[0] = ((dx[0] + 2.0 * d) * dx[1] * slope[0] + dx[0] * dx[0] * slope[1]) / d;
                    let d = x[n - 1] - x[n - 3];
                    diag[n - 1] = dx[n - 3];
                    sub[n - 1] = d;
                    rhs[n - 1] = (dx[n - 2] * dx[n - 2] * slope[n - 3]
                        + (2.0 * d + dx[n - 2]) * dx[n - 3] * slope[n - 2])
                        / d;
                }
            }
            Ok(thomas_solve(&sub, &diag, &sup, &rhs, pivot_tol)?)
        }
    }
}

/// Cubic spline data interpolator, piecewise cubic and twice continuously differentiable.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    ppoly: PPoly,
    bc: BoundaryCondition,
}

impl CubicSpline {
    /// Interpolates `y` (with `len(x)` samples along `axis`) at the strictly
    /// increasing sites `x`. Without an explicit `extrapolate`, periodic splines
    /// extrapolate periodically and the others from the end polynomials.
    pub fn new(
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        axis: usize,
        bc: BoundaryCondition,
        extrapolate: Option<Extrapolate>,
    ) -> SplineResult<Self> {
        Self::new_with_settings(x, y, axis, bc, extrapolate, &SplineSettings::default())
    }

    pub fn new_with_settings(
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        axis: usize,
        bc: BoundaryCondition,
        extrapolate: Option<Extrapolate>,
        settings: &SplineSettings,
    ) -> SplineResult<Self> {
        let context = format!("cubic spline with {} boundary condition", bc);
        check_sites(&context, x, bc.min_points())?;
        let (layout, yy) = BatchLayout::from_values(&y, axis, x.len())?;
        let n = x.len();
        if bc == BoundaryCondition::Periodic {
            for (column, col) in yy.columns().into_iter().enumerate() {
                let (first, last) = (col[0], col[n - 1]);
                if !settings.periodic_close(first, last) {
                    return Err(SplineError::PeriodicMismatch {
                        column,
                        first,
                        last,
                    });
                }
            }
        }
        if yy.iter().any(|v| !v.is_finite()) {
            return Err(SplineError::invalid("y", "values must be finite"));
        }
        let cols = solve_columns(&yy, |_, col| solve_slopes(x, col, &bc, settings))?;
        let dydx = columns_to_array2(&cols, n);
        debug!("cubic spline slopes solved for {} columns", cols.len());
        let c = hermite_coefficients(x, &yy, &dydx);
        let extrapolate = extrapolate.unwrap_or(if bc == BoundaryCondition::Periodic {
            Extrapolate::Periodic
        } else {
            Extrapolate::Bool(true)
        });
        info!(
            "{} built on {} sites with {} batch columns",
            context,
            n,
            layout.batch_size()
        );
        Ok(CubicSpline {
            ppoly: PPoly::construct_fast(c, x.to_vec(), extrapolate, layout),
            bc,
        })
    }

    pub fn boundary_condition(&self) -> &BoundaryCondition {
        &self.bc
    }

    pub fn as_ppoly(&self) -> &PPoly {
        &self.ppoly
    }

    pub fn into_ppoly(self) -> PPoly {
        self.ppoly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::interpolation::batch::as_values;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn sample(x: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
        x.iter().map(|&v| f(v)).collect()
    }

    #[test]
    fn not_a_knot_reproduces_cubic() {
        let x = vec![0.0, 0.7, 1.0, 2.2, 3.0, 4.1];
        let f = |v: f64| 2.0 * v * v * v - v * v + 0.5;
        let y = sample(&x, f);
        let cs = CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::NotAKnot, None).unwrap();
        let xs = [0.3, 1.5, 2.9, 4.0, 5.0];
        let vals = cs.as_ppoly().evaluate_flat(&xs, 0, None);
        for (i, &v) in xs.iter().enumerate() {
            assert_relative_eq!(vals[[i, 0]], f(v), epsilon = 1e-9);
        }
    }

    #[test]
    fn not_a_knot_three_points_is_parabola() {
        let x = vec![0.0, 1.0, 3.0];
        let f = |v: f64| v * v - 2.0 * v + 4.0;
        let y = sample(&x, f);
        let cs = CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::NotAKnot, None).unwrap();
        let c = cs.as_ppoly().coefficients();
        // no cubic term
        assert_relative_eq!(c[[0, 0, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(c[[0, 1, 0]], 0.0, epsilon = 1e-12);
        let vals = cs.as_ppoly().evaluate_flat(&[2.0], 0, None);
        assert_relative_eq!(vals[[0, 0]], f(2.0), epsilon = 1e-12);
    }

    #[test]
    fn natural_has_zero_curvature_at_ends() {
        let x = vec![0.0, 1.0, 2.5, 3.0, 4.0];
        let y = vec![1.0, -1.0, 2.0, 0.0, 3.0];
        let cs = CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::Natural, None).unwrap();
        let d2 = cs.as_ppoly().evaluate_flat(&[0.0, 4.0], 2, None);
        assert_relative_eq!(d2[[0, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(d2[[1, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn clamped_matches_end_slopes() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0.0, 1.0, 0.0];
        let bc = BoundaryCondition::Clamped {
            left: 2.0,
            right: -0.5,
        };
        let cs = CubicSpline::new(&x, as_values(&y), 0, bc, None).unwrap();
        let d1 = cs.as_ppoly().evaluate_flat(&[0.0, 2.0], 1, None);
        assert_relative_eq!(d1[[0, 0]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(d1[[1, 0]], -0.5, epsilon = 1e-12);
        // two points, clamped
        let cs2 = CubicSpline::new(
            &[0.0, 1.0],
            as_values(&[0.0, 0.0]),
            0,
            BoundaryCondition::Clamped { left: 1.0, right: 1.0 },
            None,
        )
        .unwrap();
        let d = cs2.as_ppoly().evaluate_flat(&[0.0, 1.0], 1, None);
        assert_relative_eq!(d[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(d[[1, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn clamped_and_three_point_rows_follow_the_spacing() {
        // spacing so wide that a unit end row would look singular next to the interior
        let x: Vec<f64> = (0..6).map(|i| i as f64 * 1e15).collect();
        let y = vec![0.0, 1.0, 0.5, 2.0, 1.0, 3.0];
        let bc = BoundaryCondition::Clamped {
            left: 2e-15,
            right: -1e-15,
        };
        let cs = CubicSpline::new(&x, as_values(&y), 0, bc, None).unwrap();
        let d1 = cs.as_ppoly().evaluate_flat(&[x[0], x[5]], 1, None);
        assert_relative_eq!(d1[[0, 0]], 2e-15, max_relative = 1e-10);
        assert_relative_eq!(d1[[1, 0]], -1e-15, max_relative = 1e-10);
        let at = cs.as_ppoly().evaluate_flat(&x, 0, None);
        for i in 0..x.len() {
            assert_relative_eq!(at[[i, 0]], y[i], epsilon = 1e-9);
        }
        assert!(CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::Natural, None).is_ok());

        let x3 = [0.0, 1e15, 3e15];
        let f = |v: f64| {
            let u = v / 1e15;
            u * u - 2.0 * u + 4.0
        };
        let y3 = sample(&x3, f);
        let cs = CubicSpline::new(&x3, as_values(&y3), 0, BoundaryCondition::NotAKnot, None).unwrap();
        let vals = cs.as_ppoly().evaluate_flat(&[2e15], 0, None);
        assert_relative_eq!(vals[[0, 0]], f(2e15), epsilon = 1e-9);
    }

    #[test]
    fn periodic_spline_is_smooth_across_the_period() {
        let n = 9;
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 2.0 * std::f64::consts::PI / (n - 1) as f64).collect();
        let mut y = sample(&x, f64::sin);
        y[n - 1] = y[0];
        let cs = CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::Periodic, None).unwrap();
        let pp = cs.as_ppoly();
        assert_eq!(pp.extrapolate(), &Extrapolate::Periodic);
        let period = x[n - 1];
        for nu in 1..3 {
            let v = pp.evaluate_flat(&[0.0, period - 1e-12], nu, Some(Extrapolate::Bool(true)));
            assert_relative_eq!(v[[0, 0]], v[[1, 0]], epsilon = 1e-6);
        }
        let wrapped = pp.evaluate_flat(&[1.0, 1.0 + period], 0, None);
        assert_relative_eq!(wrapped[[0, 0]], wrapped[[1, 0]], epsilon = 1e-12);
    }

    #[test]
    fn periodic_small_cases() {
        let cs = CubicSpline::new(
            &[0.0, 1.0],
            as_values(&[2.0, 2.0]),
            0,
            BoundaryCondition::Periodic,
            None,
        )
        .unwrap();
        assert_relative_eq!(cs.as_ppoly().evaluate_flat(&[0.4], 0, None)[[0, 0]], 2.0);

        let x = [0.0, 1.0, 3.0];
        let cs = CubicSpline::new(&x, as_values(&[0.0, 1.0, 0.0]), 0, BoundaryCondition::Periodic, None)
            .unwrap();
        let d = cs.as_ppoly().evaluate_flat(&[0.0, 3.0 - 1e-12], 1, Some(Extrapolate::Bool(true)));
        assert_relative_eq!(d[[0, 0]], d[[1, 0]], epsilon = 1e-9);
        let d2 = cs.as_ppoly().evaluate_flat(&[0.0, 3.0 - 1e-12], 2, Some(Extrapolate::Bool(true)));
        assert_relative_eq!(d2[[0, 0]], d2[[1, 0]], epsilon = 1e-6);
    }

    #[test]
    fn periodic_requires_matching_ends() {
        let err = CubicSpline::new(
            &[0.0, 1.0, 2.0],
            as_values(&[0.0, 1.0, 0.5]),
            0,
            BoundaryCondition::Periodic,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SplineError::PeriodicMismatch { column: 0, .. }));
    }

    #[test]
    fn minimum_points_and_duplicates() {
        assert!(matches!(
            CubicSpline::new(&[0.0, 1.0], as_values(&[0.0, 1.0]), 0, BoundaryCondition::NotAKnot, None),
            Err(SplineError::InsufficientPoints { required: 3, actual: 2, .. })
        ));
        assert!(CubicSpline::new(&[0.0, 1.0], as_values(&[0.0, 1.0]), 0, BoundaryCondition::Natural, None).is_ok());
        assert!(matches!(
            CubicSpline::new(
                &[0.0, 1.0, 1.0, 2.0],
                as_values(&[0.0, 1.0, 2.0, 3.0]),
                0,
                BoundaryCondition::NotAKnot,
                None
            ),
            Err(SplineError::NotStrictlyIncreasing { index: 2, .. })
        ));
    }

    #[test]
    fn batch_columns_match_single_column_fits() {
        let x = vec![0.0, 1.0, 2.0, 3.5, 4.0];
        let y = Array2::from_shape_fn((5, 3), |(i, j)| ((i * (j + 1)) as f64).sin());
        let batch = CubicSpline::new(&x, y.view().into_dyn(), 0, BoundaryCondition::NotAKnot, None).unwrap();
        let xs = [0.5, 2.7, 3.9];
        let vals = batch.as_ppoly().evaluate_flat(&xs, 0, None);
        for j in 0..3 {
            let col: Vec<f64> = y.column(j).to_vec();
            let single = CubicSpline::new(&x, as_values(&col), 0, BoundaryCondition::NotAKnot, None).unwrap();
            let sv = single.as_ppoly().evaluate_flat(&xs, 0, None);
            for i in 0..xs.len() {
                assert_relative_eq!(vals[[i, j]], sv[[i, 0]], epsilon = 1e-14);
            }
        }
    }
}
