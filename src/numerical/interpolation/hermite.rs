//! Piecewise cubic Hermite interpolation: values and first derivatives at the sites
//! determine one cubic per interval. Every cubic builder of the crate (boundary
//! condition cubic spline, PCHIP, Akima) ends here once its slopes are known.
use crate::numerical::interpolation::batch::{BatchLayout, columns_to_array2, solve_columns};
use crate::numerical::interpolation::errors::{
    SplineError, SplineResult, check_strictly_increasing,
};
use crate::numerical::interpolation::ppoly::{Extrapolate, PPoly};
use log::info;
use ndarray::{Array2, Array3, ArrayViewD};

/// Power-basis coefficients (4, n-1, B) of the cubic Hermite interpolant of
/// values `y` and slopes `dydx`, both of shape (n, B).
///
/// With `h` the interval length, `m` the secant and `d_i`, `d_{i+1}` the end slopes:
/// `t = (d_i + d_{i+1} - 2m)/h`, `c3 = t/h`, `c2 = (m - d_i)/h - t`, `c1 = d_i`, `c0 = y_i`.
pub(crate) fn hermite_coefficients(x: &[f64], y: &Array2<f64>, dydx: &Array2<f64>) -> Array3<f64> {
    let n = x.len();
    let nc = y.ncols();
    let mut c = Array3::zeros((4, n - 1, nc));
    for i in 0..n - 1 {
        let h = x[i + 1] - x[i];
        for j in 0..nc {
            let slope = (y[[i + 1, j]] - y[[i, j]]) / h;
            let t = (dydx[[i, j]] + dydx[[i + 1, j]] - 2.0 * slope) / h;
            c[[0, i, j]] = t / h;
            c[[1, i, j]] = (slope - dydx[[i, j]]) / h - t;
            c[[2, i, j]] = dydx[[i, j]];
            c[[3, i, j]] = y[[i, j]];
        }
    }
    c
}

/// Common path of the slope-based builders: validate the sites, split `y` into batch
/// columns, compute the slopes of every column in parallel and convert to a `PPoly`.
pub(crate) fn build_from_slopes<F>(
    name: &str,
    x: &[f64],
    y: ArrayViewD<'_, f64>,
    axis: usize,
    min_points: usize,
    extrapolate: Extrapolate,
    slopes: F,
) -> SplineResult<PPoly>
where
    F: Fn(&[f64], &[f64]) -> SplineResult<Vec<f64>> + Sync,
{
    check_sites(name, x, min_points)?;
    let (layout, yy) = BatchLayout::from_values(&y, axis, x.len())?;
    let cols = solve_columns(&yy, |_, col| slopes(x, col))?;
    let dydx = columns_to_array2(&cols, x.len());
    let c = hermite_coefficients(x, &yy, &dydx);
    info!(
        "{} built on {} sites with {} batch columns",
        name,
        x.len(),
        layout.batch_size()
    );
    Ok(PPoly::construct_fast(c, x.to_vec(), extrapolate, layout))
}

pub(crate) fn check_sites(name: &str, x: &[f64], min_points: usize) -> SplineResult<()> {
    if x.len() < min_points {
        return Err(SplineError::InsufficientPoints {
            context: name.to_string(),
            required: min_points,
            actual: x.len(),
        });
    }
    check_strictly_increasing("x", x)
}

/// Piecewise cubic interpolant matching given values and first derivatives.
#[derive(Clone, Debug)]
pub struct CubicHermiteSpline {
    ppoly: PPoly,
}

impl CubicHermiteSpline {
    /// `y` and `dydx` must have the same shape with `len(x)` samples along `axis`.
    pub fn new(
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        dydx: ArrayViewD<'_, f64>,
        axis: usize,
        extrapolate: Option<Extrapolate>,
    ) -> SplineResult<Self> {
        if y.shape() != dydx.shape() {
            return Err(SplineError::invalid(
                "dydx",
                format!("shape {:?} differs from y shape {:?}", dydx.shape(), y.shape()),
            ));
        }
        check_sites("cubic Hermite spline", x, 2)?;
        let (layout, yy) = BatchLayout::from_values(&y, axis, x.len())?;
        let (_, slopes) = BatchLayout::from_values(&dydx, axis, x.len())?;
        if slopes.iter().any(|v| !v.is_finite()) {
            return Err(SplineError::invalid("dydx", "slopes must be finite"));
        }
        let c = hermite_coefficients(x, &yy, &slopes);
        info!(
            "cubic Hermite spline built on {} sites with {} batch columns",
            x.len(),
            layout.batch_size()
        );
        Ok(CubicHermiteSpline {
            ppoly: PPoly::construct_fast(c, x.to_vec(), extrapolate.unwrap_or_default(), layout),
        })
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

    #[test]
    fn hermite_reproduces_cubic() {
        // f = x^3 - x, f' = 3x^2 - 1
        let x = vec![-1.0, 0.0, 0.5, 2.0];
        let y: Vec<f64> = x.iter().map(|v| v * v * v - v).collect();
        let d: Vec<f64> = x.iter().map(|v| 3.0 * v * v - 1.0).collect();
        let spl = CubicHermiteSpline::new(&x, as_values(&y), as_values(&d), 0, None).unwrap();
        let pp = spl.as_ppoly();
        let xs = [-0.7, 0.2, 1.3, 2.5];
        let vals = pp.evaluate_flat(&xs, 0, None);
        for (i, v) in xs.iter().enumerate() {
            assert_relative_eq!(vals[[i, 0]], v * v * v - v, epsilon = 1e-12);
        }
        let slopes = pp.evaluate_flat(&x, 1, None);
        for i in 0..x.len() {
            assert_relative_eq!(slopes[[i, 0]], d[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn hermite_rejects_bad_input() {
        let x = vec![0.0, 1.0, 1.0];
        let y = vec![0.0, 1.0, 2.0];
        assert!(matches!(
            CubicHermiteSpline::new(&x, as_values(&y), as_values(&y), 0, None),
            Err(SplineError::NotStrictlyIncreasing { .. })
        ));
        let x = vec![0.0, 1.0, 2.0];
        let d = vec![0.0, 1.0];
        assert!(CubicHermiteSpline::new(&x, as_values(&y), as_values(&d), 0, None).is_err());
        let x1 = vec![0.0];
        assert!(matches!(
            CubicHermiteSpline::new(&x1, as_values(&[1.0]), as_values(&[0.0]), 0, None),
            Err(SplineError::InsufficientPoints { required: 2, .. })
        ));
    }
}
