//! Curves through points in D dimensions: every coordinate is interpolated as a
//! function of one curve parameter `u`.
use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use crate::numerical::interpolation::ppoly::Extrapolate;
use crate::numerical::interpolation::spline_enum::{Spline, SplineKind, SplineOps};
use itertools::Itertools;
use log::info;
use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, Axis};
use strum_macros::{Display, EnumIter, EnumString};

/// How the curve parameter grows from point to point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Parametrization {
    /// 0, 1, ..., N-1
    Uniform,
    /// cumulative Euclidean distance
    #[default]
    ChordLength,
    /// cumulative square root of the distance
    Centripetal,
}

fn distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum::<f64>().sqrt()
}

/// Parameter values of the rows of `points` (shape (N, D)).
pub fn parametrize(points: ArrayView2<'_, f64>, parametrization: Parametrization) -> SplineResult<Vec<f64>> {
    let n = points.nrows();
    if n < 2 {
        return Err(SplineError::InsufficientPoints {
            context: "parametric curve".to_string(),
            required: 2,
            actual: n,
        });
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(SplineError::invalid("points", "coordinates must be finite"));
    }
    if parametrization == Parametrization::Uniform {
        return Ok((0..n).map(|i| i as f64).collect());
    }
    let mut u = Vec::with_capacity(n);
    u.push(0.0);
    for (i, (a, b)) in points.axis_iter(Axis(0)).tuple_windows().enumerate() {
        let d = distance(a, b);
        if d == 0.0 {
            return Err(SplineError::NotStrictlyIncreasing {
                what: "curve parameter (repeated point)",
                index: i + 1,
            });
        }
        let step = match parametrization {
            Parametrization::Centripetal => d.sqrt(),
            _ => d,
        };
        u.push(u[i] + step);
    }
    Ok(u)
}

#[derive(Debug, Clone)]
pub struct ParametricCurve {
    u: Vec<f64>,
    spline: Spline,
}

impl ParametricCurve {
    /// `points` has one row per point and one column per coordinate.
    pub fn new(
        points: ArrayView2<'_, f64>,
        parametrization: Parametrization,
        kind: SplineKind,
    ) -> SplineResult<Self> {
        Self::new_with_extrapolate(points, parametrization, kind, None)
    }

    pub fn new_with_extrapolate(
        points: ArrayView2<'_, f64>,
        parametrization: Parametrization,
        kind: SplineKind,
        extrapolate: Option<Extrapolate>,
    ) -> SplineResult<Self> {
        let u = parametrize(points, parametrization)?;
        let spline = kind.build(&u, points.into_dyn(), 0, extrapolate)?;
        info!(
            "{} parametric curve through {} points in {} dimensions ({} parametrization)",
            kind,
            points.nrows(),
            points.ncols(),
            parametrization
        );
        Ok(ParametricCurve { u, spline })
    }

    pub fn parameters(&self) -> &[f64] {
        &self.u
    }

    /// parameter range `[u_0, u_{N-1}]`
    pub fn parameter_range(&self) -> (f64, f64) {
        (self.u[0], self.u[self.u.len() - 1])
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    /// Coordinates (or their `nu`-th derivatives with respect to `u`), shape (D, len(u)).
    pub fn evaluate(&self, u: &[f64], nu: usize) -> ArrayD<f64> {
        let pts = ArrayView1::from(u).into_dyn();
        self.spline.evaluate(pts, nu, None)
    }

    /// One row per parameter value, shape (len(u), D).
    pub fn points_at(&self, u: &[f64], nu: usize) -> Array2<f64> {
        self.spline.evaluate_flat(u, nu, None)
    }
}
