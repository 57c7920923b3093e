//! One-dimensional interpolation with a string-selectable kind and configurable
//! handling of points outside of the data range, in the manner of the legacy
//! `interp1d` interface.
use crate::numerical::interpolation::batch::BatchLayout;
use crate::numerical::interpolation::bspline::BSpline;
use crate::numerical::interpolation::errors::{SplineError, SplineResult, check_strictly_increasing};
use crate::numerical::interpolation::make_interp::make_interp_spline;
use crate::numerical::interpolation::ppoly::Extrapolate;
use itertools::Itertools;
use log::{debug, info};
use ndarray::{Array2, ArrayD, ArrayViewD, Axis};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum InterpKind {
    #[default]
    Linear,
    /// nearest sample, halfway points round down
    Nearest,
    /// nearest sample, halfway points round up
    #[strum(to_string = "nearest_up", serialize = "nearest-up")]
    NearestUp,
    Previous,
    Next,
    /// spline of degree 0
    Zero,
    /// spline of degree 1
    Slinear,
    /// spline of degree 2
    Quadratic,
    /// spline of degree 3
    Cubic,
}

impl InterpKind {
    /// Degree of the interpolating B-spline for the spline kinds.
    pub fn spline_degree(&self) -> Option<usize> {
        match self {
            InterpKind::Zero => Some(0),
            InterpKind::Slinear => Some(1),
            InterpKind::Quadratic => Some(2),
            InterpKind::Cubic => Some(3),
            _ => None,
        }
    }

    fn table_side(&self) -> Option<TableSide> {
        match self {
            InterpKind::Nearest => Some(TableSide::NearestDown),
            InterpKind::NearestUp => Some(TableSide::NearestUp),
            InterpKind::Previous => Some(TableSide::Previous),
            InterpKind::Next => Some(TableSide::Next),
            _ => None,
        }
    }
}

/// Which sample a piecewise-constant lookup picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSide {
    NearestDown,
    NearestUp,
    Previous,
    Next,
}

/// Piecewise-constant lookup: binary search either on the midpoints between
/// neighbouring sites (nearest modes) or on the sites themselves.
#[derive(Debug, Clone)]
pub struct BoundarySearch {
    side: TableSide,
    midpoints: Vec<f64>,
}

impl BoundarySearch {
    pub fn new(x: &[f64], side: TableSide) -> Self {
        let midpoints = match side {
            TableSide::NearestDown | TableSide::NearestUp => {
                x.iter().tuple_windows().map(|(a, b)| 0.5 * (a + b)).collect()
            }
            _ => Vec::new(),
        };
        BoundarySearch { side, midpoints }
    }

    pub fn side(&self) -> TableSide {
        self.side
    }

    /// Index of the selected sample; `None` when there is no sample on the requested
    /// side (below the first site for `Previous`, above the last for `Next`).
    pub fn index(&self, x: &[f64], xv: f64) -> Option<usize> {
        let n = x.len();
        match self.side {
            TableSide::NearestDown => Some(self.midpoints.partition_point(|&m| m < xv)),
            TableSide::NearestUp => Some(self.midpoints.partition_point(|&m| m <= xv)),
            TableSide::Previous => x.partition_point(|&v| v <= xv).checked_sub(1),
            TableSide::Next => {
                let i = x.partition_point(|&v| v < xv);
                if i < n { Some(i) } else { None }
            }
        }
    }
}

/// Value used for points outside of `[x[0], x[n-1]]` when `bounds_error` is off.
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Constant(f64),
    /// (below, above)
    Split(f64, f64),
    /// hold the first / last sample
    Clamp,
    /// evaluate the interpolant beyond the data
    Extrapolate,
}

impl Default for FillValue {
    fn default() -> Self {
        FillValue::Constant(f64::NAN)
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Linear,
    Table(BoundarySearch),
    Spline(BSpline),
}

#[derive(Debug, Clone)]
pub struct Interp1d {
    x: Vec<f64>,
    /// samples as (n, B) batch columns
    y: Array2<f64>,
    layout: BatchLayout,
    kind: InterpKind,
    bounds_error: bool,
    fill_value: FillValue,
    backend: Backend,
}

impl Interp1d {
    /// Unsorted sites are sorted together with their samples; repeated sites are an error.
    pub fn new(
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        kind: InterpKind,
        axis: usize,
        bounds_error: bool,
        fill_value: FillValue,
    ) -> SplineResult<Self> {
        if bounds_error && fill_value == FillValue::Extrapolate {
            return Err(SplineError::invalid(
                "fill_value",
                "extrapolation cannot be combined with bounds_error",
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SplineError::invalid("x", "sites must be finite"));
        }
        let (layout, yy) = BatchLayout::from_values(&y, axis, x.len())?;
        let (x, yy) = if x.windows(2).all(|w| w[0] <= w[1]) {
            (x.to_vec(), yy)
        } else {
            let perm: Vec<usize> = (0..x.len()).sorted_by(|&a, &b| x[a].total_cmp(&x[b])).collect();
            debug!("sorting {} unsorted sites", x.len());
            (perm.iter().map(|&i| x[i]).collect(), yy.select(Axis(0), &perm))
        };
        check_strictly_increasing("x", &x)?;
        let required = match kind {
            InterpKind::Linear => 2,
            _ => 1,
        };
        if x.len() < required {
            return Err(SplineError::InsufficientPoints {
                context: format!("interp1d of kind {}", kind),
                required,
                actual: x.len(),
            });
        }
        let backend = if let Some(side) = kind.table_side() {
            Backend::Table(BoundarySearch::new(&x, side))
        } else if let Some(k) = kind.spline_degree() {
            let bs = make_interp_spline(&x, yy.view().into_dyn(), k, None, None, 0)?;
            Backend::Spline(bs)
        } else {
            Backend::Linear
        };
        info!(
            "interp1d of kind {} on {} sites with {} batch columns",
            kind,
            x.len(),
            layout.batch_size()
        );
        Ok(Interp1d {
            x,
            y: yy,
            layout,
            kind,
            bounds_error,
            fill_value,
            backend,
        })
    }

    pub fn kind(&self) -> InterpKind {
        self.kind
    }

    pub fn sites(&self) -> &[f64] {
        &self.x
    }

    pub fn batch_layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// Interpolated values at points of any shape, laid out like
    /// [`crate::numerical::interpolation::spline_enum::SplineOps::evaluate`].
    pub fn evaluate(&self, points: ArrayViewD<'_, f64>) -> SplineResult<ArrayD<f64>> {
        let flat: Vec<f64> = points.iter().cloned().collect();
        let vals = self.evaluate_flat(&flat)?;
        Ok(self.layout.restore(&vals, points.shape()))
    }

    /// Values at flat points, shape (len(xp), B).
    pub fn evaluate_flat(&self, xp: &[f64]) -> SplineResult<Array2<f64>> {
        let n = self.x.len();
        let (lo, hi) = (self.x[0], self.x[n - 1]);
        if self.bounds_error {
            if let Some(&point) = xp.iter().find(|&&v| v < lo || v > hi) {
                return Err(SplineError::OutOfBounds {
                    point,
                    min: lo,
                    max: hi,
                });
            }
        }
        let nc = self.y.ncols();
        let mut out = Array2::from_elem((xp.len(), nc), f64::NAN);
        let spline_vals = match &self.backend {
            Backend::Spline(bs) => Some(bs.evaluate_flat(xp, 0, Some(Extrapolate::Bool(true)))),
            _ => None,
        };
        for (i, &xv) in xp.iter().enumerate() {
            if xv.is_nan() {
                continue;
            }
            let below = xv < lo;
            let above = xv > hi;
            if below || above {
                match &self.fill_value {
                    FillValue::Constant(v) => {
                        out.row_mut(i).fill(*v);
                        continue;
                    }
                    FillValue::Split(b, a) => {
                        out.row_mut(i).fill(if below { *b } else { *a });
                        continue;
                    }
                    FillValue::Clamp => {
                        let row = if below { 0 } else { n - 1 };
                        out.row_mut(i).assign(&self.y.row(row));
                        continue;
                    }
                    FillValue::Extrapolate => {}
                }
            }
            match &self.backend {
                Backend::Linear => {
                    let j = self.x.partition_point(|&v| v <= xv).clamp(1, n - 1);
                    let (x0, x1) = (self.x[j - 1], self.x[j]);
                    let s = (xv - x0) / (x1 - x0);
                    for c in 0..nc {
                        let (y0, y1) = (self.y[[j - 1, c]], self.y[[j, c]]);
                        out[[i, c]] = y0 + s * (y1 - y0);
                    }
                }
                Backend::Table(search) => {
                    if let Some(j) = search.index(&self.x, xv) {
                        out.row_mut(i).assign(&self.y.row(j));
                    }
                }
                Backend::Spline(_) => {
                    if let Some(vals) = &spline_vals {
                        out.row_mut(i).assign(&vals.row(i));
                    }
                }
            }
        }
        Ok(out)
    }
}
