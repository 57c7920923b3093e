////////////////////////////////////////////////////////////////
//  SPLINE - closed set of interpolants sharing one interface
////////////////////////////////////////////////////////////////
use crate::numerical::interpolation::batch::BatchLayout;
use crate::numerical::interpolation::bspline::BSpline;
use crate::numerical::interpolation::cubic_spline::{BoundaryCondition, CubicSpline};
use crate::numerical::interpolation::errors::SplineResult;
use crate::numerical::interpolation::hermite::CubicHermiteSpline;
use crate::numerical::interpolation::make_interp::make_interp_spline_with_settings;
use crate::numerical::interpolation::monotone::{Akima1DInterpolator, PchipInterpolator};
use crate::numerical::interpolation::ppoly::{Extrapolate, PPoly};
use crate::numerical::interpolation::settings::SplineSettings;
use enum_dispatch::enum_dispatch;
use ndarray::{Array2, ArrayD, ArrayViewD};
use std::fmt;
use strum_macros::IntoStaticStr;

#[enum_dispatch]
#[derive(Clone, Debug, IntoStaticStr)]
pub enum Spline {
    PPoly(PPoly),
    BSpline(BSpline),
    CubicSpline(CubicSpline),
    CubicHermiteSpline(CubicHermiteSpline),
    PchipInterpolator(PchipInterpolator),
    Akima1DInterpolator(Akima1DInterpolator),
}

// basic functionality of every interpolant
#[enum_dispatch(Spline)]
pub trait SplineOps {
    fn batch_layout(&self) -> &BatchLayout; // shape of the batch columns
    /// values or `nu`-th derivatives at flat points, shape (len(xp), B)
    fn evaluate_flat(&self, xp: &[f64], nu: usize, extrapolate: Option<Extrapolate>) -> Array2<f64>;
    fn derivative(&self, nu: usize) -> Spline;
    fn antiderivative(&self, nu: usize) -> Spline;
    fn integrate(&self, a: f64, b: f64, extrapolate: Option<Extrapolate>) -> Vec<f64>; // one value per batch column
    fn roots(&self) -> Vec<Vec<f64>>; // one list per batch column
    /// Evaluates at points of any shape. The result has the shape
    /// `trail ++ points.shape ++ lead` of the batch layout.
    fn evaluate(
        &self,
        points: ArrayViewD<'_, f64>,
        nu: usize,
        extrapolate: Option<Extrapolate>,
    ) -> ArrayD<f64> {
        let flat: Vec<f64> = points.iter().cloned().collect();
        let vals = self.evaluate_flat(&flat, nu, extrapolate);
        self.batch_layout().restore(&vals, points.shape())
    }
}

impl SplineOps for PPoly {
    fn batch_layout(&self) -> &BatchLayout {
        self.layout()
    }
    fn evaluate_flat(&self, xp: &[f64], nu: usize, extrapolate: Option<Extrapolate>) -> Array2<f64> {
        PPoly::evaluate_flat(self, xp, nu, extrapolate)
    }
    fn derivative(&self, nu: usize) -> Spline {
        PPoly::derivative(self, nu).into()
    }
    fn antiderivative(&self, nu: usize) -> Spline {
        PPoly::antiderivative(self, nu).into()
    }
    fn integrate(&self, a: f64, b: f64, extrapolate: Option<Extrapolate>) -> Vec<f64> {
        PPoly::integrate(self, a, b, extrapolate)
    }
    fn roots(&self) -> Vec<Vec<f64>> {
        PPoly::roots(self, true, None)
    }
}

impl SplineOps for BSpline {
    fn batch_layout(&self) -> &BatchLayout {
        self.layout()
    }
    fn evaluate_flat(&self, xp: &[f64], nu: usize, extrapolate: Option<Extrapolate>) -> Array2<f64> {
        BSpline::evaluate_flat(self, xp, nu, extrapolate)
    }
    fn derivative(&self, nu: usize) -> Spline {
        BSpline::derivative(self, nu).into()
    }
    fn antiderivative(&self, nu: usize) -> Spline {
        BSpline::antiderivative(self, nu).into()
    }
    fn integrate(&self, a: f64, b: f64, extrapolate: Option<Extrapolate>) -> Vec<f64> {
        BSpline::integrate(self, a, b, extrapolate)
    }
    fn roots(&self) -> Vec<Vec<f64>> {
        BSpline::roots(self)
    }
}

/// The Hermite-type interpolants are thin wrappers around a `PPoly`; derived objects
/// are plain piecewise polynomials.
macro_rules! impl_spline_ops_via_ppoly {
    ($($ty:ty),+) => {
        $(
            impl SplineOps for $ty {
                fn batch_layout(&self) -> &BatchLayout {
                    self.as_ppoly().layout()
                }
                fn evaluate_flat(&self, xp: &[f64], nu: usize, extrapolate: Option<Extrapolate>) -> Array2<f64> {
                    self.as_ppoly().evaluate_flat(xp, nu, extrapolate)
                }
                fn derivative(&self, nu: usize) -> Spline {
                    self.as_ppoly().derivative(nu).into()
                }
                fn antiderivative(&self, nu: usize) -> Spline {
                    self.as_ppoly().antiderivative(nu).into()
                }
                fn integrate(&self, a: f64, b: f64, extrapolate: Option<Extrapolate>) -> Vec<f64> {
                    self.as_ppoly().integrate(a, b, extrapolate)
                }
                fn roots(&self) -> Vec<Vec<f64>> {
                    self.as_ppoly().roots(true, None)
                }
            }
        )+
    };
}

impl_spline_ops_via_ppoly!(
    CubicSpline,
    CubicHermiteSpline,
    PchipInterpolator,
    Akima1DInterpolator
);

impl Spline {
    /// variant name, e.g. "CubicSpline"
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Power-basis form of any variant.
    pub fn to_ppoly(&self) -> PPoly {
        match self {
            Spline::PPoly(p) => p.clone(),
            Spline::BSpline(b) => PPoly::from_spline(b, None),
            Spline::CubicSpline(s) => s.as_ppoly().clone(),
            Spline::CubicHermiteSpline(s) => s.as_ppoly().clone(),
            Spline::PchipInterpolator(s) => s.as_ppoly().clone(),
            Spline::Akima1DInterpolator(s) => s.as_ppoly().clone(),
        }
    }
}

/// Which interpolant to build from sampled data.
#[derive(Clone, Debug, PartialEq)]
pub enum SplineKind {
    Cubic(BoundaryCondition),
    Pchip,
    Akima,
    /// `make_interp_spline` with the default knots
    Interpolating { degree: usize },
}

impl Default for SplineKind {
    fn default() -> Self {
        SplineKind::Cubic(BoundaryCondition::NotAKnot)
    }
}

impl fmt::Display for SplineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplineKind::Cubic(bc) => write!(f, "cubic spline ({})", bc),
            SplineKind::Pchip => write!(f, "PCHIP"),
            SplineKind::Akima => write!(f, "Akima"),
            SplineKind::Interpolating { degree } => write!(f, "B-spline of degree {}", degree),
        }
    }
}

impl SplineKind {
    pub fn build(
        &self,
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        axis: usize,
        extrapolate: Option<Extrapolate>,
    ) -> SplineResult<Spline> {
        self.build_with_settings(x, y, axis, extrapolate, &SplineSettings::default())
    }

    pub fn build_with_settings(
        &self,
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        axis: usize,
        extrapolate: Option<Extrapolate>,
        settings: &SplineSettings,
    ) -> SplineResult<Spline> {
        let spline: Spline = match self {
            SplineKind::Cubic(bc) => {
                CubicSpline::new_with_settings(x, y, axis, bc.clone(), extrapolate, settings)?.into()
            }
            SplineKind::Pchip => PchipInterpolator::new(x, y, axis, extrapolate)?.into(),
            SplineKind::Akima => Akima1DInterpolator::new(x, y, axis, extrapolate)?.into(),
            SplineKind::Interpolating { degree } => {
                let bs = make_interp_spline_with_settings(x, y, *degree, None, None, axis, settings)?;
                match extrapolate {
                    Some(e) => bs.with_extrapolate(e).into(),
                    None => bs.into(),
                }
            }
        };
        Ok(spline)
    }
}
