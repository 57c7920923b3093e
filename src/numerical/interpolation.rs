//! One-dimensional spline interpolation.
//!
//! Piecewise polynomials in the power basis ([`PPoly`]) and in the B-spline basis
//! ([`BSpline`]), cubic splines with end conditions, local shape-preserving
//! interpolants (PCHIP, Akima), general interpolating and least-squares B-splines,
//! parametric curves and the legacy `interp1d` front end. Sample values may carry any
//! number of extra dimensions; see [`batch`] for the shape contract.
//!
//! Example
//! ```
//! use RustedSplines::numerical::interpolation::*;
//! let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let y = vec![1.0, 4.0, 8.0, 16.0, 25.0, 36.0];
//! let cs = CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::NotAKnot, None).unwrap();
//! let v = cs.evaluate_flat(&[2.5], 0, None);
//! assert!((v[[0, 0]] - 5.57).abs() < 0.01);
//! ```

/// bookkeeping of the interpolation axis and the batch dimensions
pub mod batch;
pub mod bspline;
/// cubic spline with not-a-knot, natural, clamped or periodic ends
pub mod cubic_spline;
pub mod errors;
pub mod hermite;
/// legacy interp1d: linear, nearest, previous/next and spline kinds
pub mod interp1d;
/// least-squares and smoothing B-splines
pub mod lsq;
/// interpolating B-splines of any degree
pub mod make_interp;
/// PCHIP and Akima
pub mod monotone;
pub mod parametric;
/// piecewise polynomials in the power basis
pub mod ppoly;
pub mod settings;
/// closed set of splines behind one trait
pub mod spline_enum;


pub use batch::{BatchLayout, as_values};
pub use bspline::BSpline;
pub use cubic_spline::{BoundaryCondition, CubicSpline};
pub use errors::{SplineError, SplineResult};
pub use hermite::CubicHermiteSpline;
pub use interp1d::{BoundarySearch, FillValue, Interp1d, InterpKind, TableSide};
pub use lsq::{make_lsq_spline, make_smoothing_spline};
pub use make_interp::{DerivativeConstraints, make_interp_spline, make_interp_spline_with_settings};
pub use monotone::{Akima1DInterpolator, PchipInterpolator};
pub use parametric::{ParametricCurve, Parametrization, parametrize};
pub use ppoly::{Extrapolate, PPoly};
pub use settings::SplineSettings;
pub use spline_enum::{Spline, SplineKind, SplineOps};
