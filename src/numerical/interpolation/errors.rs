//! Error type shared by every spline constructor.
//!
//! Construction failures are fatal to the call and returned as `SplineError`.
//! Evaluation outside of the domain with extrapolation switched off is NOT an
//! error: such points evaluate to NaN.
use crate::somelinalg::RustedLINPACK::LinalgError;
use thiserror::Error;

pub type SplineResult<T> = Result<T, SplineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("{what} must be strictly increasing (violated at index {index})")]
    NotStrictlyIncreasing { what: &'static str, index: usize },

    #[error("length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{context} needs at least {required} points, got {actual}")]
    InsufficientPoints {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error(
        "periodic boundary condition requires y[0] == y[n-1] (batch column {column}: {first} != {last})"
    )]
    PeriodicMismatch { column: usize, first: f64, last: f64 },

    #[error("axis {axis} is out of range for an array of dimension {ndim}")]
    AxisOutOfRange { axis: usize, ndim: usize },

    #[error("invalid knot vector: {0}")]
    InvalidKnots(String),

    #[error("no solution for requested knots: {0}")]
    NoSolutionForKnots(String),

    #[error("singular or ill-conditioned system: {0}")]
    SingularSystem(String),

    #[error("invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: String,
    },

    #[error("value {point} is outside of the interpolation range [{min}, {max}]")]
    OutOfBounds { point: f64, min: f64, max: f64 },

    #[error("task document error: {0}")]
    Config(String),
}

impl From<LinalgError> for SplineError {
    fn from(err: LinalgError) -> Self {
        SplineError::SingularSystem(err.to_string())
    }
}

impl SplineError {
    pub(crate) fn invalid(parameter: &'static str, message: impl Into<String>) -> Self {
        SplineError::InvalidParameter {
            parameter,
            message: message.into(),
        }
    }
}

/// Checks that `x` is strictly increasing and finite.
pub(crate) fn check_strictly_increasing(what: &'static str, x: &[f64]) -> SplineResult<()> {
    if let Some(index) = x.iter().position(|v| !v.is_finite()) {
        return Err(SplineError::invalid(
            "x",
            format!("{} contains a non-finite value at index {}", what, index),
        ));
    }
    match x.windows(2).position(|w| w[1] <= w[0]) {
        Some(i) => Err(SplineError::NotStrictlyIncreasing {
            what,
            index: i + 1,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing_detects_duplicates() {
        assert!(check_strictly_increasing("x", &[0.0, 1.0, 2.0]).is_ok());
        let err = check_strictly_increasing("x", &[0.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            SplineError::NotStrictlyIncreasing {
                what: "x",
                index: 2
            }
        );
        assert!(check_strictly_increasing("x", &[0.0, f64::NAN]).is_err());
    }

    #[test]
    fn linalg_error_converts_to_singular() {
        let err: SplineError = LinalgError::ZeroPivot { row: 3 }.into();
        assert!(matches!(err, SplineError::SingularSystem(_)));
        assert!(err.to_string().contains("row 3"));
    }
}
