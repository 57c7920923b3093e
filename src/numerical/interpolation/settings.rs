/// Numerical tolerances of the spline builders.
///
/// Every constructor has a plain `new` that uses `SplineSettings::default()` and a
/// `*_with_settings` variant taking an explicit instance, so there is no global state.
#[derive(Clone, Debug, PartialEq)]
pub struct SplineSettings {
    /// relative tolerance of the `y[0] == y[n-1]` check of periodic splines
    pub periodic_rtol: f64,
    /// absolute tolerance of the same check
    pub periodic_atol: f64,
    /// a pivot is treated as zero if `|pivot| <= pivot_rtol * ||A||_inf * n`
    pub pivot_rtol: f64,
    /// condition estimate above which a warning is logged
    pub condition_threshold: f64,
}

impl Default for SplineSettings {
    fn default() -> Self {
        SplineSettings {
            periodic_rtol: 1e-15,
            periodic_atol: 1e-15,
            pivot_rtol: f64::EPSILON,
            condition_threshold: 1e12,
        }
    }
}

impl SplineSettings {
    /// Pivot threshold for a system of size `n` with infinity norm `norm_inf`.
    pub fn pivot_tolerance(&self, norm_inf: f64, n: usize) -> f64 {
        self.pivot_rtol * norm_inf * n as f64
    }

    /// `|first - last| <= atol + rtol * |last|`, the check of the periodic end values.
    pub fn periodic_close(&self, first: f64, last: f64) -> bool {
        (first - last).abs() <= self.periodic_atol + self.periodic_rtol * last.abs()
    }
}
