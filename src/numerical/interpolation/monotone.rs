//! Local slope estimators that avoid the overshoot of global cubic splines:
//! PCHIP (Fritsch-Carlson, monotonicity preserving) and Akima.
use crate::numerical::interpolation::errors::SplineResult;
use crate::numerical::interpolation::hermite::build_from_slopes;
use crate::numerical::interpolation::ppoly::{Extrapolate, PPoly};
use ndarray::ArrayViewD;

/// sign with `sign(0) == 0`
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn secants(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = (0..h.len()).map(|i| (y[i + 1] - y[i]) / h[i]).collect();
    (h, m)
}

/// One-sided three-point end slope, shape preserving.
fn pchip_edge_case(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

pub(crate) fn pchip_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let (h, m) = secants(x, y);
    if n == 2 {
        return vec![m[0]; 2];
    }
    let mut d = vec![0.0; n];
    for i in 1..n - 1 {
        let (m_prev, m_next) = (m[i - 1], m[i]);
        // a local extremum or a flat secant gets a zero slope
        if sign(m_prev) * sign(m_next) <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[i] + h[i - 1];
        let w2 = h[i] + 2.0 * h[i - 1];
        d[i] = (w1 + w2) / (w1 / m_prev + w2 / m_next);
    }
    d[0] = pchip_edge_case(h[0], h[1], m[0], m[1]);
    d[n - 1] = pchip_edge_case(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
    d
}

pub(crate) fn akima_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let (_, m) = secants(x, y);
    if n == 2 {
        return vec![m[0]; 2];
    }
    // secants extended by two on each side: me[i + 2] = m[i]
    let mut me = vec![0.0; n + 3];
    me[2..n + 1].copy_from_slice(&m);
    me[1] = 2.0 * me[2] - me[3];
    me[0] = 2.0 * me[1] - me[2];
    me[n + 1] = 2.0 * me[n] - me[n - 1];
    me[n + 2] = 2.0 * me[n + 1] - me[n];

    // slope at site i uses me[i..i+4] = m_{i-2}, m_{i-1}, m_i, m_{i+1}
    let weights: Vec<(f64, f64)> = (0..n)
        .map(|i| ((me[i + 3] - me[i + 2]).abs(), (me[i + 1] - me[i]).abs()))
        .collect();
    let max_sum = weights.iter().fold(0.0_f64, |acc, (w1, w2)| acc.max(w1 + w2));
    let tie = 1e-9 * max_sum;
    (0..n)
        .map(|i| {
            let (w1, w2) = weights[i];
            let (m_prev, m_next) = (me[i + 1], me[i + 2]);
            if w1 + w2 > tie {
                (w1 * m_prev + w2 * m_next) / (w1 + w2)
            } else {
                0.5 * (m_prev + m_next)
            }
        })
        .collect()
}

/// Fritsch-Carlson limiter: a site between secants of different sign (or next to a
/// flat secant) gets a zero slope, and on every interval `(d_i, d_{i+1}) / m_i` is
/// pulled into the circle of radius 3. Monotone data then give a monotone cubic.
pub(crate) fn limit_monotone(x: &[f64], y: &[f64], d: &mut [f64]) {
    let n = x.len();
    if n < 2 {
        return;
    }
    let (_, m) = secants(x, y);
    for i in 1..n - 1 {
        if sign(m[i - 1]) * sign(m[i]) <= 0.0 {
            d[i] = 0.0;
        }
    }
    for (i, &mi) in m.iter().enumerate() {
        if mi == 0.0 {
            d[i] = 0.0;
            d[i + 1] = 0.0;
            continue;
        }
        if sign(d[i]) != sign(mi) {
            d[i] = 0.0;
        }
        if sign(d[i + 1]) != sign(mi) {
            d[i + 1] = 0.0;
        }
        let (alpha, beta) = (d[i] / mi, d[i + 1] / mi);
        let radius = alpha.hypot(beta);
        if radius > 3.0 {
            let tau = 3.0 / radius;
            d[i] = tau * alpha * mi;
            d[i + 1] = tau * beta * mi;
        }
    }
}

/// Piecewise cubic Hermite interpolating polynomial with Fritsch-Carlson slopes:
/// monotone data give a monotone interpolant, local extrema of the data stay extrema.
#[derive(Clone, Debug)]
pub struct PchipInterpolator {
    ppoly: PPoly,
}

impl PchipInterpolator {
    pub fn new(
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        axis: usize,
        extrapolate: Option<Extrapolate>,
    ) -> SplineResult<Self> {
        let ppoly = build_from_slopes(
            "PCHIP interpolator",
            x,
            y,
            axis,
            2,
            extrapolate.unwrap_or_default(),
            |x, col| Ok(pchip_slopes(x, col)),
        )?;
        Ok(PchipInterpolator { ppoly })
    }

    pub fn as_ppoly(&self) -> &PPoly {
        &self.ppoly
    }

    pub fn into_ppoly(self) -> PPoly {
        self.ppoly
    }
}

/// Akima interpolator: slopes are secant averages weighted by the variation of the
/// neighbouring secants, which damps the wiggles of a global spline.
///
/// When both weights vanish (flat or collinear neighbourhoods) the slope is the plain
/// average of the two adjacent secants. The slopes then pass the Fritsch-Carlson
/// limiter, so monotone data stay monotone between the samples.
#[derive(Clone, Debug)]
pub struct Akima1DInterpolator {
    ppoly: PPoly,
}

impl Akima1DInterpolator {
    pub fn new(
        x: &[f64],
        y: ArrayViewD<'_, f64>,
        axis: usize,
        extrapolate: Option<Extrapolate>,
    ) -> SplineResult<Self> {
        let ppoly = build_from_slopes(
            "Akima interpolator",
            x,
            y,
            axis,
            2,
            extrapolate.unwrap_or_default(),
            |x, col| {
                let mut d = akima_slopes(x, col);
                limit_monotone(x, col, &mut d);
                Ok(d)
            },
        )?;
        Ok(Akima1DInterpolator { ppoly })
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
    use crate::numerical::interpolation::errors::SplineError;
    use approx::assert_relative_eq;

    #[test]
    fn pchip_is_monotone_on_monotone_data() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![0.0, 0.1, 0.2, 5.0, 5.1, 5.2];
        let p = PchipInterpolator::new(&x, as_values(&y), 0, None).unwrap();
        let xs: Vec<f64> = (0..=500).map(|i| i as f64 * 0.01).collect();
        let vals = p.as_ppoly().evaluate_flat(&xs, 0, None);
        for i in 1..xs.len() {
            assert!(vals[[i, 0]] >= vals[[i - 1, 0]] - 1e-12);
        }
        // interpolation property
        let at = p.as_ppoly().evaluate_flat(&x, 0, None);
        for i in 0..x.len() {
            assert_relative_eq!(at[[i, 0]], y[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn pchip_flat_at_extrema() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![0.0, 2.0, 1.0, 1.0];
        let d = pchip_slopes(&x, &y);
        // local maximum and the flat secant
        assert_eq!(d[1], 0.0);
        assert_eq!(d[2], 0.0);
    }

    #[test]
    fn pchip_edge_slope_rules() {
        // sign of the three-point estimate differs from m0 -> 0
        assert_eq!(pchip_edge_case(1.0, 1.0, 1.0, 5.0), 0.0);
        // secants differ in sign and |d| > 3 |m0| -> clipped
        assert_relative_eq!(pchip_edge_case(1.0, 0.1, 1.0, -30.0), 3.0);
        // plain three-point formula
        assert_relative_eq!(pchip_edge_case(1.0, 1.0, 2.0, 1.0), 2.5);
    }

    #[test]
    fn two_points_are_linear() {
        let x = vec![0.0, 2.0];
        let y = vec![1.0, 5.0];
        let p = PchipInterpolator::new(&x, as_values(&y), 0, None).unwrap();
        let a = Akima1DInterpolator::new(&x, as_values(&y), 0, None).unwrap();
        for pp in [p.as_ppoly(), a.as_ppoly()] {
            let v = pp.evaluate_flat(&[0.5, 1.5], 0, None);
            assert_relative_eq!(v[[0, 0]], 2.0, epsilon = 1e-12);
            assert_relative_eq!(v[[1, 0]], 4.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn akima_reproduces_linear_and_ties() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let d = akima_slopes(&x, &y);
        for v in d {
            assert_relative_eq!(v, 3.0, epsilon = 1e-12);
        }
        // flat then rising: the tie at the corner averages the two secants
        let y = vec![0.0, 0.0, 0.0, 1.0, 2.0];
        let d = akima_slopes(&x, &y);
        assert_relative_eq!(d[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(d[2], 0.5, epsilon = 1e-12);
        assert_relative_eq!(d[4], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn akima_suppresses_overshoot() {
        let x: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let y = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let a = Akima1DInterpolator::new(&x, as_values(&y), 0, None).unwrap();
        let xs: Vec<f64> = (0..=70).map(|i| i as f64 * 0.1).collect();
        let vals = a.as_ppoly().evaluate_flat(&xs, 0, None);
        for i in 0..xs.len() {
            assert!(vals[[i, 0]] >= -1e-12 && vals[[i, 0]] <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn akima_is_monotone_on_monotone_data() {
        let x: Vec<f64> = (0..7).map(|i| i as f64).collect();
        let y = vec![0.0, 0.0, 0.1, 3.0, 3.0, 3.2, 10.0];
        let a = Akima1DInterpolator::new(&x, as_values(&y), 0, None).unwrap();
        let xs: Vec<f64> = (0..=600).map(|i| i as f64 * 0.01).collect();
        let vals = a.as_ppoly().evaluate_flat(&xs, 0, None);
        for i in 1..xs.len() {
            assert!(
                vals[[i, 0]] >= vals[[i - 1, 0]] - 1e-12,
                "decrease at x = {}",
                xs[i]
            );
        }
        let at = a.as_ppoly().evaluate_flat(&x, 0, None);
        for i in 0..x.len() {
            assert_relative_eq!(at[[i, 0]], y[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn limiter_rules() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        // flat secant zeroes both ends, the turning point is zeroed too
        let y = vec![0.0, 1.0, 1.0, 0.0];
        let mut d = vec![1.0, 0.5, 0.5, -1.0];
        limit_monotone(&x, &y, &mut d);
        assert_eq!(d, vec![1.0, 0.0, 0.0, -1.0]);
        // (alpha, beta) = (4, 4) is pulled back onto the circle of radius 3
        let y = vec![0.0, 1.0, 2.0, 3.0];
        let mut d = vec![1.0, 4.0, 4.0, 1.0];
        limit_monotone(&x, &y, &mut d);
        let r = (d[1] * d[1] + d[2] * d[2]).sqrt();
        assert_relative_eq!(r, 3.0, epsilon = 1e-12);
        // linear data are untouched
        let mut d = vec![1.0; 4];
        limit_monotone(&x, &y, &mut d);
        assert_eq!(d, vec![1.0; 4]);
    }

    #[test]
    fn duplicate_sites_fail() {
        let x = vec![0.0, 1.0, 1.0];
        let y = vec![0.0, 1.0, 2.0];
        assert!(matches!(
            PchipInterpolator::new(&x, as_values(&y), 0, None),
            Err(SplineError::NotStrictlyIncreasing { .. })
        ));
        assert!(matches!(
            Akima1DInterpolator::new(&[0.0], as_values(&[1.0]), 0, None),
            Err(SplineError::InsufficientPoints { .. })
        ));
    }
}
