//! Piecewise polynomial in the power basis.
//!
//! Coefficients are stored as an `Array3<f64>` of shape (k, m, B): k is the order
//! (degree + 1), m the number of intervals and B the number of batch columns. The
//! coefficient of the highest power comes first; powers are of `(x - x[i])` on the
//! interval `[x[i], x[i+1])`.
use crate::numerical::interpolation::batch::BatchLayout;
use crate::numerical::interpolation::bspline::BSpline;
use crate::numerical::interpolation::errors::{
    SplineError, SplineResult, check_strictly_increasing,
};
use log::{debug, warn};
use nalgebra::DMatrix;
use nalgebra::linalg::Schur;
use ndarray::{Array2, Array3, ArrayView1, s};
use std::f64;

/// Extrapolation mode
#[derive(Clone, Debug, PartialEq)]
pub enum Extrapolate {
    Bool(bool),
    Periodic,
}

impl Default for Extrapolate {
    fn default() -> Self {
        Extrapolate::Bool(true)
    }
}

impl Extrapolate {
    /// Wraps `x` into `[x0, x1)` for periodic mode and returns the boolean flag that
    /// applies to the (possibly wrapped) point.
    pub(crate) fn resolve(&self, x: f64, x0: f64, x1: f64) -> (f64, bool) {
        match self {
            Extrapolate::Bool(b) => (x, *b),
            Extrapolate::Periodic => (x0 + (x - x0).rem_euclid(x1 - x0), false),
        }
    }
}

/// (p)(p-1)...(p-nu+1)
pub(crate) fn falling_factorial(p: usize, nu: usize) -> f64 {
    if nu > p {
        return 0.0;
    }
    ((p - nu + 1)..=p).fold(1.0, |acc, v| acc * v as f64)
}

pub(crate) fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, v| acc * v as f64)
}

/// Evaluate the `dx`-th derivative of the local polynomial `c[.., ci, cj]` at the
/// local coordinate `s`.
///
/// Coefficients are first scaled by falling factorials (the power `p` turns into
/// `p!/(p-dx)!` times the power `p-dx`), then the polynomial is summed by Horner.
pub(crate) fn evaluate_poly1(s: f64, c: &Array3<f64>, ci: usize, cj: usize, dx: usize) -> f64 {
    let k = c.shape()[0];
    if dx >= k {
        return 0.0;
    }
    let mut res = 0.0;
    // power p has coefficient index k - 1 - p
    for p in (dx..k).rev() {
        res = res * s + c[[k - 1 - p, ci, cj]] * falling_factorial(p, dx);
    }
    res
}

/// Find interval in an ascending array using binary search
///
/// # Parameters
/// - `x`: Array of breakpoints (strictly ascending)
/// - `xval`: Value to find interval for
/// - `prev_interval`: Previous interval (hint for optimization)
/// - `extrapolate`: Whether to extrapolate beyond boundaries
///
/// # Returns
/// Interval index, or `None` if `xval` is NaN or out of bounds and extrapolation is disabled
pub(crate) fn find_interval(
    x: &[f64],
    xval: f64,
    prev_interval: usize,
    extrapolate: bool,
) -> Option<usize> {
    let n = x.len();
    if xval.is_nan() {
        return None;
    }
    if xval < x[0] {
        return if extrapolate { Some(0) } else { None };
    }
    if xval > x[n - 1] {
        return if extrapolate { Some(n - 2) } else { None };
    }
    // right boundary belongs to the last interval
    if xval == x[n - 1] {
        return Some(n - 2);
    }
    let mut low = if prev_interval < n - 1 { prev_interval } else { 0 };
    if x[low] <= xval && xval < x[low + 1] {
        return Some(low);
    }
    low = 0;
    let mut high = n - 1;
    while high - low > 1 {
        let mid = (high + low) / 2;
        if xval < x[mid] {
            high = mid;
        } else {
            low = mid;
        }
    }
    Some(low)
}

/// Evaluate a piecewise polynomial.
///
/// # Parameters
/// - `c`: Coefficients local polynomials of order `k-1` in `m` intervals, shape (k, m, B)
/// - `x`: Breakpoints of polynomials, shape (m+1,)
/// - `xp`: Points to evaluate the piecewise polynomial at
/// - `dx`: Order of derivative to evaluate. The derivative is evaluated
///   piecewise and may have discontinuities.
/// - `extrapolate`: extrapolation policy applied to out-of-bounds points
///
/// # Returns
/// Value of each polynomial at each of the input points, shape (len(xp), B)
pub fn evaluate(
    c: &Array3<f64>,
    x: &[f64],
    xp: &[f64],
    dx: usize,
    extrapolate: &Extrapolate,
) -> Array2<f64> {
    let nc = c.shape()[2];
    let x0 = x[0];
    let x1 = x[x.len() - 1];
    let mut out = Array2::zeros((xp.len(), nc));
    let mut interval = 0;
    for (ip, &xv) in xp.iter().enumerate() {
        let (xval, extrap) = extrapolate.resolve(xv, x0, x1);
        match find_interval(x, xval, interval, extrap) {
            None => out.row_mut(ip).fill(f64::NAN),
            Some(i) => {
                interval = i;
                let s = xval - x[i];
                for jp in 0..nc {
                    out[[ip, jp]] = evaluate_poly1(s, c, i, jp, dx);
                }
            }
        }
    }
    out
}

/// Makes the piecewise polynomial and its first `order` derivatives continuous by
/// choosing the low-order coefficients of each interval from the right end of the
/// previous one. The first interval is left untouched.
fn fix_continuity(c: &mut Array3<f64>, x: &[f64], order: usize) {
    let (k, m, nc) = c.dim();
    for ip in 1..m {
        let h = x[ip] - x[ip - 1];
        for jp in 0..nc {
            for kp in (0..=order).rev() {
                let res = evaluate_poly1(h, c, ip - 1, jp, kp);
                c[[k - kp - 1, ip, jp]] = res / factorial(kp);
            }
        }
    }
}

/// Piecewise polynomial in the power basis (1D)
#[derive(Clone, Debug)]
pub struct PPoly {
    /// Coefficients: shape (k, m, B)
    c: Array3<f64>,
    /// Breakpoints: shape (m+1,)
    x: Vec<f64>,
    /// Extrapolation flag (bool or periodic)
    extrapolate: Extrapolate,
    layout: BatchLayout,
}

impl PPoly {
    pub fn new(c: Array3<f64>, x: Vec<f64>, extrapolate: Extrapolate) -> SplineResult<Self> {
        let (k, m, nc) = c.dim();
        if x.len() < 2 {
            return Err(SplineError::InsufficientPoints {
                context: "piecewise polynomial breakpoints".to_string(),
                required: 2,
                actual: x.len(),
            });
        }
        check_strictly_increasing("breakpoints", &x)?;
        if k == 0 {
            return Err(SplineError::invalid("c", "polynomial order must be at least 1"));
        }
        if m != x.len() - 1 {
            return Err(SplineError::LengthMismatch {
                context: "coefficient intervals vs breakpoints",
                expected: x.len() - 1,
                actual: m,
            });
        }
        if nc == 0 {
            return Err(SplineError::invalid("c", "at least one batch column is required"));
        }
        Ok(PPoly {
            c,
            x,
            extrapolate,
            layout: BatchLayout::flat(nc),
        })
    }

    /// Replaces the batch layout used to shape evaluation results.
    pub fn with_layout(mut self, layout: BatchLayout) -> SplineResult<Self> {
        if layout.batch_size() != self.c.shape()[2] {
            return Err(SplineError::LengthMismatch {
                context: "batch layout vs coefficient columns",
                expected: self.c.shape()[2],
                actual: layout.batch_size(),
            });
        }
        self.layout = layout;
        Ok(self)
    }

    /// No validation: the builders of this crate produce consistent data.
    pub(crate) fn construct_fast(
        c: Array3<f64>,
        x: Vec<f64>,
        extrapolate: Extrapolate,
        layout: BatchLayout,
    ) -> Self {
        PPoly {
            c,
            x,
            extrapolate,
            layout,
        }
    }

    pub fn coefficients(&self) -> &Array3<f64> {
        &self.c
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.x
    }

    pub fn extrapolate(&self) -> &Extrapolate {
        &self.extrapolate
    }

    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// polynomial order k (degree + 1)
    pub fn order(&self) -> usize {
        self.c.shape()[0]
    }

    pub fn n_intervals(&self) -> usize {
        self.c.shape()[1]
    }

    pub fn n_columns(&self) -> usize {
        self.c.shape()[2]
    }

    /// Evaluate the piecewise polynomial or its derivative at flat points.
    ///
    /// # Arguments
    /// * `xp` - Points to evaluate at
    /// * `nu` - Order of derivative to evaluate
    /// * `extrapolate` - Whether to extrapolate (default: self.extrapolate)
    ///
    /// # Returns
    /// Array2<f64> of shape (len(xp), B)
    pub fn evaluate_flat(&self, xp: &[f64], nu: usize, extrapolate: Option<Extrapolate>) -> Array2<f64> {
        let extrapolate = extrapolate.unwrap_or_else(|| self.extrapolate.clone());
        evaluate(&self.c, &self.x, xp, nu, &extrapolate)
    }

    /// Piecewise polynomial of the `nu`-th derivative.
    ///
    /// Coefficients of the `nu` lowest powers drop out, the rest are scaled by falling
    /// factorials. If `nu >= k` the result is identically zero (order 1).
    pub fn derivative(&self, nu: usize) -> PPoly {
        if nu == 0 {
            return self.clone();
        }
        let (k, m, nc) = self.c.dim();
        let c2 = if nu >= k {
            Array3::zeros((1, m, nc))
        } else {
            let mut c2 = self.c.slice(s![..k - nu, .., ..]).to_owned();
            for (row, mut plane) in c2.outer_iter_mut().enumerate() {
                let factor = falling_factorial(k - 1 - row, nu);
                plane.mapv_inplace(|v| v * factor);
            }
            c2
        };
        PPoly::construct_fast(c2, self.x.clone(), self.extrapolate.clone(), self.layout.clone())
    }

    /// Piecewise polynomial of the `nu`-th antiderivative.
    ///
    /// The antiderivative is zero at `x[0]`; the constants of integration of the other
    /// intervals are fixed so that the result and its first `nu-1` derivatives are
    /// continuous. If the source is periodic the antiderivative does not extrapolate.
    pub fn antiderivative(&self, nu: usize) -> PPoly {
        if nu == 0 {
            return self.clone();
        }
        let (k, m, nc) = self.c.dim();
        let mut c2 = Array3::zeros((k + nu, m, nc));
        for row in 0..k {
            // power p -> p + nu keeps its row index in the longer tensor
            let p = k - 1 - row;
            let divisor = ((p + 1)..=(p + nu)).fold(1.0, |acc, v| acc * v as f64);
            for ip in 0..m {
                for jp in 0..nc {
                    c2[[row, ip, jp]] = self.c[[row, ip, jp]] / divisor;
                }
            }
        }
        fix_continuity(&mut c2, &self.x, nu - 1);
        let extrapolate = match self.extrapolate {
            Extrapolate::Periodic => Extrapolate::Bool(false),
            ref e => e.clone(),
        };
        PPoly::construct_fast(c2, self.x.clone(), extrapolate, self.layout.clone())
    }

    /// Definite integral over `[a, b]` for every batch column.
    ///
    /// Reversed bounds give the negated integral. Without extrapolation a bound
    /// outside of `[x[0], x[m]]` gives NaN. Periodic mode sums whole periods and the
    /// wrapped remainder.
    pub fn integrate(&self, a: f64, b: f64, extrapolate: Option<Extrapolate>) -> Vec<f64> {
        let extrapolate = extrapolate.unwrap_or_else(|| self.extrapolate.clone());
        let (mut a, mut b) = (a, b);
        let mut sign = 1.0;
        if b < a {
            std::mem::swap(&mut a, &mut b);
            sign = -1.0;
        }
        let anti = self.antiderivative(1);
        let nc = self.n_columns();
        let mut result = vec![0.0; nc];
        match extrapolate {
            Extrapolate::Periodic => {
                let xs = self.x[0];
                let xe = self.x[self.x.len() - 1];
                let period = xe - xs;
                let interval = b - a;
                let n_periods = (interval / period).floor();
                let left = interval - n_periods * period;
                if n_periods > 0.0 {
                    let full = antiderivative_difference(&anti, xs, xe, false);
                    for (r, f) in result.iter_mut().zip(full.iter()) {
                        *r += f * n_periods;
                    }
                }
                let a_wrapped = xs + (a - xs).rem_euclid(period);
                let b_wrapped = a_wrapped + left;
                let parts = if b_wrapped <= xe {
                    vec![(a_wrapped, b_wrapped)]
                } else {
                    vec![(a_wrapped, xe), (xs, xs + b_wrapped - xe)]
                };
                for (lo, hi) in parts {
                    let d = antiderivative_difference(&anti, lo, hi, false);
                    for (r, v) in result.iter_mut().zip(d.iter()) {
                        *r += v;
                    }
                }
            }
            Extrapolate::Bool(extrap) => {
                result = antiderivative_difference(&anti, a, b, extrap);
            }
        }
        result.iter().map(|v| v * sign).collect()
    }

    /// Real roots of every batch column, see [`PPoly::solve`].
    pub fn roots(&self, discontinuity: bool, extrapolate: Option<Extrapolate>) -> Vec<Vec<f64>> {
        self.solve(0.0, discontinuity, extrapolate)
    }

    /// Real solutions of `p(x) = y` for every batch column.
    ///
    /// Roots of interval i are kept on `[x[i], x[i+1])`, the last interval is closed;
    /// with extrapolation the first interval extends to -inf and the last to +inf.
    /// If `discontinuity` is set, a breakpoint where the left and right limits of
    /// `p - y` change sign is reported too. An interval on which `p - y` vanishes
    /// identically contributes its left breakpoint followed by NaN.
    pub fn solve(
        &self,
        y: f64,
        discontinuity: bool,
        extrapolate: Option<Extrapolate>,
    ) -> Vec<Vec<f64>> {
        let extrapolate = extrapolate.unwrap_or_else(|| self.extrapolate.clone());
        let extrap = matches!(extrapolate, Extrapolate::Bool(true));
        (0..self.n_columns())
            .map(|jp| self.solve_column(jp, y, discontinuity, extrap))
            .collect()
    }

    fn solve_column(&self, jp: usize, y: f64, discontinuity: bool, extrap: bool) -> Vec<f64> {
        let (k, m, _) = self.c.dim();
        let mut found: Vec<f64> = Vec::new();
        let push_unique = |found: &mut Vec<f64>, r: f64| {
            if let Some(&last) = found.last() {
                let tol = 1e-12 * (1.0 + r.abs());
                if (r - last).abs() <= tol {
                    return;
                }
            }
            found.push(r);
        };
        for i in 0..m {
            let h = self.x[i + 1] - self.x[i];
            let mut coeffs: Vec<f64> = (0..k).map(|row| self.c[[row, i, jp]]).collect();
            coeffs[k - 1] -= y;

            if discontinuity && i > 0 {
                let left_limit = evaluate_poly1(
                    self.x[i] - self.x[i - 1],
                    &self.c,
                    i - 1,
                    jp,
                    0,
                ) - y;
                if left_limit * coeffs[k - 1] < 0.0 {
                    push_unique(&mut found, self.x[i]);
                }
            }

            if coeffs.iter().all(|&v| v == 0.0) {
                found.push(self.x[i]);
                found.push(f64::NAN);
                continue;
            }

            let lo = if extrap && i == 0 { f64::NEG_INFINITY } else { 0.0 };
            let hi = if extrap && i == m - 1 { f64::INFINITY } else { h };
            let last = i == m - 1;
            let tol = 1e-12 * h;
            let mut local: Vec<f64> = real_roots_on(&coeffs, h)
                .into_iter()
                .filter(|&s| s >= lo - tol && (s < hi - tol || (last && s <= hi + tol)))
                .map(|s| {
                    if lo == 0.0 && s < 0.0 {
                        0.0
                    } else if hi == h && s > h {
                        h
                    } else {
                        s
                    }
                })
                .collect();
            local.sort_by(|a, b| a.total_cmp(b));
            for s in local {
                push_unique(&mut found, self.x[i] + s);
            }
        }
        debug!("column {}: {} roots found", jp, found.len());
        found
    }

    /// Exact conversion of a B-spline to the power basis on the distinct knots of its
    /// base interval.
    pub fn from_spline(bs: &BSpline, extrapolate: Option<Extrapolate>) -> PPoly {
        let t = bs.knots();
        let k = bs.degree();
        let n = bs.n_coefs();
        let nc = bs.coefficients().ncols();
        let mut x: Vec<f64> = Vec::new();
        for &v in &t[k..=n] {
            if x.last().is_none_or(|&l| v > l) {
                x.push(v);
            }
        }
        let m = x.len() - 1;
        let mut c = Array3::zeros((k + 1, m, nc));
        for i in 0..m {
            for nu in 0..=k {
                let vals = bs.evaluate_flat(&[x[i]], nu, Some(Extrapolate::Bool(true)));
                let fact = factorial(nu);
                for jp in 0..nc {
                    c[[k - nu, i, jp]] = vals[[0, jp]] / fact;
                }
            }
        }
        let extrapolate = extrapolate.unwrap_or_else(|| bs.extrapolate().clone());
        PPoly::construct_fast(c, x, extrapolate, bs.layout().clone())
    }
}

/// `F(b) - F(a)` per column
fn antiderivative_difference(anti: &PPoly, a: f64, b: f64, extrapolate: bool) -> Vec<f64> {
    let vals = anti.evaluate_flat(&[a, b], 0, Some(Extrapolate::Bool(extrapolate)));
    let lower: ArrayView1<f64> = vals.row(0);
    let upper: ArrayView1<f64> = vals.row(1);
    upper.iter().zip(lower.iter()).map(|(u, l)| u - l).collect()
}

/// Newton steps on the original polynomial to polish analytically found roots.
fn polish_root(coeffs: &[f64], mut s: f64) -> f64 {
    for _ in 0..3 {
        let (mut p, mut dp) = (0.0, 0.0);
        for &c in coeffs {
            dp = dp * s + p;
            p = p * s + c;
        }
        if dp == 0.0 || !p.is_finite() {
            break;
        }
        let step = p / dp;
        if !step.is_finite() {
            break;
        }
        s -= step;
    }
    s
}

/// Real roots of a polynomial with coefficients in decreasing powers.
///
/// Degree <= 3 is solved in closed form (stable quadratic formula, trigonometric or
/// Cardano cubic), higher degrees through the eigenvalues of the companion matrix.
pub(crate) fn real_roots(coeffs: &[f64]) -> Vec<f64> {
    real_roots_on(coeffs, 1.0)
}

/// [`real_roots`] for a local polynomial used on `[0, span]`: leading terms whose
/// contribution over the span is rounding noise are dropped before the degree is
/// chosen.
pub(crate) fn real_roots_on(coeffs: &[f64], span: f64) -> Vec<f64> {
    let start = match significant_start(coeffs, span) {
        Some(i) => i,
        None => return Vec::new(),
    };
    let c = &coeffs[start..];
    let roots = match c.len() - 1 {
        0 => Vec::new(),
        1 => vec![-c[1] / c[0]],
        2 => quadratic_roots(c[0], c[1], c[2]),
        3 => cubic_roots(c[0], c[1], c[2], c[3])
            .into_iter()
            .map(|r| polish_root(c, r))
            .collect(),
        _ => companion_roots(c),
    };
    roots.into_iter().filter(|r| r.is_finite()).collect()
}

/// First coefficient with `|c_j| * span^(deg-j) > 16 eps max_i |c_i| * span^(deg-i)`.
fn significant_start(coeffs: &[f64], span: f64) -> Option<usize> {
    let deg = coeffs.len().checked_sub(1)?;
    let span = if span.is_finite() && span > 0.0 { span } else { 1.0 };
    let weighted: Vec<f64> = coeffs
        .iter()
        .enumerate()
        .map(|(j, c)| c.abs() * span.powi((deg - j) as i32))
        .collect();
    let largest = weighted.iter().fold(0.0_f64, |acc, &v| acc.max(v));
    if largest == 0.0 || !largest.is_finite() {
        return coeffs.iter().position(|&v| v != 0.0);
    }
    let noise = 16.0 * f64::EPSILON * largest;
    weighted.iter().position(|&v| v > noise)
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let disc = b * b - 4.0 * a * c;
    let scale = (b * b).max((4.0 * a * c).abs());
    if disc < 0.0 {
        // tangent roots lost to rounding
        if disc >= -1e-14 * scale {
            return vec![-b / (2.0 * a)];
        }
        return Vec::new();
    }
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    if q == 0.0 {
        return vec![0.0, 0.0];
    }
    let mut r = vec![q / a, c / q];
    r.sort_by(|x, y| x.total_cmp(y));
    r
}

fn cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    let (a2, a1, a0) = (b / a, c / a, d / a);
    let q = (a2 * a2 - 3.0 * a1) / 9.0;
    let r = (2.0 * a2.powi(3) - 9.0 * a2 * a1 + 27.0 * a0) / 54.0;
    let shift = a2 / 3.0;
    let q3 = q * q * q;
    if r * r < q3 {
        let theta = (r / q3.sqrt()).clamp(-1.0, 1.0).acos();
        let sq = -2.0 * q.sqrt();
        vec![
            sq * (theta / 3.0).cos() - shift,
            sq * ((theta + 2.0 * f64::consts::PI) / 3.0).cos() - shift,
            sq * ((theta - 2.0 * f64::consts::PI) / 3.0).cos() - shift,
        ]
    } else {
        let big_a = -r.signum() * (r.abs() + (r * r - q3).sqrt()).cbrt();
        let big_b = if big_a != 0.0 { q / big_a } else { 0.0 };
        let mut roots = vec![big_a + big_b - shift];
        // double root when the discriminant vanishes
        if (big_a - big_b).abs() <= 1e-12 * (1.0 + big_a.abs()) {
            roots.push(-0.5 * (big_a + big_b) - shift);
        }
        roots
    }
}

/// `(p(s), sum |c_j| |s|^(deg-j))`
fn eval_with_magnitude(coeffs: &[f64], s: f64) -> (f64, f64) {
    coeffs.iter().fold((0.0, 0.0), |(p, mag), &c| {
        (p * s + c, mag * s.abs() + c.abs())
    })
}

/// Newton steps that are kept only while they reduce the residual; near a multiple
/// root or a close complex pair the plain step can run away.
fn polish_guarded(coeffs: &[f64], s: f64) -> f64 {
    let mut best = s;
    let mut best_res = eval_with_magnitude(coeffs, s).0.abs();
    for _ in 0..8 {
        let candidate = polish_root(coeffs, best);
        let res = eval_with_magnitude(coeffs, candidate).0.abs();
        if !(res < best_res) {
            break;
        }
        best = candidate;
        best_res = res;
    }
    best
}

/// Schur sweeps allowed per eigenvalue before giving up
const SCHUR_SWEEPS_PER_ROOT: usize = 60;

fn companion_roots(c: &[f64]) -> Vec<f64> {
    let n = c.len() - 1;
    let lead = c[0];
    let companion = DMatrix::from_fn(n, n, |i, j| {
        if i == 0 {
            -c[j + 1] / lead
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    let Some(schur) = Schur::try_new(companion, f64::EPSILON, SCHUR_SWEEPS_PER_ROOT * n) else {
        warn!(
            "companion matrix of a degree {} polynomial did not converge, its roots are skipped",
            n
        );
        return Vec::new();
    };
    // a double root splits into a pair with an imaginary part of order sqrt(eps)
    let near_real = 1e2 * f64::EPSILON.sqrt();
    let mut roots: Vec<f64> = schur
        .complex_eigenvalues()
        .iter()
        .filter(|z| z.re.is_finite() && z.im.abs() <= near_real * (1.0 + z.re.abs()))
        .map(|z| polish_guarded(c, z.re))
        .filter(|&r| {
            let (p, mag) = eval_with_magnitude(c, r);
            p.abs() <= near_real * mag
        })
        .collect();
    roots.sort_by(|a, b| a.total_cmp(b));
    let mut merged: Vec<f64> = Vec::with_capacity(roots.len());
    for r in roots {
        match merged.last_mut() {
            Some(last) if (r - *last).abs() <= near_real * (1.0 + r.abs()) => {
                if eval_with_magnitude(c, r).0.abs() < eval_with_magnitude(c, *last).0.abs() {
                    *last = r;
                }
            }
            _ => merged.push(r),
        }
    }
    merged
}

///////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////
