//! Univariate spline in the B-spline basis.
//!
//! `S(x) = sum_i c_i B_{i,k}(x)` on the knot vector `t` of length `n + k + 1`, where
//! `n` is the number of coefficients. The base interval is `[t[k], t[n]]`.
use crate::numerical::interpolation::batch::BatchLayout;
use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use crate::numerical::interpolation::ppoly::{Extrapolate, PPoly};
use log::debug;
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView1};

/// Span search: `l` with `t[l] <= x < t[l+1]` and `k <= l <= n-1`.
///
/// Repeated knots are skipped so the span is never empty; `x == t[n]` belongs to the
/// last span. Points outside of the base interval map to the boundary span when
/// `extrapolate` is set and to `None` otherwise. NaN gives `None`.
pub fn find_interval(t: &[f64], k: usize, xval: f64, prev_l: usize, extrapolate: bool) -> Option<usize> {
    let n = t.len() - k - 1;
    if xval.is_nan() {
        return None;
    }
    if (xval < t[k] || xval > t[n]) && !extrapolate {
        return None;
    }
    let mut l = if k < prev_l && prev_l < n { prev_l } else { k };
    while xval < t[l] && l != k {
        l -= 1;
    }
    l += 1;
    while xval >= t[l] && l != n {
        l += 1;
    }
    Some(l - 1)
}

/// Values (m = 0) or m-th derivatives of the `k+1` B-splines that are non-zero on the
/// span `ell`, i.e. `B_{ell-k}, ..., B_{ell}` at `x`.
///
/// Cox-de Boor recursion up to degree `k - m`, then `m` differentiation steps
/// `B'_{i,j} = j (B_{i,j-1}/(t_{i+j}-t_i) - B_{i+1,j-1}/(t_{i+j+1}-t_{i+1}))`.
pub fn basis_functions_nonzero(t: &[f64], x: f64, k: usize, ell: usize, m: usize) -> Vec<f64> {
    let mut h = vec![0.0; k + 1];
    if m > k {
        return h;
    }
    let mut hh = vec![0.0; k + 1];
    h[0] = 1.0;
    for j in 1..=(k - m) {
        hh[..j].copy_from_slice(&h[..j]);
        h[0] = 0.0;
        for n in 1..=j {
            let xb = t[ell + n];
            let xa = t[ell + n - j];
            if xb == xa {
                h[n] = 0.0;
                continue;
            }
            let w = hh[n - 1] / (xb - xa);
            h[n - 1] += w * (xb - x);
            h[n] = w * (x - xa);
        }
    }
    for j in (k - m + 1)..=k {
        hh[..j].copy_from_slice(&h[..j]);
        h[0] = 0.0;
        for n in 1..=j {
            let xb = t[ell + n];
            let xa = t[ell + n - j];
            if xb == xa {
                h[n] = 0.0;
                continue;
            }
            let w = j as f64 * hh[n - 1] / (xb - xa);
            h[n - 1] -= w;
            h[n] = w;
        }
    }
    h
}

/// `nu`-th derivative of one coefficient column on span `ell`.
///
/// The local window of `k+1` coefficients first goes through `nu` steps of scaled
/// first differences (`c_i <- q (c_i - c_{i-1}) / (t_{i+q} - t_i)`, zero for an empty
/// knot span), then de Boor's recursion runs at degree `k - nu`.
fn evaluate_local(t: &[f64], c: ArrayView1<f64>, k: usize, ell: usize, x: f64, nu: usize) -> f64 {
    if nu > k {
        return 0.0;
    }
    let mut d: Vec<f64> = (0..=k).map(|j| c[j + ell - k]).collect();
    for r in 1..=nu {
        let q = k - r + 1;
        for j in (r..=k).rev() {
            let i = j + ell - k;
            let denom = t[i + q] - t[i];
            d[j] = if denom > 0.0 {
                q as f64 * (d[j] - d[j - 1]) / denom
            } else {
                0.0
            };
        }
    }
    let p = k - nu;
    for r in 1..=p {
        for jj in (r..=p).rev() {
            let i = jj + ell - p;
            let left = t[i];
            let right = t[i + p + 1 - r];
            let alpha = if right != left { (x - left) / (right - left) } else { 0.0 };
            d[jj + nu] = (1.0 - alpha) * d[jj + nu - 1] + alpha * d[jj + nu];
        }
    }
    d[k]
}

/// Whether `B_{i,k}` is non-zero at `x` (right-open support, except at `t[n]`).
fn basis_active(t: &[f64], k: usize, i: usize, x: f64) -> bool {
    let ell = match find_interval(t, k, x, k, false) {
        Some(l) => l,
        None => return false,
    };
    if i + k < ell || i > ell {
        return false;
    }
    basis_functions_nonzero(t, x, k, ell, 0)[i + k - ell] > 0.0
}

/// Schoenberg-Whitney condition for square collocation: every basis function
/// `B_i` must be non-zero at the site `x[i]`.
pub fn schoenberg_whitney(x: &[f64], t: &[f64], k: usize) -> bool {
    let n = t.len() - k - 1;
    x.len() == n && (0..n).all(|i| basis_active(t, k, i, x[i]))
}

/// Schoenberg-Whitney condition for least squares: some strictly increasing
/// subsequence of the sites satisfies the square condition.
pub fn schoenberg_whitney_subsequence(x: &[f64], t: &[f64], k: usize) -> bool {
    let n = t.len() - k - 1;
    let mut j = 0;
    for i in 0..n {
        while j < x.len() && !basis_active(t, k, i, x[j]) {
            j += 1;
        }
        if j == x.len() {
            return false;
        }
        j += 1;
    }
    true
}

/// Validates a knot vector for `ncoef` coefficients of degree `k`.
pub(crate) fn check_knots(t: &[f64], k: usize, ncoef: usize) -> SplineResult<()> {
    if t.len() != ncoef + k + 1 {
        return Err(SplineError::LengthMismatch {
            context: "knot vector (n + k + 1)",
            expected: ncoef + k + 1,
            actual: t.len(),
        });
    }
    if t.iter().any(|v| !v.is_finite()) {
        return Err(SplineError::InvalidKnots("knots must be finite".to_string()));
    }
    if let Some(i) = t.windows(2).position(|w| w[1] < w[0]) {
        return Err(SplineError::InvalidKnots(format!(
            "knots must be non-decreasing (violated at index {})",
            i + 1
        )));
    }
    let (lo, hi) = (t[k], t[ncoef]);
    if !(lo < hi) {
        return Err(SplineError::InvalidKnots(format!(
            "empty base interval [t[{}], t[{}]] = [{}, {}]",
            k, ncoef, lo, hi
        )));
    }
    // multiplicity of knots strictly inside the base interval
    let mut run = 1;
    for w in t.windows(2) {
        run = if w[1] == w[0] { run + 1 } else { 1 };
        if run > k + 1 && w[1] > lo && w[1] < hi {
            return Err(SplineError::InvalidKnots(format!(
                "interior knot {} has multiplicity above k + 1 = {}",
                w[1],
                k + 1
            )));
        }
    }
    Ok(())
}

/// Univariate spline in the B-spline basis.
#[derive(Clone, Debug)]
pub struct BSpline {
    t: Vec<f64>,
    /// shape (n, B)
    c: Array2<f64>,
    k: usize,
    extrapolate: Extrapolate,
    layout: BatchLayout,
}

impl BSpline {
    pub fn new(t: Vec<f64>, c: Array2<f64>, k: usize, extrapolate: Extrapolate) -> SplineResult<Self> {
        let (n, nc) = c.dim();
        if n < k + 1 {
            return Err(SplineError::InsufficientPoints {
                context: format!("B-spline of degree {} (coefficients)", k),
                required: k + 1,
                actual: n,
            });
        }
        if nc == 0 {
            return Err(SplineError::invalid("c", "at least one batch column is required"));
        }
        check_knots(&t, k, n)?;
        Ok(BSpline {
            t,
            c,
            k,
            extrapolate,
            layout: BatchLayout::flat(nc),
        })
    }

    pub fn with_layout(mut self, layout: BatchLayout) -> SplineResult<Self> {
        if layout.batch_size() != self.c.ncols() {
            return Err(SplineError::LengthMismatch {
                context: "batch layout vs coefficient columns",
                expected: self.c.ncols(),
                actual: layout.batch_size(),
            });
        }
        self.layout = layout;
        Ok(self)
    }

    pub fn with_extrapolate(mut self, extrapolate: Extrapolate) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    pub(crate) fn construct_fast(
        t: Vec<f64>,
        c: Array2<f64>,
        k: usize,
        extrapolate: Extrapolate,
        layout: BatchLayout,
    ) -> Self {
        BSpline {
            t,
            c,
            k,
            extrapolate,
            layout,
        }
    }

    pub fn knots(&self) -> &[f64] {
        &self.t
    }

    pub fn coefficients(&self) -> &Array2<f64> {
        &self.c
    }

    pub fn degree(&self) -> usize {
        self.k
    }

    pub fn n_coefs(&self) -> usize {
        self.c.nrows()
    }

    pub fn extrapolate(&self) -> &Extrapolate {
        &self.extrapolate
    }

    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// base interval `[t[k], t[n]]`
    pub fn base_interval(&self) -> (f64, f64) {
        (self.t[self.k], self.t[self.n_coefs()])
    }

    /// Values (or `nu`-th derivatives) at flat points, shape (len(xp), B).
    pub fn evaluate_flat(&self, xp: &[f64], nu: usize, extrapolate: Option<Extrapolate>) -> Array2<f64> {
        let extrapolate = extrapolate.unwrap_or_else(|| self.extrapolate.clone());
        let (lo, hi) = self.base_interval();
        let nc = self.c.ncols();
        let mut out = Array2::zeros((xp.len(), nc));
        let mut ell = self.k;
        for (ip, &xv) in xp.iter().enumerate() {
            let (xval, extrap) = extrapolate.resolve(xv, lo, hi);
            match find_interval(&self.t, self.k, xval, ell, extrap) {
                None => out.row_mut(ip).fill(f64::NAN),
                Some(l) => {
                    ell = l;
                    for jp in 0..nc {
                        out[[ip, jp]] = evaluate_local(&self.t, self.c.column(jp), self.k, ell, xval, nu);
                    }
                }
            }
        }
        out
    }

    /// B-spline of the `nu`-th derivative: knots `t[1..len-1]`, degree `k-1` and
    /// coefficients `k (c_i - c_{i-1}) / (t_{i+k} - t_i)` per step. Differentiating past
    /// degree 0 gives the zero spline.
    pub fn derivative(&self, nu: usize) -> BSpline {
        let mut t = self.t.clone();
        let mut c = self.c.clone();
        let mut k = self.k;
        let nc = c.ncols();
        for _ in 0..nu {
            if k == 0 {
                c.fill(0.0);
                break;
            }
            let n = c.nrows();
            let mut c2 = Array2::zeros((n - 1, nc));
            for i in 1..n {
                let dt = t[i + k] - t[i];
                if dt > 0.0 {
                    for jp in 0..nc {
                        c2[[i - 1, jp]] = k as f64 * (c[[i, jp]] - c[[i - 1, jp]]) / dt;
                    }
                }
            }
            t = t[1..t.len() - 1].to_vec();
            c = c2;
            k -= 1;
        }
        BSpline::construct_fast(t, c, k, self.extrapolate.clone(), self.layout.clone())
    }

    /// B-spline of the `nu`-th antiderivative: knots padded by one copy of each end,
    /// degree `k+1` and coefficients `sum_{j<i} c_j (t_{j+k+1} - t_j) / (k+1)`. The
    /// result vanishes at `t[0]`; a periodic source gives a non-extrapolating one.
    pub fn antiderivative(&self, nu: usize) -> BSpline {
        let mut t = self.t.clone();
        let mut c = self.c.clone();
        let mut k = self.k;
        let nc = c.ncols();
        for _ in 0..nu {
            let n = c.nrows();
            let mut c2 = Array2::zeros((n + 1, nc));
            for jp in 0..nc {
                let mut acc = 0.0;
                for i in 0..n {
                    acc += c[[i, jp]] * (t[i + k + 1] - t[i]) / (k + 1) as f64;
                    c2[[i + 1, jp]] = acc;
                }
            }
            let mut t2 = Vec::with_capacity(t.len() + 2);
            t2.push(t[0]);
            t2.extend_from_slice(&t);
            t2.push(t[t.len() - 1]);
            t = t2;
            c = c2;
            k += 1;
        }
        let extrapolate = match self.extrapolate {
            Extrapolate::Periodic => Extrapolate::Bool(false),
            ref e => e.clone(),
        };
        BSpline::construct_fast(t, c, k, extrapolate, self.layout.clone())
    }

    /// Definite integral over `[a, b]` per batch column.
    ///
    /// Without extrapolation the bounds are clipped to the base interval, so the
    /// spline counts as zero outside of it. Periodic mode sums whole periods and the
    /// wrapped remainder.
    pub fn integrate(&self, a: f64, b: f64, extrapolate: Option<Extrapolate>) -> Vec<f64> {
        let extrapolate = extrapolate.unwrap_or_else(|| self.extrapolate.clone());
        let (mut a, mut b) = (a, b);
        let mut sign = 1.0;
        if b < a {
            std::mem::swap(&mut a, &mut b);
            sign = -1.0;
        }
        let (lo, hi) = self.base_interval();
        let anti = self.antiderivative(1);
        let nc = self.c.ncols();
        let diff = |from: f64, to: f64| -> Vec<f64> {
            let vals = anti.evaluate_flat(&[from, to], 0, Some(Extrapolate::Bool(true)));
            (0..nc).map(|jp| vals[[1, jp]] - vals[[0, jp]]).collect::<Vec<f64>>()
        };
        let result = match extrapolate {
            Extrapolate::Bool(true) => diff(a, b),
            Extrapolate::Bool(false) => {
                let a = a.max(lo);
                let b = b.min(hi);
                if a >= b {
                    vec![0.0; nc]
                } else {
                    diff(a, b)
                }
            }
            Extrapolate::Periodic => {
                let period = hi - lo;
                let interval = b - a;
                let n_periods = (interval / period).floor();
                let left = interval - n_periods * period;
                let mut total: Vec<f64> = diff(lo, hi).iter().map(|v| v * n_periods).collect();
                let a_wrapped = lo + (a - lo).rem_euclid(period);
                let b_wrapped = a_wrapped + left;
                let parts = if b_wrapped <= hi {
                    vec![diff(a_wrapped, b_wrapped)]
                } else {
                    vec![diff(a_wrapped, hi), diff(lo, lo + b_wrapped - hi)]
                };
                for part in parts {
                    for (acc, v) in total.iter_mut().zip(part) {
                        *acc += v;
                    }
                }
                total
            }
        };
        result.into_iter().map(|v| v * sign).collect()
    }

    /// Real roots per batch column through the power-basis form.
    pub fn roots(&self) -> Vec<Vec<f64>> {
        PPoly::from_spline(self, None).roots(true, None)
    }

    /// Collocation matrix `B_j^{(0)}(x_i)`: rows are sites, columns basis functions.
    /// Sites outside of the base interval are rejected unless `extrapolate` is set.
    pub fn design_matrix(x: &[f64], t: &[f64], k: usize, extrapolate: bool) -> SplineResult<DMatrix<f64>> {
        if t.len() < 2 * k + 2 {
            return Err(SplineError::InvalidKnots(format!(
                "need at least {} knots for degree {}, got {}",
                2 * k + 2,
                k,
                t.len()
            )));
        }
        let n = t.len() - k - 1;
        check_knots(t, k, n)?;
        let mut matrix = DMatrix::zeros(x.len(), n);
        let mut ell = k;
        for (row, &xv) in x.iter().enumerate() {
            ell = find_interval(t, k, xv, ell, extrapolate).ok_or(SplineError::OutOfBounds {
                point: xv,
                min: t[k],
                max: t[n],
            })?;
            let h = basis_functions_nonzero(t, xv, k, ell, 0);
            for (a, v) in h.into_iter().enumerate() {
                matrix[(row, ell - k + a)] = v;
            }
        }
        debug!("design matrix {}x{} for degree {}", x.len(), n, k);
        Ok(matrix)
    }
}
