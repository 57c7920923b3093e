#![allow(non_snake_case)]
#![allow(non_camel_case_types)]
use super::LinalgError;
use log::debug;
use nalgebra::DMatrix;

/// Square banded matrix with `kl` sub- and `ku` super-diagonals.
///
/// Row `i` is stored in `data.row(i)`, column `j` of the full matrix lives at offset
/// `j + kl - i`. The rows are `2*kl + ku + 1` wide: the extra `kl` columns on the right
/// hold the fill-in created by row interchanges during LU factorization, the `kl`
/// columns on the left hold the multipliers of L.
#[derive(Clone, Debug)]
pub struct BandMatrix {
    n: usize,
    kl: usize,
    ku: usize,
    data: DMatrix<f64>,
}

impl BandMatrix {
    pub fn zeros(n: usize, kl: usize, ku: usize) -> Self {
        BandMatrix {
            n,
            kl,
            ku,
            data: DMatrix::zeros(n, 2 * kl + ku + 1),
        }
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> Option<usize> {
        // valid offsets are 0 ..= 2*kl + ku
        let shifted = j + self.kl;
        if shifted < i || shifted - i > 2 * self.kl + self.ku {
            None
        } else {
            Some(shifted - i)
        }
    }

    /// Entry (i, j); zero outside of the stored band.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self.offset(i, j) {
            Some(o) => self.data[(i, o)],
            None => 0.0,
        }
    }

    /// Sets entry (i, j). Writing outside of the band is a programming error.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        let o = self
            .offset(i, j)
            .unwrap_or_else(|| panic!("entry ({}, {}) is outside of the band", i, j));
        self.data[(i, o)] = value;
    }

    #[inline]
    fn get_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        let o = self
            .offset(i, j)
            .unwrap_or_else(|| panic!("entry ({}, {}) is outside of the band", i, j));
        &mut self.data[(i, o)]
    }

    pub fn nrows(&self) -> usize {
        self.n
    }

    /// Maximal absolute row sum of the original band.
    pub fn norm_inf(&self) -> f64 {
        (0..self.n)
            .map(|i| {
                let start = i.saturating_sub(self.kl);
                let end = std::cmp::min(self.n, i + self.ku + 1);
                (start..end).map(|j| self.get(i, j).abs()).sum::<f64>()
            })
            .fold(0.0, f64::max)
    }
}

/// LU decomposition with partial (row) pivoting of a banded matrix
/// (the banded analogue of nalgebra's `LU`).
///
/// At step `i` the pivot is searched among rows `i..i+kl+1` and the update runs over
/// columns `i..i+kl+ku+1` (the upper band grows by `kl` because of row interchanges).
/// This makes the factorization O(N·kl·(kl+ku)) instead of O(N³).
///
/// Row interchanges are recorded LAPACK-style in `ipiv` and applied to the right-hand
/// side on the fly, so the stored multipliers of earlier columns never move.
#[derive(Clone, Debug)]
pub struct LU_nalgebra {
    lu: BandMatrix,
    ipiv: Vec<usize>,
}

impl LU_nalgebra {
    /// Factorizes `matrix`. A pivot whose absolute value is not above `pivot_tol`
    /// is treated as zero and reported as `LinalgError::ZeroPivot`.
    pub fn new(matrix: BandMatrix, pivot_tol: f64) -> Result<LU_nalgebra, LinalgError> {
        let n = matrix.nrows();
        debug!(
            "banded LU of size {}: kl = {}, ku = {}",
            n, matrix.kl, matrix.ku
        );
        let mut lu = LU_nalgebra {
            lu: matrix,
            ipiv: (0..n).collect(),
        };
        lu.LU(pivot_tol)?;
        Ok(lu)
    }

    fn LU(&mut self, pivot_tol: f64) -> Result<(), LinalgError> {
        let n = self.lu.n;
        let kl = self.lu.kl;
        let ku = self.lu.ku;
        for i in 0..n {
            let lower_border = std::cmp::min(n, i + kl + 1);
            let right_border = std::cmp::min(n, i + kl + ku + 1);

            // pivot: largest absolute value of column i inside the band
            let mut piv = i;
            let mut max_abs = self.lu.get(i, i).abs();
            for r in (i + 1)..lower_border {
                let v = self.lu.get(r, i).abs();
                if v > max_abs {
                    max_abs = v;
                    piv = r;
                }
            }
            if !(max_abs > pivot_tol) {
                return Err(LinalgError::ZeroPivot { row: i });
            }
            self.ipiv[i] = piv;
            if piv != i {
                for col in i..right_border {
                    let a = self.lu.get(i, col);
                    let b = self.lu.get(piv, col);
                    self.lu.set(i, col, b);
                    self.lu.set(piv, col, a);
                }
            }
            let inv_diag = 1.0 / self.lu.get(i, i);
            for r in (i + 1)..lower_border {
                let factor = self.lu.get(r, i) * inv_diag;
                self.lu.set(r, i, factor);
                if factor == 0.0 {
                    continue;
                }
                for col in (i + 1)..right_border {
                    let upper = self.lu.get(i, col);
                    *self.lu.get_mut(r, col) -= factor * upper;
                }
            }
        }
        Ok(())
    }

    /// In-place solve; `b` is overwritten with the solution.
    pub fn solve_slice_mut(&self, b: &mut [f64]) -> Result<(), LinalgError> {
        let n = self.lu.n;
        if b.len() != n {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                actual: b.len(),
            });
        }
        let kl = self.lu.kl;
        let ku = self.lu.ku;
        // forward substitution L y = P b
        for i in 0..n {
            let piv = self.ipiv[i];
            if piv != i {
                b.swap(i, piv);
            }
            let lower_border = std::cmp::min(n, i + kl + 1);
            let bi = b[i];
            for r in (i + 1)..lower_border {
                b[r] -= self.lu.get(r, i) * bi;
            }
        }
        // backward substitution U x = y
        for i in (0..n).rev() {
            let right_border = std::cmp::min(n, i + kl + ku + 1);
            let mut acc = b[i];
            for col in (i + 1)..right_border {
                acc -= self.lu.get(i, col) * b[col];
            }
            b[i] = acc / self.lu.get(i, i);
        }
        Ok(())
    }

    /// Smallest and largest absolute pivots of U; their ratio is a cheap
    /// lower bound on the condition number.
    pub fn pivot_range(&self) -> (f64, f64) {
        (0..self.lu.n)
            .map(|i| self.lu.get(i, i).abs())
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn pentadiagonal(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| {
            let d = (i as isize - j as isize).abs();
            match d {
                0 => 6.0 + i as f64 * 0.1,
                1 => -2.0,
                2 => 0.5,
                _ => 0.0,
            }
        })
    }

    /// band of a dense matrix, entries outside of it are dropped
    fn band_of(a: &DMatrix<f64>, kl: usize, ku: usize) -> BandMatrix {
        let n = a.nrows();
        let mut band = BandMatrix::zeros(n, kl, ku);
        for i in 0..n {
            for j in i.saturating_sub(kl)..std::cmp::min(n, i + ku + 1) {
                band.set(i, j, a[(i, j)]);
            }
        }
        band
    }

    fn solve(lu: &LU_nalgebra, b: &DVector<f64>) -> DVector<f64> {
        let mut x = b.clone();
        lu.solve_slice_mut(x.as_mut_slice()).unwrap();
        x
    }

    #[test]
    fn test_band_storage() {
        let a = pentadiagonal(6);
        let band = band_of(&a, 2, 2);
        assert_eq!(band.nrows(), 6);
        assert_eq!(band.get(0, 5), 0.0);
        assert_eq!(band.get(3, 1), 0.5);
        assert_eq!(band.get(4, 4), a[(4, 4)]);
        // 0.5 + 2 + 6.3 + 2 + 0.5 on row 3
        assert_relative_eq!(band.norm_inf(), 11.3, epsilon = 1e-12);
    }

    #[test]
    fn test_banded_solve_matches_dense() {
        let n = 9;
        let a = pentadiagonal(n);
        let b = DVector::from_fn(n, |i, _| (i as f64).sin() + 1.0);
        let lu = LU_nalgebra::new(band_of(&a, 2, 2), 1e-14).unwrap();
        let x = solve(&lu, &b);
        let expected = a.clone().lu().solve(&b).unwrap();
        for i in 0..n {
            assert_relative_eq!(x[i], expected[i], epsilon = 1e-12);
        }
        let (lo, hi) = lu.pivot_range();
        assert!(lo > 0.0 && lo <= hi);
    }

    #[test]
    fn test_pivoting_needed() {
        // zero on the diagonal forces a row interchange
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 1.0, 0.0, 0.0, //
                2.0, 1.0, 3.0, 0.0, //
                0.0, 4.0, 1.0, 1.0, //
                0.0, 0.0, 1.0, 5.0,
            ],
        );
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let lu = LU_nalgebra::new(band_of(&a, 1, 1), 1e-14).unwrap();
        let x = solve(&lu, &b);
        let residual = &a * &x - &b;
        assert!(residual.norm() < 1e-12);
    }

    #[test]
    fn test_singular_detected() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0]);
        let res = LU_nalgebra::new(band_of(&a, 1, 1), 1e-12);
        assert!(matches!(res, Err(LinalgError::ZeroPivot { row: 1 })));
    }

    #[test]
    fn test_wrong_rhs_length() {
        let lu = LU_nalgebra::new(band_of(&pentadiagonal(4), 2, 2), 1e-14).unwrap();
        let mut b = vec![1.0; 3];
        assert!(matches!(
            lu.solve_slice_mut(&mut b),
            Err(LinalgError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }
}
