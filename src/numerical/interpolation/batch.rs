//! Batch / axis dispatcher.
//!
//! Sample values may be N-dimensional with the interpolation axis anywhere. The
//! dispatcher moves that axis to the front and flattens everything else into `B`
//! batch columns, numbered in row-major order of `lead_shape ++ trail_shape`.
//! Builders solve every column independently; evaluation results are put back
//! into the shape `trail_shape ++ points.shape ++ lead_shape`.
use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use log::debug;
use ndarray::{Array2, ArrayD, ArrayView1, ArrayViewD, IxDyn};
use rayon::prelude::*;

#[derive(Clone, Debug, PartialEq, Default)]
pub struct BatchLayout {
    pub axis: usize,
    /// `value.shape[..axis]`
    pub lead_shape: Vec<usize>,
    /// `value.shape[axis+1..]`
    pub trail_shape: Vec<usize>,
}

impl BatchLayout {
    /// Layout of one-dimensional samples: a single batch column, evaluation output
    /// has the shape of the query points.
    pub fn scalar() -> Self {
        BatchLayout::default()
    }

    /// Layout of `(n, ncols)` samples interpolated along axis 0.
    pub fn flat(ncols: usize) -> Self {
        if ncols == 1 {
            BatchLayout::scalar()
        } else {
            BatchLayout {
                axis: 0,
                lead_shape: Vec::new(),
                trail_shape: vec![ncols],
            }
        }
    }

    /// number of batch columns
    pub fn batch_size(&self) -> usize {
        self.lead_shape.iter().product::<usize>() * self.trail_shape.iter().product::<usize>()
    }

    /// Splits `values` into the `(n_sites, B)` column matrix.
    pub fn from_values(
        values: &ArrayViewD<'_, f64>,
        axis: usize,
        n_sites: usize,
    ) -> SplineResult<(BatchLayout, Array2<f64>)> {
        let ndim = values.ndim();
        if axis >= ndim {
            return Err(SplineError::AxisOutOfRange { axis, ndim });
        }
        let shape = values.shape();
        if shape[axis] != n_sites {
            return Err(SplineError::LengthMismatch {
                context: "y along the interpolation axis",
                expected: n_sites,
                actual: shape[axis],
            });
        }
        let layout = BatchLayout {
            axis,
            lead_shape: shape[..axis].to_vec(),
            trail_shape: shape[axis + 1..].to_vec(),
        };
        let batch = layout.batch_size();
        if batch == 0 {
            return Err(SplineError::invalid("y", "sample array has no batch columns"));
        }
        let mut perm: Vec<usize> = vec![axis];
        perm.extend((0..ndim).filter(|&d| d != axis));
        // iteration over the permuted view follows its logical (row-major) order
        let moved = values.view().permuted_axes(perm);
        let flat: Vec<f64> = moved.iter().cloned().collect();
        let columns = Array2::from_shape_vec((n_sites, batch), flat)
            .map_err(|e| SplineError::invalid("y", e.to_string()))?;
        debug!(
            "batch layout: axis {}, lead {:?}, trail {:?}, {} columns",
            axis, layout.lead_shape, layout.trail_shape, batch
        );
        Ok((layout, columns))
    }

    /// Reassembles `(npoints, B)` evaluation results into
    /// `trail_shape ++ points_shape ++ lead_shape`.
    pub fn restore(&self, flat: &Array2<f64>, points_shape: &[usize]) -> ArrayD<f64> {
        let t = self.trail_shape.len();
        let p = points_shape.len();
        let mut shape = self.trail_shape.clone();
        shape.extend_from_slice(points_shape);
        shape.extend_from_slice(&self.lead_shape);
        let batch_shape: Vec<usize> = self
            .lead_shape
            .iter()
            .chain(self.trail_shape.iter())
            .cloned()
            .collect();
        let ndim = shape.len();
        ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
            let trail_idx = (0..t).map(|d| idx[d]);
            let lead_idx = (t + p..ndim).map(|d| idx[d]);
            let row = ravel((t..t + p).map(|d| idx[d]), points_shape);
            let col = ravel(lead_idx.chain(trail_idx), &batch_shape);
            flat[[row, col]]
        })
    }
}

/// row-major flat index
fn ravel(idx: impl Iterator<Item = usize>, shape: &[usize]) -> usize {
    idx.zip(shape.iter()).fold(0, |acc, (i, &dim)| acc * dim + i)
}

/// One-dimensional samples as a dynamic-dimensional view.
pub fn as_values(y: &[f64]) -> ArrayViewD<'_, f64> {
    ArrayView1::from(y).into_dyn()
}

/// Runs `solver` on every batch column in parallel; results keep the column order.
pub(crate) fn solve_columns<F>(columns: &Array2<f64>, solver: F) -> SplineResult<Vec<Vec<f64>>>
where
    F: Fn(usize, &[f64]) -> SplineResult<Vec<f64>> + Sync,
{
    let cols: Vec<Vec<f64>> = columns.columns().into_iter().map(|c| c.to_vec()).collect();
    cols.par_iter()
        .enumerate()
        .map(|(j, col)| solver(j, col))
        .collect()
}

/// Inverse of `solve_columns`: column vectors of equal length `nrows` to `(nrows, B)`.
pub(crate) fn columns_to_array2(cols: &[Vec<f64>], nrows: usize) -> Array2<f64> {
    Array2::from_shape_fn((nrows, cols.len()), |(i, j)| cols[j][i])
}
