//! Flattening and upper triangular reduction of feature samples.
//!
//! A feature array flagged as symmetric holds `n x n` symmetric matrices. Only
//! the upper triangular part (diagonal included) is kept, row by row, so a
//! sample is reduced to `n(n+1)/2` entries. Any other sample is flattened in
//! row-major order. The same routines serve the batch path, on whole series,
//! and the streaming path, on single samples, so both produce identical columns.
use crate::errors::{LagError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayViewD, Axis, Ix2, Ix3};

/// Number of entries kept by the upper triangular reduction of a `n x n` matrix
pub fn triu_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Row and column indices of the upper triangular part of a `n x n` matrix,
/// diagonal included, in row-major order.
pub fn triu_indices(n: usize) -> Vec<(usize, usize)> {
    (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect()
}

/// Reduce one `(n, n)` symmetric sample to its upper triangular entries.
///
/// A sample of any other rank, in particular an already reduced 1-D sample,
/// is rejected.
pub fn reduce_sample<F: Float>(sample: &ArrayViewD<F>, feature: usize) -> Result<Array1<F>> {
    if sample.ndim() != 2 {
        return Err(LagError::ShapeError(format!(
            "feature array {feature} is symmetric: expected a (n, n) sample, got shape {:?}",
            sample.shape()
        )));
    }
    let matrix = sample.view().into_dimensionality::<Ix2>()?;
    let n = check_square(matrix.nrows(), matrix.ncols(), feature)?;
    Ok(triu_indices(n)
        .into_iter()
        .map(|(i, j)| matrix[[i, j]])
        .collect())
}

/// Reduce a `(n_samples, n, n)` series of symmetric samples to a
/// `(n_samples, n(n+1)/2)` matrix.
pub fn reduce_series<F: Float>(series: &ArrayViewD<F>, feature: usize) -> Result<Array2<F>> {
    if series.ndim() != 3 {
        return Err(LagError::ShapeError(format!(
            "feature array {feature} is symmetric: expected shape (n_samples, n, n), got {:?}",
            series.shape()
        )));
    }
    let cube = series.view().into_dimensionality::<Ix3>()?;
    let (ns, nr, nc) = cube.dim();
    let n = check_square(nr, nc, feature)?;
    let indices = triu_indices(n);
    Ok(Array2::from_shape_fn((ns, indices.len()), |(t, k)| {
        let (i, j) = indices[k];
        cube[[t, i, j]]
    }))
}

/// Flatten one sample (scalar, vector or matrix) in row-major order
pub fn flatten_sample<F: Float>(sample: &ArrayViewD<F>) -> Array1<F> {
    sample.iter().cloned().collect()
}

/// Flatten a series of samples to a `(n_samples, width)` matrix, a 1-D series
/// giving a single column.
pub fn flatten_series<F: Float>(series: &ArrayViewD<F>, feature: usize) -> Result<Array2<F>> {
    if series.ndim() == 0 {
        return Err(LagError::ShapeError(format!(
            "feature array {feature} has no sample axis"
        )));
    }
    let ns = series.len_of(Axis(0));
    let width = series.shape()[1..].iter().product::<usize>();
    Ok(Array2::from_shape_vec(
        (ns, width),
        series.iter().cloned().collect(),
    )?)
}

fn check_square(nrows: usize, ncols: usize, feature: usize) -> Result<usize> {
    if nrows != ncols {
        return Err(LagError::ShapeError(format!(
            "feature array {feature} is symmetric but its samples are {nrows}x{ncols}"
        )));
    }
    Ok(nrows)
}
