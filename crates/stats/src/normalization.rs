use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A structure to store (n, xdim) matrix data standardized column-wise with
/// its mean and standard deviation vectors.
///
/// Standard deviations are population ones (`ddof = 0`); a zero standard
/// deviation (constant column) is replaced by one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct NormalizedData<F: Float> {
    /// normalized data
    data: Array2<F>,
    /// mean vector computed from data
    mean: Array1<F>,
    /// standard deviation vector computed from data
    std: Array1<F>,
}

impl<F: Float> NormalizedData<F> {
    /// Standardize given data
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let (data, mean, std) = normalize(x);
        NormalizedData { data, mean, std }
    }

    /// Keep data as is (zero mean, unit standard deviation), used when
    /// standardization is switched off.
    pub fn identity(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        NormalizedData {
            data: x.to_owned(),
            mean: Array1::zeros(x.ncols()),
            std: Array1::ones(x.ncols()),
        }
    }

    /// Normalized data
    pub fn data(&self) -> &Array2<F> {
        &self.data
    }

    /// Column means
    pub fn mean(&self) -> &Array1<F> {
        &self.mean
    }

    /// Column standard deviations
    pub fn std(&self) -> &Array1<F> {
        &self.std
    }

    /// Dimension of data points
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Normalize a point given in the original space
    ///
    /// *Panics* if `x` has not `ncols()` components
    pub fn normalize_row(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        assert_eq!(x.len(), self.ncols());
        (x - &self.mean) / &self.std
    }

    /// Map a normalized point back to the original space
    ///
    /// *Panics* if `x` has not `ncols()` components
    pub fn denormalize_row(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        assert_eq!(x.len(), self.ncols());
        x * &self.std + &self.mean
    }

    /// Map a normalized spread (e.g. a standard deviation) back to the original scale
    ///
    /// *Panics* if `x` has not `ncols()` components
    pub fn scale_row(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        assert_eq!(x.len(), self.ncols());
        x * &self.std
    }
}

/// Column-wise standardization returning `(normalized, mean, std)`
pub fn normalize<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array1<F>, Array1<F>) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let mut x_std = x.std_axis(Axis(0), F::zero());
    x_std.mapv_inplace(|v| if v == F::zero() { F::one() } else { v });
    let xnorm = (x - &x_mean) / &x_std;

    (xnorm, x_mean, x_std)
}
