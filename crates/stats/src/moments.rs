//! Recursive (streaming) estimation of mean and variance.
//!
//! Given the moments of `n` samples, the moments of `n + 1` samples are
//!
//! ```text
//! mean' = mean + (x - mean) / (n + 1)
//! var'  = var + mean^2 - mean'^2 + (x^2 - var - mean^2) / (n + 1)
//! ```
//!
//! which is O(1) in memory and time per update. `var` is the population
//! (biased) variance.
//!
//! Accuracy note: this recurrence goes through the raw second moment
//! `var + mean^2`, so it loses precision when `mean^2` is large compared to
//! `var` or after a very large number of updates. It is kept as is since
//! streaming consumers rely on its exact sequence of values; use a two-pass
//! computation when accuracy on ill-conditioned data matters more.
use crate::errors::{Result, StatsError};
use linfa::Float;
use ndarray::{Array, ArrayBase, Data, Dimension, Zip};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Update `(mean, variance)` of `n` samples with the new sample `x`.
///
/// ```
/// use lagbox_stats::recursive_moments;
///
/// let (mut mean, mut var) = (0., 0.);
/// for (n, x) in [1., 2., 3., 4.].into_iter().enumerate() {
///     (mean, var) = recursive_moments(x, mean, var, n);
/// }
/// assert!((mean - 2.5f64).abs() < 1e-12);
/// assert!((var - 1.25f64).abs() < 1e-12);
/// ```
pub fn recursive_moments<F: Float>(x: F, mean: F, variance: F, n: usize) -> (F, F) {
    let np1 = F::cast(n + 1);
    let new_mean = mean + (x - mean) / np1;
    let new_variance =
        variance + mean * mean - new_mean * new_mean + (x * x - variance - mean * mean) / np1;
    (new_mean, new_variance)
}

/// Element-wise [`recursive_moments`] over arrays of the same shape,
/// e.g. to track the moments of a whole field at each grid point.
pub fn recursive_moments_array<F: Float, D: Dimension>(
    x: &ArrayBase<impl Data<Elem = F>, D>,
    mean: &ArrayBase<impl Data<Elem = F>, D>,
    variance: &ArrayBase<impl Data<Elem = F>, D>,
    n: usize,
) -> Result<(Array<F, D>, Array<F, D>)> {
    if x.shape() != mean.shape() || x.shape() != variance.shape() {
        return Err(StatsError::ShapeError(format!(
            "sample {:?}, mean {:?} and variance {:?} shapes differ",
            x.shape(),
            mean.shape(),
            variance.shape()
        )));
    }
    let mut new_mean = Array::zeros(x.raw_dim());
    let mut new_variance = Array::zeros(x.raw_dim());
    Zip::from(&mut new_mean)
        .and(&mut new_variance)
        .and(x)
        .and(mean)
        .and(variance)
        .for_each(|m1, v1, &xi, &m, &v| {
            (*m1, *v1) = recursive_moments(xi, m, v, n);
        });
    Ok((new_mean, new_variance))
}

/// Caller-owned running moments `(mean, variance, count)` of a scalar.
///
/// `update` consumes the state and returns the next one; nothing is stored
/// elsewhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct MomentState<F> {
    /// Running mean
    pub mean: F,
    /// Running population variance
    pub variance: F,
    /// Number of samples accounted for
    pub count: usize,
}

impl<F: Float> MomentState<F> {
    /// Moments of an empty sample
    pub fn new() -> Self {
        MomentState {
            mean: F::zero(),
            variance: F::zero(),
            count: 0,
        }
    }

    /// Moments including the new sample `x`
    pub fn update(self, x: F) -> Self {
        let (mean, variance) = recursive_moments(x, self.mean, self.variance, self.count);
        MomentState {
            mean,
            variance,
            count: self.count + 1,
        }
    }

    /// Running standard deviation
    pub fn std_dev(&self) -> F {
        self.variance.max(F::zero()).sqrt()
    }
}
