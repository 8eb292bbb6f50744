use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Prediction of a surrogate at one point
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction<F: Float> {
    /// Predicted output values
    pub mean: Array1<F>,
    /// Uncertainty of each output, as a standard deviation
    pub uncertainty: Array1<F>,
}

/// A trait for regression models driven by lagged features.
///
/// Implementations wrap a concrete backend (Gaussian process, neural network, ...);
/// lagging and online feature history only rely on this contract.
pub trait Surrogate<F: Float> {
    /// Returns input/output dims
    fn dims(&self) -> (usize, usize);
    /// Train the model given `(n, nx)` inputs and `(n, ny)` outputs
    fn fit(&mut self, x: &ArrayView2<F>, y: &ArrayView2<F>) -> Result<()>;
    /// Predict outputs and their uncertainty at one point of `nx` components
    fn predict(&self, x: &ArrayView1<F>) -> Result<Prediction<F>>;
}

impl<F: Float, S: Surrogate<F> + ?Sized> Surrogate<F> for Box<S> {
    fn dims(&self) -> (usize, usize) {
        (**self).dims()
    }

    fn fit(&mut self, x: &ArrayView2<F>, y: &ArrayView2<F>) -> Result<()> {
        (**self).fit(x, y)
    }

    fn predict(&self, x: &ArrayView1<F>) -> Result<Prediction<F>> {
        (**self).predict(x)
    }
}
