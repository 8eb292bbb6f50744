use crate::backend::{Correlation, GpValidConfig};
use crate::errors::{Result, SurrogateError};
use crate::surrogate::{Prediction, Surrogate};
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2, Zip};

/// Gaussian process regression with an isotropic stationary kernel.
///
/// The covariance between two points at distance `d` is `sigma2 * (corr(d / l) + b)`
/// with `b = 1` when the configuration adds a bias and `0` otherwise, plus the
/// noise level on the diagonal. The process variance `sigma2` of each output is
/// estimated in closed form; the length scale `l` and the noise level are
/// selected among the candidates of the configuration by maximizing the
/// reduced likelihood. Outputs share the kernel hyperparameters.
///
/// Inputs and outputs are expected to be standardized, see
/// [`OnlineSurrogate`](crate::OnlineSurrogate).
#[derive(Clone, Debug)]
pub struct GaussianProcess<F: Float> {
    config: GpValidConfig,
    xt: Array2<F>,
    inner: Option<GpInnerParams<F>>,
}

/// Hyperparameters and factorization of a fitted Gaussian process
#[derive(Clone, Debug)]
struct GpInnerParams<F: Float> {
    length_scale: F,
    noise: F,
    likelihood: F,
    /// Lower Cholesky factor of the correlation matrix
    r_chol: Array2<F>,
    /// Correlation matrix inverse times outputs
    gamma: Array2<F>,
    /// Process variance of each output
    sigma2: Array1<F>,
}

impl<F: Float> GaussianProcess<F> {
    /// Unfitted Gaussian process given validated parameters
    pub fn new(config: GpValidConfig) -> Self {
        GaussianProcess {
            config,
            xt: Array2::zeros((0, 0)),
            inner: None,
        }
    }

    /// Parameters
    pub fn config(&self) -> &GpValidConfig {
        &self.config
    }

    /// Whether the process was fitted
    pub fn is_fitted(&self) -> bool {
        self.inner.is_some()
    }

    /// Selected length scale
    pub fn length_scale(&self) -> Option<F> {
        self.inner.as_ref().map(|p| p.length_scale)
    }

    /// Selected noise level
    pub fn noise_level(&self) -> Option<F> {
        self.inner.as_ref().map(|p| p.noise)
    }

    /// Reduced likelihood at the selected hyperparameters
    pub fn likelihood(&self) -> Option<F> {
        self.inner.as_ref().map(|p| p.likelihood)
    }

    /// Process variance of each output
    pub fn variances(&self) -> Option<&Array1<F>> {
        self.inner.as_ref().map(|p| &p.sigma2)
    }

    fn bias(&self) -> F {
        if self.config.bias() {
            F::one()
        } else {
            F::zero()
        }
    }
}

impl<F: Float> From<GpValidConfig> for GaussianProcess<F> {
    fn from(config: GpValidConfig) -> Self {
        GaussianProcess::new(config)
    }
}

impl<F: Float> Surrogate<F> for GaussianProcess<F> {
    fn dims(&self) -> (usize, usize) {
        (
            self.xt.ncols(),
            self.inner.as_ref().map_or(0, |p| p.sigma2.len()),
        )
    }

    fn fit(&mut self, x: &ArrayView2<F>, y: &ArrayView2<F>) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.nrows() {
            return Err(SurrogateError::ModelError(format!(
                "cannot fit {} input(s) against {} output(s)",
                x.nrows(),
                y.nrows()
            )));
        }
        let correlation = self.config.correlation();
        let noise = self.config.noise();
        let bias = self.bias();
        info!(
            "Fitting {} Gaussian process ({:?}, {:?}) on {} samples",
            self.config.backend(),
            correlation,
            noise,
            x.nrows()
        );
        let d2 = sq_distances(x, x);

        let mut best: Option<GpInnerParams<F>> = None;
        let mut last_err = None;
        for length_scale in self.config.length_scales() {
            for level in noise.levels() {
                let params = reduced_likelihood(
                    &d2,
                    y,
                    correlation,
                    bias,
                    F::cast(length_scale),
                    F::cast(level),
                );
                match params {
                    Ok(params) => {
                        debug!(
                            "length scale={length_scale:e} noise={level:e} likelihood={}",
                            params.likelihood
                        );
                        if best
                            .as_ref()
                            .map_or(true, |b| params.likelihood > b.likelihood)
                        {
                            best = Some(params);
                        }
                        if noise.is_adaptive() {
                            break;
                        }
                    }
                    Err(err) => {
                        debug!("length scale={length_scale:e} noise={level:e} rejected: {err}");
                        last_err = Some(err);
                    }
                }
            }
        }
        let best = match (best, last_err) {
            (Some(best), _) => best,
            (None, Some(err)) => return Err(err),
            (None, None) => {
                return Err(SurrogateError::ModelError(
                    "no hyperparameter candidate".to_string(),
                ))
            }
        };
        info!(
            "Gaussian process fitted: length scale={}, noise={}, likelihood={}",
            best.length_scale, best.noise, best.likelihood
        );
        self.xt = x.to_owned();
        self.inner = Some(best);
        Ok(())
    }

    fn predict(&self, x: &ArrayView1<F>) -> Result<Prediction<F>> {
        let inner = self.inner.as_ref().ok_or_else(|| {
            SurrogateError::ModelError("Gaussian process must be fitted before prediction".into())
        })?;
        if x.len() != self.xt.ncols() {
            return Err(SurrogateError::ModelError(format!(
                "expected {} inputs, got {}",
                self.xt.ncols(),
                x.len()
            )));
        }
        let correlation = self.config.correlation();
        let bias = self.bias();
        let d2 = sq_distances(&x.view().insert_axis(Axis(0)), &self.xt);
        let r = d2.mapv(|v| correlation.value(v.sqrt() / inner.length_scale) + bias);

        let mean = r.dot(&inner.gamma).index_axis_move(Axis(0), 0);
        let rt = inner.r_chol.solve_triangular(&r.t(), UPLO::Lower)?;
        let mse = (F::one() + bias - rt.mapv(|v| v * v).sum()).max(F::zero());
        let uncertainty = inner.sigma2.mapv(|s2| (s2 * mse).sqrt());
        Ok(Prediction { mean, uncertainty })
    }
}

/// Squared euclidean distances between the rows of `a` and the rows of `b`
fn sq_distances<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
        Zip::from(a.row(i))
            .and(b.row(j))
            .fold(F::zero(), |acc, &u, &v| acc + (u - v) * (u - v))
    })
}

/// Reduced likelihood of the outputs `yt` given the hyperparameters.
///
/// For `n` samples and correlation matrix `R`, the process variance of output
/// `j` is `y_j^T R^-1 y_j / n` and the likelihood, up to constants, is
/// `-(n * sum_j ln(sigma2_j) + n_outputs * ln det R) / 2`.
fn reduced_likelihood<F: Float>(
    d2: &Array2<F>,
    yt: &ArrayView2<F>,
    correlation: Correlation,
    bias: F,
    length_scale: F,
    noise: F,
) -> Result<GpInnerParams<F>> {
    let mut r_mx = d2.mapv(|v| correlation.value(v.sqrt() / length_scale) + bias);
    r_mx.diag_mut().mapv_inplace(|v| v + noise);
    let r_chol = r_mx.cholesky()?;

    let rho = r_chol.solve_triangular(yt, UPLO::Lower)?;
    let gamma = r_chol.t().solve_triangular(&rho, UPLO::Upper)?;

    let n_obs = F::cast(yt.nrows());
    let sigma2 = rho
        .mapv(|v| v * v)
        .sum_axis(Axis(0))
        .mapv(|s| (s / n_obs).max(F::min_positive_value()));
    // The determinant of R is the squared product of the diagonal of its
    // Cholesky factor
    let logdet = r_chol.diag().mapv(|v| v.ln()).sum() * F::cast(2.);
    let likelihood = -(n_obs * sigma2.mapv(|s| s.ln()).sum() + F::cast(sigma2.len()) * logdet)
        / F::cast(2.);
    if !likelihood.is_finite() {
        return Err(SurrogateError::ModelError(format!(
            "non finite likelihood for length scale {length_scale} and noise {noise}"
        )));
    }

    Ok(GpInnerParams {
        length_scale,
        noise,
        likelihood,
        r_chol,
        gamma,
        sigma2,
    })
}
