use approx::assert_abs_diff_eq;
use lagbox_lag::{FeatureSet, LagError, Session};
use lagbox_surrogate::{
    Backend, GaussianProcess, GpConfig, OnlineSurrogate, Prediction, Surrogate, SurrogateError,
};
use linfa::ParamGuard;
use ndarray::{array, Array1, ArrayView1, ArrayView2, Axis};

fn init_logger() {
    let env = env_logger::Env::new().filter_or("LAGBOX_LOG", "info");
    let mut builder = env_logger::Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();
}

/// Least squares line on the last input column, one per output
#[derive(Default)]
struct LastColumnRegression {
    slopes: Array1<f64>,
    intercepts: Array1<f64>,
    nx: usize,
}

impl Surrogate<f64> for LastColumnRegression {
    fn dims(&self) -> (usize, usize) {
        (self.nx, self.slopes.len())
    }

    fn fit(&mut self, x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> lagbox_surrogate::Result<()> {
        let last = x.column(x.ncols() - 1);
        let mx = last.mean().unwrap();
        let dx = &last - mx;
        self.nx = x.ncols();
        self.slopes = y
            .axis_iter(Axis(1))
            .map(|col| {
                let my = col.mean().unwrap();
                (&dx * &(&col - my)).sum() / (&dx * &dx).sum()
            })
            .collect();
        self.intercepts = y
            .axis_iter(Axis(1))
            .zip(self.slopes.iter())
            .map(|(col, a)| col.mean().unwrap() - a * mx)
            .collect();
        Ok(())
    }

    fn predict(&self, x: &ArrayView1<f64>) -> lagbox_surrogate::Result<Prediction<f64>> {
        if x.len() != self.nx {
            return Err(SurrogateError::ModelError(format!(
                "expected {} inputs, got {}",
                self.nx,
                x.len()
            )));
        }
        let last = x[self.nx - 1];
        Ok(Prediction {
            mean: &self.slopes * last + &self.intercepts,
            uncertainty: Array1::ones(self.slopes.len()),
        })
    }
}

fn dataset(n: usize) -> (Array1<f64>, Array1<f64>) {
    let u = Array1::from_shape_fn(n, |t| (0.3 * t as f64).sin());
    let y = Array1::from_shape_fn(n, |t| if t == 0 { 1. } else { 2. * u[t - 1] + 1. });
    (u, y)
}

#[test]
fn test_online_prediction_follows_lag_one() {
    init_logger();
    let (u, y) = dataset(60);
    let session = Session::with_lags(&[vec![1, 2]]).unwrap();
    let mut surrogate = OnlineSurrogate::new(session, LastColumnRegression::default());
    surrogate.train(&FeatureSet::single(&u), &y).unwrap();
    assert!(surrogate.is_trained());
    assert_eq!(surrogate.model().dims(), (2, 1));

    let new_u = [0.25, -0.5, 0.75, 0.1];
    for (k, v) in new_u.iter().enumerate() {
        let prediction = surrogate.step(&FeatureSet::scalars(&[*v])).unwrap();
        if k == 0 {
            assert!(prediction.is_none());
        } else {
            let prediction = prediction.unwrap();
            assert_abs_diff_eq!(prediction.mean, array![2. * v + 1.], epsilon = 1e-9);
            // unit uncertainty in standardized space is the target standard deviation
            let y_train = y.slice(ndarray::s![2..]);
            assert_abs_diff_eq!(prediction.uncertainty[0], y_train.std(0.), epsilon = 1e-9);
        }
    }
}

#[test]
fn test_without_standardization() {
    let (u, y) = dataset(40);
    let config = GpConfig::new().standardize(false, false).check().unwrap();
    let session = Session::with_lags(&[vec![1]]).unwrap();
    let mut surrogate =
        OnlineSurrogate::with_config(session, LastColumnRegression::default(), &config);
    surrogate.train(&FeatureSet::single(&u), &y).unwrap();
    surrogate.push(&FeatureSet::scalars(&[0.5])).unwrap();
    let prediction = surrogate.predict().unwrap();
    assert_abs_diff_eq!(prediction.mean, array![2.], epsilon = 1e-9);
    assert_abs_diff_eq!(prediction.uncertainty, array![1.]);
}

#[test]
fn test_insufficient_history_is_recoverable() {
    let (u, y) = dataset(30);
    let session = Session::with_lags(&[vec![3]]).unwrap();
    let mut surrogate = OnlineSurrogate::new(session, LastColumnRegression::default());
    surrogate.train(&FeatureSet::single(&u), &y).unwrap();
    surrogate.push(&FeatureSet::scalars(&[0.1])).unwrap();
    assert!(matches!(
        surrogate.predict(),
        Err(SurrogateError::LagError(LagError::InsufficientHistoryError {
            available: 1,
            required: 3
        }))
    ));
    surrogate.push(&FeatureSet::scalars(&[0.2])).unwrap();
    surrogate.push(&FeatureSet::scalars(&[0.3])).unwrap();
    assert!(surrogate.predict().is_ok());
}

#[test]
fn test_predict_before_training() {
    let session = Session::with_lags(&[vec![1]]).unwrap();
    let mut surrogate = OnlineSurrogate::new(session, LastColumnRegression::default());
    surrogate.push(&FeatureSet::scalars(&[0.1])).unwrap();
    assert!(matches!(
        surrogate.predict(),
        Err(SurrogateError::ConfigurationError(_))
    ));
}

#[test]
fn test_boxed_model_and_two_outputs() {
    let u = Array1::from_shape_fn(50, |t| (0.2 * t as f64).cos());
    let y = ndarray::Array2::from_shape_fn((50, 2), |(t, j)| {
        if t == 0 {
            0.
        } else {
            (j as f64 + 1.) * u[t - 1] - j as f64
        }
    });
    let model: Box<dyn Surrogate<f64>> = Box::new(LastColumnRegression::default());
    let session = Session::with_lags(&[vec![1]]).unwrap();
    let mut surrogate = OnlineSurrogate::new(session, model);
    surrogate.train(&FeatureSet::single(&u), &y).unwrap();
    let prediction = surrogate
        .step(&FeatureSet::scalars(&[0.5]))
        .unwrap()
        .unwrap();
    assert_abs_diff_eq!(prediction.mean, array![0.5, 0.], epsilon = 1e-9);
}

#[test]
fn test_unknown_backend_is_fatal() {
    assert!(matches!(
        "gpytorch".parse::<Backend>(),
        Err(SurrogateError::ConfigurationError(_))
    ));
}

#[test]
fn test_online_gaussian_process() {
    init_logger();
    let (u, y) = dataset(60);
    let config = GpConfig::new().n_restarts(0).check().unwrap();
    let session = Session::with_lags(&[vec![1]]).unwrap();
    let mut surrogate = OnlineSurrogate::gaussian_process(session, config);
    surrogate.train(&FeatureSet::single(&u), &y).unwrap();
    let gp: &GaussianProcess<f64> = surrogate.model();
    assert!(gp.is_fitted());
    assert_eq!(gp.dims(), (1, 1));

    for v in [0.25, -0.5, 0.75] {
        let prediction = surrogate
            .step(&FeatureSet::scalars(&[v]))
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(prediction.mean[0], 2. * v + 1., epsilon = 5e-2);
        assert!(prediction.uncertainty[0].is_finite());
    }
}
