use crate::backend::GpValidConfig;
use crate::errors::{Result, SurrogateError};
use crate::gp::GaussianProcess;
use crate::surrogate::{Prediction, Surrogate};
use lagbox_lag::{FeatureSet, LagError, Session};
use lagbox_stats::NormalizedData;
use linfa::Float;
use log::{debug, info};
use ndarray::{Array2, ArrayBase, Axis, Data, Dimension, Ix1, Ix2};

/// A surrogate fed with lagged features, usable inside a running simulation.
///
/// Training builds lagged `(x, y)` data with the [`Session`], optionally
/// standardizes it and fits the model. During the simulation, samples are
/// pushed at every time step and [`OnlineSurrogate::predict`] evaluates the
/// model on the current lagged feature vector, mapped to and from the
/// standardized space used at training.
pub struct OnlineSurrogate<F: Float, S: Surrogate<F>> {
    session: Session<F>,
    model: S,
    standardize_x: bool,
    standardize_y: bool,
    x_norm: Option<NormalizedData<F>>,
    y_norm: Option<NormalizedData<F>>,
}

impl<F: Float, S: Surrogate<F>> OnlineSurrogate<F, S> {
    /// Constructor given a lag session and an untrained model.
    /// Inputs and outputs are standardized by default.
    pub fn new(session: Session<F>, model: S) -> Self {
        OnlineSurrogate {
            session,
            model,
            standardize_x: true,
            standardize_y: true,
            x_norm: None,
            y_norm: None,
        }
    }

    /// Constructor taking standardization options from a backend configuration
    pub fn with_config(session: Session<F>, model: S, config: &GpValidConfig) -> Self {
        Self::new(session, model).standardize(config.standardize_x(), config.standardize_y())
    }

    /// Set standardization of training inputs and outputs
    pub fn standardize(mut self, x: bool, y: bool) -> Self {
        self.standardize_x = x;
        self.standardize_y = y;
        self
    }

    /// Lag session
    pub fn session(&self) -> &Session<F> {
        &self.session
    }

    /// Underlying model
    pub fn model(&self) -> &S {
        &self.model
    }

    /// Whether the model was trained
    pub fn is_trained(&self) -> bool {
        self.x_norm.is_some() && self.y_norm.is_some()
    }

    /// Train the model on lagged features built from `features` and `target`.
    ///
    /// The feature history is reset, ready for an online phase.
    pub fn train<T, D>(
        &mut self,
        features: &FeatureSet<F>,
        target: &ArrayBase<T, D>,
    ) -> Result<()>
    where
        T: Data<Elem = F>,
        D: Dimension,
    {
        let (x, y) = self.session.build_batch(features, target)?;
        let y = match y.ndim() {
            1 => y
                .into_dimensionality::<Ix1>()
                .map_err(LagError::from)?
                .insert_axis(Axis(1)),
            _ => y.into_dimensionality::<Ix2>().map_err(LagError::from)?,
        };
        let x_norm = normalized(&x, self.standardize_x);
        let y_norm = normalized(&y, self.standardize_y);
        info!(
            "Training surrogate on {} lagged samples ({} inputs, {} outputs)",
            x.nrows(),
            x.ncols(),
            y.ncols()
        );
        self.model
            .fit(&x_norm.data().view(), &y_norm.data().view())?;
        self.x_norm = Some(x_norm);
        self.y_norm = Some(y_norm);
        Ok(())
    }

    /// Append the samples of the current time step to the feature history
    pub fn push(&mut self, samples: &FeatureSet<F>) -> Result<()> {
        Ok(self.session.push(samples)?)
    }

    /// Predict the next step from the current feature history.
    ///
    /// Fails with [`LagError::InsufficientHistoryError`] (wrapped) while fewer
    /// than `max_lag` samples have been pushed.
    pub fn predict(&self) -> Result<Prediction<F>> {
        let (x_norm, y_norm) = match (&self.x_norm, &self.y_norm) {
            (Some(x_norm), Some(y_norm)) => (x_norm, y_norm),
            _ => {
                return Err(SurrogateError::ConfigurationError(
                    "surrogate must be trained before prediction".to_string(),
                ))
            }
        };
        let x = self.session.current_vector()?;
        if x.len() != x_norm.ncols() {
            return Err(SurrogateError::LagError(LagError::ShapeError(format!(
                "lagged feature vector of {} values, model trained on {}",
                x.len(),
                x_norm.ncols()
            ))));
        }
        let prediction = self.model.predict(&x_norm.normalize_row(&x).view())?;
        if prediction.mean.len() != y_norm.ncols() || prediction.uncertainty.len() != y_norm.ncols()
        {
            return Err(SurrogateError::ModelError(format!(
                "model returned {} mean(s) and {} uncertainty value(s), {} output(s) expected",
                prediction.mean.len(),
                prediction.uncertainty.len(),
                y_norm.ncols()
            )));
        }
        Ok(Prediction {
            mean: y_norm.denormalize_row(&prediction.mean),
            uncertainty: y_norm.scale_row(&prediction.uncertainty),
        })
    }

    /// Push the samples of the current time step then predict the next one,
    /// returning `None` while the history is warming up.
    pub fn step(&mut self, samples: &FeatureSet<F>) -> Result<Option<Prediction<F>>> {
        self.push(samples)?;
        match self.predict() {
            Ok(prediction) => Ok(Some(prediction)),
            Err(SurrogateError::LagError(LagError::InsufficientHistoryError {
                available,
                required,
            })) => {
                debug!("Warming up feature history: {available}/{required} samples");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl<F: Float> OnlineSurrogate<F, GaussianProcess<F>> {
    /// Online Gaussian process surrogate given a lag session and validated parameters
    pub fn gaussian_process(session: Session<F>, config: GpValidConfig) -> Self {
        let (x, y) = (config.standardize_x(), config.standardize_y());
        Self::new(session, GaussianProcess::new(config)).standardize(x, y)
    }
}

fn normalized<F: Float>(data: &Array2<F>, standardize: bool) -> NormalizedData<F> {
    if standardize {
        NormalizedData::new(data)
    } else {
        NormalizedData::identity(data)
    }
}
