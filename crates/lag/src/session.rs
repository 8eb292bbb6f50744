use crate::batch::{lag_features, n_samples};
use crate::errors::{LagError, Result};
use crate::features::FeatureSet;
use crate::history::FeatureHistory;
use crate::schedule::LagSchedule;
use crate::symmetry::{flatten_sample, reduce_sample};
use linfa::Float;
use log::{debug, warn};
use ndarray::{Array, Array1, Array2, ArrayBase, Axis, Data, Dimension, Slice};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "persistent")]
use std::fs;
#[cfg(feature = "persistent")]
use std::io::Write;

/// A lagging session: a fixed lag configuration, the symmetry flags of the
/// feature arrays and the streaming history used for online prediction.
///
/// The batch path ([`Session::build_batch`]) and the streaming path
/// ([`Session::push`], [`Session::current_vector`]) share the same lag order,
/// so a vector returned by `current_vector` has the exact column layout of a
/// row of the training matrix.
///
/// ```
/// use lagbox_lag::{FeatureSet, Session};
/// use ndarray::{array, Array1};
///
/// let x = Array1::range(0., 6., 1.);
/// let y = Array1::range(0., 6., 1.);
/// let mut session = Session::configure(&[vec![1, 2]], &[false]).unwrap();
/// let (x_train, y_train) = session.build_batch(&FeatureSet::single(&x), &y).unwrap();
/// assert_eq!(x_train, array![[0., 1.], [1., 2.], [2., 3.], [3., 4.]]);
/// assert_eq!(y_train, array![2., 3., 4., 5.]);
///
/// for v in [3., 4.] {
///     session.push(&FeatureSet::scalars(&[v])).unwrap();
/// }
/// assert_eq!(session.current_vector().unwrap(), array![3., 4.]);
/// ```
#[derive(Clone, Debug)]
pub struct Session<F: Float> {
    symmetry: Vec<bool>,
    shapes: Vec<Option<Vec<usize>>>,
    history: FeatureHistory<F>,
}

impl<F: Float> Session<F> {
    /// Constructor given one lag list and one symmetry flag per feature array
    pub fn configure<L: AsRef<[i64]>>(lags: &[L], symmetry: &[bool]) -> Result<Self> {
        let schedule = LagSchedule::new(lags)?;
        Self::new(schedule, symmetry.to_vec())
    }

    /// Constructor given lag lists, none of the feature arrays being symmetric
    pub fn with_lags<L: AsRef<[i64]>>(lags: &[L]) -> Result<Self> {
        let schedule = LagSchedule::new(lags)?;
        let symmetry = vec![false; schedule.n_feat_arrays()];
        Self::new(schedule, symmetry)
    }

    /// Constructor given a validated lag schedule and symmetry flags
    pub fn new(schedule: LagSchedule, symmetry: Vec<bool>) -> Result<Self> {
        if symmetry.len() != schedule.n_feat_arrays() {
            return Err(LagError::ConfigurationError(format!(
                "{} symmetry flag(s) given for {} lag list(s)",
                symmetry.len(),
                schedule.n_feat_arrays()
            )));
        }
        debug!(
            "Lag session: lags={:?}, symmetry={:?}, max lag={}",
            schedule.to_vec(),
            symmetry,
            schedule.max_lag()
        );
        let shapes = vec![None; schedule.n_feat_arrays()];
        Ok(Session {
            symmetry,
            shapes,
            history: FeatureHistory::new(schedule),
        })
    }

    /// Lag schedule, exposing the column order of lagged feature vectors
    pub fn schedule(&self) -> &LagSchedule {
        self.history.schedule()
    }

    /// Symmetry flags of the feature arrays
    pub fn symmetry(&self) -> &[bool] {
        &self.symmetry
    }

    /// Streaming feature history
    pub fn history(&self) -> &FeatureHistory<F> {
        &self.history
    }

    /// Shape of one sample of each feature array, once known
    pub fn sample_shapes(&self) -> &[Option<Vec<usize>>] {
        &self.shapes
    }

    /// Largest lag of the configuration
    pub fn max_lag(&self) -> usize {
        self.schedule().max_lag()
    }

    /// Number of feature arrays
    pub fn n_feat_arrays(&self) -> usize {
        self.schedule().n_feat_arrays()
    }

    /// Width of a lagged feature vector, once sample widths are known
    pub fn n_columns(&self) -> Option<usize> {
        let widths = self
            .history
            .widths()
            .iter()
            .copied()
            .collect::<Option<Vec<usize>>>()?;
        Some(self.schedule().n_columns(&widths))
    }

    fn check_count(&self, n: usize) -> Result<()> {
        if n != self.n_feat_arrays() {
            return Err(LagError::ConfigurationError(format!(
                "{n} feature array(s) given for {} lag list(s)",
                self.n_feat_arrays()
            )));
        }
        Ok(())
    }

    /// Build time-lagged training data `(x_train, y_train)`.
    ///
    /// `features` arrays have samples along their first axis, `target` is
    /// either `(n_samples,)` or `(n_samples, n_outputs)`. The first `max_lag`
    /// targets are dropped, row `r` of `x_train` holding the lagged predictors
    /// of target `max_lag + r`. Columns are ordered by feature array, then by
    /// decreasing lag.
    ///
    /// The streaming history is reset to an empty window of `max_lag` samples,
    /// ready for an online phase with the same configuration.
    pub fn build_batch<S, D>(
        &mut self,
        features: &FeatureSet<F>,
        target: &ArrayBase<S, D>,
    ) -> Result<(Array2<F>, Array<F, D>)>
    where
        S: Data<Elem = F>,
        D: Dimension,
    {
        self.check_count(features.len())?;
        if target.ndim() != 1 && target.ndim() != 2 {
            return Err(LagError::ShapeError(format!(
                "target must be (n_samples,) or (n_samples, n_outputs), got shape {:?}",
                target.shape()
            )));
        }
        let ns = target.len_of(Axis(0));
        let nf = n_samples(features)?;
        if nf != ns {
            return Err(LagError::ShapeError(format!(
                "feature arrays have {nf} samples, target has {ns}"
            )));
        }
        let n_rows = self.schedule().n_rows(ns)?;

        let lagged = lag_features(self.schedule(), &self.symmetry, features, ns)?;
        let y_train = target
            .slice_axis(Axis(0), Slice::from(self.max_lag()..))
            .to_owned();
        debug_assert_eq!(lagged.x.nrows(), n_rows);

        self.history = FeatureHistory::new(self.schedule().clone());
        self.history
            .set_widths(lagged.widths.into_iter().map(Some).collect());
        self.shapes = features
            .iter()
            .map(|array| Some(array.shape()[1..].to_vec()))
            .collect();

        Ok((lagged.x, y_train))
    }

    /// Append one fresh sample per feature array to the streaming history.
    ///
    /// Samples go through the same symmetry reduction and flattening as in
    /// [`Session::build_batch`]. Scalars are given as 0-d arrays. Once known,
    /// from training or from a previous push, the sample shape of each
    /// feature array is enforced.
    pub fn push(&mut self, samples: &FeatureSet<F>) -> Result<()> {
        self.check_count(samples.len())?;
        for (i, (sample, shape)) in samples.iter().zip(&self.shapes).enumerate() {
            if let Some(shape) = shape {
                if sample.shape() != shape.as_slice() {
                    return Err(LagError::ShapeError(format!(
                        "feature array {i}: sample of shape {:?}, expected {shape:?}",
                        sample.shape()
                    )));
                }
            }
        }
        let flat = samples
            .iter()
            .zip(&self.symmetry)
            .enumerate()
            .map(|(i, (sample, &symmetric))| {
                if symmetric {
                    reduce_sample(sample, i)
                } else {
                    Ok(flatten_sample(sample))
                }
            })
            .collect::<Result<Vec<Array1<F>>>>()?;
        self.history.push(flat)?;
        for (shape, sample) in self.shapes.iter_mut().zip(samples.iter()) {
            shape.get_or_insert_with(|| sample.shape().to_vec());
        }
        Ok(())
    }

    /// Lagged feature vector made of the pushed samples, consistent with a
    /// row of the training matrix.
    ///
    /// Fails with [`LagError::InsufficientHistoryError`] until `max_lag`
    /// samples have been pushed.
    pub fn current_vector(&self) -> Result<Array1<F>> {
        self.history.lagged()
    }

    /// Snapshot of the lag configuration and history contents
    pub fn state(&self) -> SessionState<F> {
        SessionState {
            lags: self.schedule().to_vec(),
            symmetry: self.symmetry.clone(),
            shapes: self.shapes.clone(),
            widths: self.history.widths().to_vec(),
            buffers: (0..self.n_feat_arrays())
                .map(|i| self.history.buffer(i).map(|s| s.to_vec()).collect())
                .collect(),
        }
    }

    /// Restore a session from a snapshot taken with [`Session::state`]
    pub fn from_state(state: SessionState<F>) -> Result<Self> {
        let lags = state
            .lags
            .iter()
            .map(|l| {
                l.iter()
                    .map(|&v| {
                        i64::try_from(v).map_err(|_| {
                            LagError::ConfigurationError(format!("lag {v} out of range"))
                        })
                    })
                    .collect::<Result<Vec<i64>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let schedule = LagSchedule::new(&lags)?;
        if schedule.to_vec() != state.lags {
            return Err(LagError::ConfigurationError(
                "lag lists are not sorted in decreasing order, column order cannot be restored"
                    .to_string(),
            ));
        }
        let mut session = Session::new(schedule, state.symmetry)?;
        if state.widths.len() != session.n_feat_arrays()
            || state.buffers.len() != session.n_feat_arrays()
        {
            return Err(LagError::ConfigurationError(format!(
                "state holds {} width(s) and {} buffer(s) for {} feature array(s)",
                state.widths.len(),
                state.buffers.len(),
                session.n_feat_arrays()
            )));
        }
        let len = state.buffers[0].len();
        if state.buffers.iter().any(|b| b.len() != len) {
            return Err(LagError::ShapeError(
                "history buffers have different lengths".to_string(),
            ));
        }
        if len > session.max_lag() {
            warn!(
                "Restored history holds {len} samples, only the last {} are kept",
                session.max_lag()
            );
        }
        if !state.shapes.is_empty() {
            if state.shapes.len() != session.n_feat_arrays() {
                return Err(LagError::ConfigurationError(format!(
                    "state holds {} sample shape(s) for {} feature array(s)",
                    state.shapes.len(),
                    session.n_feat_arrays()
                )));
            }
            session.shapes = state.shapes;
        }
        session.history.set_widths(state.widths);
        for k in 0..len {
            let samples = state
                .buffers
                .iter()
                .map(|b| Array1::from(b[k].clone()))
                .collect();
            session.history.push(samples)?;
        }
        Ok(session)
    }

    /// Save session state in given file as JSON.
    #[cfg(feature = "persistent")]
    pub fn save(&self, path: &str) -> Result<()>
    where
        F: Serialize,
    {
        let mut file = fs::File::create(path)?;
        let bytes = serde_json::to_vec(&self.state())?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Load session state from given JSON file.
    #[cfg(feature = "persistent")]
    pub fn load(path: &str) -> Result<Self>
    where
        F: for<'de> Deserialize<'de>,
    {
        let data = fs::read(path)?;
        let state: SessionState<F> = serde_json::from_slice(&data)?;
        Self::from_state(state)
    }
}

/// Plain snapshot of a [`Session`] for checkpoint and resume
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SessionState<F> {
    /// Lag lists, largest lag first
    pub lags: Vec<Vec<usize>>,
    /// Symmetry flags
    pub symmetry: Vec<bool>,
    /// Shape of one sample of each feature array, if known
    #[cfg_attr(feature = "serializable", serde(default))]
    pub shapes: Vec<Option<Vec<usize>>>,
    /// Flattened sample width of each feature array, if known
    pub widths: Vec<Option<usize>>,
    /// History samples of each feature array, oldest first
    pub buffers: Vec<Vec<Vec<F>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array3};

    #[test]
    fn test_end_to_end_example() {
        let x = array![[0.], [1.], [2.], [3.], [4.], [5.]];
        let y = array![0., 1., 2., 3., 4., 5.];
        let mut session = Session::with_lags(&[vec![1, 2]]).unwrap();
        let (x_train, y_train) = session.build_batch(&FeatureSet::single(&x), &y).unwrap();
        assert_eq!(session.max_lag(), 2);
        assert_abs_diff_eq!(y_train, array![2., 3., 4., 5.]);
        // lag 2 column first, then lag 1
        assert_abs_diff_eq!(x_train, array![[0., 1.], [1., 2.], [2., 3.], [3., 4.]]);
        assert!(session.history().is_empty());
        assert_eq!(session.history().capacity(), 2);
        assert_eq!(session.n_columns(), Some(2));
    }

    #[test]
    fn test_target_2d_is_kept_2d() {
        let x = Array1::range(0., 8., 1.);
        let y = Array2::from_shape_fn((8, 2), |(i, j)| (i * 10 + j) as f64);
        let mut session = Session::with_lags(&[vec![3]]).unwrap();
        let (x_train, y_train) = session.build_batch(&FeatureSet::single(&x), &y).unwrap();
        assert_eq!(x_train.dim(), (5, 1));
        assert_eq!(y_train.dim(), (5, 2));
        assert_abs_diff_eq!(y_train.row(0).to_owned(), array![30., 31.]);
    }

    #[test]
    fn test_bad_target_rank() {
        let x = Array1::<f64>::zeros(6);
        let y = Array3::<f64>::zeros((6, 1, 1));
        let mut session = Session::with_lags(&[vec![1]]).unwrap();
        assert!(matches!(
            session.build_batch(&FeatureSet::single(&x), &y),
            Err(LagError::ShapeError(_))
        ));
    }

    #[test]
    fn test_count_mismatch() {
        let x = Array1::<f64>::zeros(6);
        let y = Array1::<f64>::zeros(6);
        let mut session = Session::with_lags(&[vec![1], vec![2]]).unwrap();
        assert!(matches!(
            session.build_batch(&FeatureSet::single(&x), &y),
            Err(LagError::ConfigurationError(_))
        ));
        assert!(matches!(
            Session::<f64>::configure(&[vec![1], vec![2]], &[true]),
            Err(LagError::ConfigurationError(_))
        ));
        assert!(matches!(
            session.push(&FeatureSet::scalars(&[1.])),
            Err(LagError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_target_length_mismatch() {
        let x = Array1::<f64>::zeros(6);
        let y = Array1::<f64>::zeros(5);
        let mut session = Session::with_lags(&[vec![1]]).unwrap();
        assert!(matches!(
            session.build_batch(&FeatureSet::single(&x), &y),
            Err(LagError::ShapeError(_))
        ));
    }

    #[test]
    fn test_symmetric_batch_width() {
        let sigma = Array3::from_shape_fn((5, 3, 3), |(t, i, j)| (t + i + j) as f64);
        let u = Array1::range(0., 5., 1.);
        let y = Array1::<f64>::zeros(5);
        let mut session = Session::configure(&[vec![1, 2], vec![1]], &[true, false]).unwrap();
        let features = FeatureSet::multi([sigma.view().into_dyn(), u.view().into_dyn()]);
        let (x_train, _) = session.build_batch(&features, &y).unwrap();
        assert_eq!(x_train.dim(), (3, 2 * 6 + 1));
        assert_eq!(session.history().widths(), &[Some(6), Some(1)]);
    }

    #[test]
    fn test_symmetric_push_rejects_reduced_sample() {
        let mut session = Session::<f64>::configure(&[vec![1]], &[true]).unwrap();
        let reduced = array![1., 2., 3.];
        assert!(matches!(
            session.push(&FeatureSet::single(&reduced)),
            Err(LagError::ShapeError(_))
        ));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_state_roundtrip_keeps_history() {
        let mut session =
            Session::<f64>::configure(&[vec![1, 2], vec![1]], &[false, false]).unwrap();
        for k in 0..4 {
            let v = k as f64;
            session.push(&FeatureSet::scalars(&[v, 10. * v])).unwrap();
        }
        let restored = Session::from_state(session.state()).unwrap();
        assert_eq!(restored.schedule(), session.schedule());
        assert_eq!(restored.sample_shapes(), &[Some(vec![]), Some(vec![])]);
        assert_abs_diff_eq!(
            restored.current_vector().unwrap(),
            session.current_vector().unwrap()
        );
    }

    #[test]
    fn test_state_with_unsorted_lags_is_rejected() {
        let mut state = Session::<f64>::with_lags(&[vec![1, 2]]).unwrap().state();
        state.lags = vec![vec![1, 2]];
        assert!(matches!(
            Session::from_state(state),
            Err(LagError::ConfigurationError(_))
        ));
    }
}
