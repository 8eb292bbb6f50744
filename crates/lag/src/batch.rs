use crate::errors::{LagError, Result};
use crate::features::FeatureSet;
use crate::schedule::LagSchedule;
use crate::symmetry::{flatten_series, reduce_series};
use linfa::Float;
use log::debug;
use ndarray::{concatenate, s, Array2, ArrayView2, ArrayViewD, Axis};
use rayon::prelude::*;

/// Lagged design matrix built from feature arrays.
#[derive(Clone, Debug)]
pub(crate) struct LaggedFeatures<F: Float> {
    /// `(n_samples - max_lag, n_columns)` lagged feature matrix
    pub x: Array2<F>,
    /// Flattened width of one sample of each feature array
    pub widths: Vec<usize>,
}

/// Number of samples shared by all feature arrays
pub(crate) fn n_samples<F: Float>(features: &FeatureSet<F>) -> Result<usize> {
    let mut n = None;
    for (i, array) in features.iter().enumerate() {
        if array.ndim() == 0 {
            return Err(LagError::ShapeError(format!(
                "feature array {i} has no sample axis"
            )));
        }
        let ni = array.len_of(Axis(0));
        match n {
            None => n = Some(ni),
            Some(n0) if n0 != ni => {
                return Err(LagError::ShapeError(format!(
                    "feature array {i} has {ni} samples, feature array 0 has {n0}"
                )))
            }
            _ => (),
        }
    }
    n.ok_or_else(|| LagError::ConfigurationError("no feature array given".to_string()))
}

fn reduce<F: Float>(
    series: &ArrayViewD<F>,
    symmetric: bool,
    feature: usize,
) -> Result<Array2<F>> {
    if symmetric {
        reduce_series(series, feature)
    } else {
        flatten_series(series, feature)
    }
}

/// Build the lagged feature matrix.
///
/// Row `r` holds, for each feature array in order and each of its lags `L`
/// (largest first), sample `max_lag + r - L` of that array.
pub(crate) fn lag_features<F: Float>(
    schedule: &LagSchedule,
    symmetry: &[bool],
    features: &FeatureSet<F>,
    n_samples: usize,
) -> Result<LaggedFeatures<F>> {
    let reduced = features
        .arrays()
        .par_iter()
        .zip(symmetry.par_iter())
        .enumerate()
        .map(|(i, (series, &symmetric))| reduce(series, symmetric, i))
        .collect::<Result<Vec<Array2<F>>>>()?;

    let blocks: Vec<ArrayView2<F>> = reduced
        .iter()
        .zip(schedule.iter())
        .flat_map(|(series, lags)| {
            lags.iter()
                .map(move |&lag| series.slice(s![schedule.window(lag, n_samples), ..]))
        })
        .collect();
    let x = concatenate(Axis(1), &blocks)?;
    let widths = reduced.iter().map(|r| r.ncols()).collect::<Vec<_>>();
    debug!(
        "Lagged {} feature array(s) of widths {:?} into {:?} matrix",
        reduced.len(),
        widths,
        x.dim()
    );

    Ok(LaggedFeatures { x, widths })
}
