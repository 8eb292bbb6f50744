use crate::errors::{Result, StatsError};
use linfa::Float;
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Dimension, Ix1, Ix2};
use ndarray_stats::QuantileExt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Discretization of a continuous target into equal-width bins.
///
/// Each output variable is binned independently over `[min, max]` of its
/// samples. Bins are half-open `[e_k, e_k+1)` except the last one which also
/// contains the maximum. The assignment is stored as 0-based bin numbers and
/// as a one-hot matrix of `n_bins * n_vars` columns, variable `i` using columns
/// `i * n_bins .. (i + 1) * n_bins`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Binning<F: Float> {
    n_bins: usize,
    edges: Vec<Array1<F>>,
    bin_numbers: Array2<usize>,
    members: Vec<Vec<Vec<F>>>,
    means: Vec<Vec<Option<F>>>,
    one_hot: Array2<F>,
}

impl<F: Float> Binning<F> {
    /// Bin `target` given as `(n_samples,)` or `(n_samples, n_vars)` into `n_bins`
    /// bins per variable.
    ///
    /// ```
    /// use lagbox_stats::Binning;
    /// use ndarray::Array1;
    ///
    /// let target = Array1::range(0., 10., 1.);
    /// let binning = Binning::new(&target, 2).unwrap();
    /// assert_eq!(binning.edges(0).to_vec(), vec![0., 4.5, 9.]);
    /// assert_eq!(binning.bin_means(0), &[Some(2.), Some(7.)]);
    /// ```
    pub fn new<D: Dimension>(
        target: &ArrayBase<impl Data<Elem = F>, D>,
        n_bins: usize,
    ) -> Result<Self> {
        if n_bins == 0 {
            return Err(StatsError::InvalidValueError(
                "number of bins must be at least 1".to_string(),
            ));
        }
        let target = as_2d(target)?;
        let (n_samples, n_vars) = target.dim();
        if n_samples == 0 {
            return Err(StatsError::ShapeError("no sample to bin".to_string()));
        }

        let mut edges = Vec::with_capacity(n_vars);
        let mut bin_numbers = Array2::zeros((n_samples, n_vars));
        let mut members = Vec::with_capacity(n_vars);
        let mut means = Vec::with_capacity(n_vars);
        let mut one_hot = Array2::zeros((n_samples, n_bins * n_vars));

        for (i, col) in target.axis_iter(Axis(1)).enumerate() {
            let lower = *col.min().map_err(|e| {
                StatsError::InvalidValueError(format!("variable {i} cannot be binned: {e}"))
            })?;
            let upper = *col.max().map_err(|e| {
                StatsError::InvalidValueError(format!("variable {i} cannot be binned: {e}"))
            })?;
            if !(lower.is_finite() && upper.is_finite() && (upper - lower).is_finite()) {
                return Err(StatsError::InvalidValueError(format!(
                    "variable {i} cannot be binned over non-finite range [{lower}, {upper}]"
                )));
            }
            if lower == upper {
                return Err(StatsError::DegenerateRangeError {
                    var: i,
                    value: lower.to_f64().unwrap_or(f64::NAN),
                });
            }
            let var_edges = Array1::linspace(lower, upper, n_bins + 1);

            let mut var_members = vec![Vec::new(); n_bins];
            for (k, &v) in col.iter().enumerate() {
                let bin = bin_index(&var_edges, v);
                bin_numbers[[k, i]] = bin;
                one_hot[[k, i * n_bins + bin]] = F::one();
                var_members[bin].push(v);
            }
            let var_means = var_members
                .iter()
                .map(|m| {
                    (!m.is_empty())
                        .then(|| m.iter().fold(F::zero(), |acc, &v| acc + v) / F::cast(m.len()))
                })
                .collect();
            debug!(
                "Variable {i} binned over [{lower}, {upper}] in {n_bins} bins: counts={:?}",
                var_members.iter().map(|m| m.len()).collect::<Vec<_>>()
            );

            edges.push(var_edges);
            members.push(var_members);
            means.push(var_means);
        }

        Ok(Binning {
            n_bins,
            edges,
            bin_numbers,
            members,
            means,
            one_hot,
        })
    }

    /// Number of bins per variable
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Number of binned variables
    pub fn n_vars(&self) -> usize {
        self.edges.len()
    }

    /// `n_bins + 1` bin edges of variable `var`
    pub fn edges(&self, var: usize) -> &Array1<F> {
        &self.edges[var]
    }

    /// `(n_samples, n_vars)` 0-based bin number of each sample
    pub fn bin_numbers(&self) -> &Array2<usize> {
        &self.bin_numbers
    }

    /// `(n_samples, n_bins * n_vars)` one-hot encoding of the bin numbers
    pub fn one_hot(&self) -> &Array2<F> {
        &self.one_hot
    }

    /// Values of variable `var` falling in bin `bin`
    pub fn members(&self, var: usize, bin: usize) -> &[F] {
        &self.members[var][bin]
    }

    /// Mean of each bin of variable `var`, `None` for an empty bin
    pub fn bin_means(&self, var: usize) -> &[Option<F>] {
        &self.means[var]
    }

    /// Number of samples in each bin of variable `var`
    pub fn counts(&self, var: usize) -> Vec<usize> {
        self.members[var].iter().map(|m| m.len()).collect()
    }
}

/// Bin `target` into `n_bins` equal-width bins per variable, returning the
/// one-hot matrix along with the binning structure.
pub fn discretize<F: Float, D: Dimension>(
    target: &ArrayBase<impl Data<Elem = F>, D>,
    n_bins: usize,
) -> Result<(Array2<F>, Binning<F>)> {
    let binning = Binning::new(target, n_bins)?;
    Ok((binning.one_hot().to_owned(), binning))
}

/// Index of the bin containing `v`: number of edges lower or equal to `v`
/// minus one, the maximum being put in the last bin.
fn bin_index<F: Float>(edges: &Array1<F>, v: F) -> usize {
    let n_bins = edges.len() - 1;
    let above = edges.iter().take_while(|&&e| e <= v).count();
    above.saturating_sub(1).min(n_bins - 1)
}

fn as_2d<F: Float, D: Dimension>(
    target: &ArrayBase<impl Data<Elem = F>, D>,
) -> Result<ArrayView2<'_, F>> {
    match target.ndim() {
        1 => Ok(target
            .view()
            .into_dimensionality::<Ix1>()?
            .insert_axis(Axis(1))),
        2 => Ok(target.view().into_dimensionality::<Ix2>()?),
        _ => Err(StatsError::ShapeError(format!(
            "target must be (n_samples,) or (n_samples, n_vars), got shape {:?}",
            target.shape()
        ))),
    }
}
