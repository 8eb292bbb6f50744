//! Bounded history of the most recent feature samples.
//!
//! The history keeps one FIFO buffer per feature array, each holding at most
//! `capacity` (the max lag) flattened samples, oldest first. Once warm, the
//! lagged feature vector is read from the buffers at position `len - L` for
//! every lag `L`, which is the row of the batch design matrix whose target
//! is the next sample.
use crate::errors::{LagError, Result};
use crate::schedule::LagSchedule;
use linfa::Float;
use ndarray::{concatenate, Array1, ArrayView1, Axis};
use std::collections::VecDeque;

/// Sliding window of flattened samples, one buffer per feature array of a
/// lag schedule.
#[derive(Clone, Debug)]
pub struct FeatureHistory<F: Float> {
    schedule: LagSchedule,
    buffers: Vec<VecDeque<Array1<F>>>,
    widths: Vec<Option<usize>>,
}

impl<F: Float> FeatureHistory<F> {
    /// Empty history for the feature arrays of `schedule`, holding up to
    /// `max_lag` samples each
    pub fn new(schedule: LagSchedule) -> Self {
        let n_feat_arrays = schedule.n_feat_arrays();
        let capacity = schedule.max_lag();
        FeatureHistory {
            schedule,
            buffers: (0..n_feat_arrays)
                .map(|_| VecDeque::with_capacity(capacity + 1))
                .collect(),
            widths: vec![None; n_feat_arrays],
        }
    }

    /// Lag schedule giving the column order of lagged vectors
    pub fn schedule(&self) -> &LagSchedule {
        &self.schedule
    }

    /// Maximum number of samples held per feature array
    pub fn capacity(&self) -> usize {
        self.schedule.max_lag()
    }

    /// Number of feature arrays
    pub fn n_feat_arrays(&self) -> usize {
        self.buffers.len()
    }

    /// Number of samples currently held (the same for every feature array)
    pub fn len(&self) -> usize {
        self.buffers.first().map_or(0, |b| b.len())
    }

    /// Whether no sample was pushed yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether enough samples were pushed to build a lagged feature vector
    pub fn is_ready(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Flattened sample width of the `i`th feature array, once known
    pub fn width(&self, i: usize) -> Option<usize> {
        self.widths.get(i).copied().flatten()
    }

    /// Flattened sample widths of all feature arrays
    pub fn widths(&self) -> &[Option<usize>] {
        &self.widths
    }

    /// Samples of the `i`th feature array, oldest first
    ///
    /// *Panics* if `i` is out of range
    pub fn buffer(&self, i: usize) -> impl ExactSizeIterator<Item = ArrayView1<'_, F>> {
        self.buffers[i].iter().map(|s| s.view())
    }

    /// Drop all samples, keeping the known widths
    pub fn clear(&mut self) {
        self.buffers.iter_mut().for_each(|b| b.clear());
    }

    pub(crate) fn set_widths(&mut self, widths: Vec<Option<usize>>) {
        self.widths = widths;
    }

    /// Append one flattened sample per feature array, evicting the oldest
    /// samples once capacity is exceeded.
    ///
    /// Samples are all checked before any buffer is modified.
    pub fn push(&mut self, samples: Vec<Array1<F>>) -> Result<()> {
        if samples.len() != self.buffers.len() {
            return Err(LagError::ConfigurationError(format!(
                "{} sample(s) given for {} feature array(s)",
                samples.len(),
                self.buffers.len()
            )));
        }
        for (i, (sample, width)) in samples.iter().zip(&self.widths).enumerate() {
            if let Some(w) = width {
                if sample.len() != *w {
                    return Err(LagError::ShapeError(format!(
                        "feature array {i}: sample of {} value(s), expected {w}",
                        sample.len()
                    )));
                }
            }
        }
        let capacity = self.capacity();
        for ((buffer, width), sample) in self.buffers.iter_mut().zip(&mut self.widths).zip(samples)
        {
            width.get_or_insert(sample.len());
            buffer.push_back(sample);
            if buffer.len() > capacity {
                buffer.pop_front();
            }
        }
        Ok(())
    }

    /// Lagged feature vector for the next step, in the column order of the schedule
    pub fn lagged(&self) -> Result<Array1<F>> {
        let n = self.len();
        let required = self.capacity();
        if n < required {
            return Err(LagError::InsufficientHistoryError {
                available: n,
                required,
            });
        }
        let views: Vec<ArrayView1<F>> = self
            .buffers
            .iter()
            .zip(self.schedule.iter())
            .flat_map(|(buffer, lags)| lags.iter().map(move |&lag| buffer[n - lag].view()))
            .collect();
        Ok(concatenate(Axis(0), &views)?)
    }
}
