use crate::errors::{LagError, Result};
use std::ops::Range;

/// Validated per feature array lag lists.
///
/// Lags of each feature array are deduplicated and stored sorted in descending
/// order (largest lag first). This order fixes the column layout of the lagged
/// feature vector and is shared by the batch and the streaming paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LagSchedule {
    lags: Vec<Vec<usize>>,
    max_lag: usize,
}

impl LagSchedule {
    /// Constructor given one lag list per feature array.
    ///
    /// ```
    /// use lagbox_lag::LagSchedule;
    ///
    /// // first feature array lagged by 1 step, second by 1 and 2 steps
    /// let schedule = LagSchedule::new(&[vec![1], vec![1, 2]]).unwrap();
    /// assert_eq!(schedule.max_lag(), 2);
    /// assert_eq!(schedule.lags(1), &[2, 1]);
    /// ```
    pub fn new<L: AsRef<[i64]>>(lags: &[L]) -> Result<Self> {
        if lags.is_empty() {
            return Err(LagError::ConfigurationError(
                "at least one lag list is required".to_string(),
            ));
        }
        let mut sorted = Vec::with_capacity(lags.len());
        for (i, list) in lags.iter().enumerate() {
            let list = list.as_ref();
            if list.is_empty() {
                return Err(LagError::ConfigurationError(format!(
                    "feature array {i} has an empty lag list"
                )));
            }
            let mut array_lags = list
                .iter()
                .map(|&lag| match usize::try_from(lag) {
                    Ok(l) if l > 0 => Ok(l),
                    _ => Err(LagError::ConfigurationError(format!(
                        "feature array {i}: lag {lag} is not a positive integer"
                    ))),
                })
                .collect::<Result<Vec<usize>>>()?;
            array_lags.sort_unstable_by(|a, b| b.cmp(a));
            array_lags.dedup();
            sorted.push(array_lags);
        }
        let max_lag = sorted.iter().map(|l| l[0]).max().unwrap_or(0);

        Ok(LagSchedule {
            lags: sorted,
            max_lag,
        })
    }

    /// Number of feature arrays this schedule is configured for
    pub fn n_feat_arrays(&self) -> usize {
        self.lags.len()
    }

    /// Largest lag across all feature arrays
    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Lags of the `i`th feature array, largest first
    ///
    /// *Panics* if `i` is out of range
    pub fn lags(&self, i: usize) -> &[usize] {
        &self.lags[i]
    }

    /// Iterate over lag lists in feature array order
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.lags.iter().map(|l| l.as_slice())
    }

    /// Total number of (feature array, lag) blocks in a lagged feature vector
    pub fn n_blocks(&self) -> usize {
        self.lags.iter().map(|l| l.len()).sum()
    }

    /// Width of a lagged feature vector given the flattened width of one
    /// sample of each feature array
    pub fn n_columns(&self, widths: &[usize]) -> usize {
        self.lags
            .iter()
            .zip(widths)
            .map(|(lags, w)| lags.len() * w)
            .sum()
    }

    /// Number of lagged rows obtained from a series of `n_samples`
    pub fn n_rows(&self, n_samples: usize) -> Result<usize> {
        if n_samples <= self.max_lag {
            return Err(LagError::ShapeError(format!(
                "{n_samples} sample(s) given, more than max lag {} required",
                self.max_lag
            )));
        }
        Ok(n_samples - self.max_lag)
    }

    /// Rows of a series of `n_samples` used as the lag `lag` predictor block.
    /// Row `r` of the block is sample `max_lag + r - lag`.
    pub fn window(&self, lag: usize, n_samples: usize) -> Range<usize> {
        (self.max_lag - lag)..(n_samples - lag)
    }

    /// Owned copy of the sorted lag lists
    pub fn to_vec(&self) -> Vec<Vec<usize>> {
        self.lags.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_descending() {
        let schedule = LagSchedule::new(&[vec![1, 3, 2], vec![5]]).unwrap();
        assert_eq!(schedule.lags(0), &[3, 2, 1]);
        assert_eq!(schedule.lags(1), &[5]);
        assert_eq!(schedule.max_lag(), 5);
        assert_eq!(schedule.n_feat_arrays(), 2);
        assert_eq!(schedule.n_blocks(), 4);
    }

    #[test]
    fn test_duplicates_removed() {
        let schedule = LagSchedule::new(&[vec![2, 1, 2, 1]]).unwrap();
        assert_eq!(schedule.lags(0), &[2, 1]);
    }

    #[test]
    fn test_invalid_lags() {
        for lags in [vec![vec![0]], vec![vec![1], vec![-2, 1]], vec![vec![1], vec![]]] {
            assert!(matches!(
                LagSchedule::new(&lags),
                Err(LagError::ConfigurationError(_))
            ));
        }
        let empty: [Vec<i64>; 0] = [];
        assert!(matches!(
            LagSchedule::new(&empty),
            Err(LagError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_rows_and_windows() {
        let schedule = LagSchedule::new(&[[1, 2]]).unwrap();
        assert_eq!(schedule.n_rows(6).unwrap(), 4);
        assert_eq!(schedule.window(2, 6), 0..4);
        assert_eq!(schedule.window(1, 6), 1..5);
        assert!(matches!(schedule.n_rows(2), Err(LagError::ShapeError(_))));
        assert_eq!(schedule.n_columns(&[3]), 6);
    }
}
