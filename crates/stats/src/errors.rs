use thiserror::Error;

/// A result type for statistics utilities
pub type Result<T> = std::result::Result<T, StatsError>;

/// An error when computing streaming moments, binning or normalizing data
#[derive(Error, Debug)]
pub enum StatsError {
    /// When array ranks or shapes are not the expected ones
    #[error("Shape error: {0}")]
    ShapeError(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a variable to bin takes a single value
    #[error("Degenerate range: variable {var} is constant (= {value}), bins cannot be built")]
    DegenerateRangeError {
        /// Index of the variable
        var: usize,
        /// The constant value
        value: f64,
    },
}

impl From<ndarray::ShapeError> for StatsError {
    fn from(err: ndarray::ShapeError) -> Self {
        StatsError::ShapeError(err.to_string())
    }
}
