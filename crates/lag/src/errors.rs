use thiserror::Error;

/// A result type for lagging and feature history operations
pub type Result<T> = std::result::Result<T, LagError>;

/// An error when configuring a [`Session`](crate::Session), building lagged
/// training data or querying the streaming feature history
#[derive(Error, Debug)]
pub enum LagError {
    /// When lag lists or symmetry flags are malformed or inconsistent
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// When array ranks or lengths do not match between cooperating arrays
    #[error("Shape error: {0}")]
    ShapeError(String),
    /// When the current feature vector is requested before the history is warm
    #[error("Insufficient history: {available} sample(s) pushed, {required} required")]
    InsufficientHistoryError {
        /// Number of samples currently held in the history
        available: usize,
        /// Number of samples needed (i.e. max lag)
        required: usize,
    },
    /// When error during saving
    #[cfg(feature = "persistent")]
    #[error("Save error: {0}")]
    SaveError(#[from] serde_json::Error),
    /// When error during loading
    #[cfg(feature = "persistent")]
    #[error("Load IO error")]
    LoadIoError(#[from] std::io::Error),
}

impl From<ndarray::ShapeError> for LagError {
    fn from(err: ndarray::ShapeError) -> Self {
        LagError::ShapeError(err.to_string())
    }
}
