use thiserror::Error;

/// A result type for surrogate operations
pub type Result<T> = std::result::Result<T, SurrogateError>;

/// An error when configuring, training or querying a surrogate
#[derive(Error, Debug)]
pub enum SurrogateError {
    /// When the backend configuration is unsupported or inconsistent
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// When lagging or feature history fails
    #[error(transparent)]
    LagError(#[from] lagbox_lag::LagError),
    /// When normalization or other statistics fail
    #[error(transparent)]
    StatsError(#[from] lagbox_stats::StatsError),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When the regression model reports an error
    #[error("Model error: {0}")]
    ModelError(String),
}
