//! Error types for mapcluster-core.

use thiserror::Error;

/// Result type alias for mapcluster operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for mapcluster operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Clustering error.
    #[error("clustering error: {0}")]
    Clustering(#[from] ClusteringError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Errors raised by a clustering run.
///
/// Malformed features never produce one of these; they degrade to the
/// sentinel anchor instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusteringError {
    /// The run was cancelled through its cancellation token.
    #[error("clustering was cancelled")]
    Cancelled,

    /// Label buffer does not match the number of features.
    #[error("label buffer length {labels} does not match feature count {features}")]
    LabelMismatch { features: usize, labels: usize },

    /// An algorithm was constructed with unusable parameters.
    #[error("invalid clustering configuration: {0}")]
    InvalidConfig(String),
}
