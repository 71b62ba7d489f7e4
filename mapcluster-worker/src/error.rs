//! Error types for mapcluster-worker.

use std::io;
use std::time::Duration;

use mapcluster_core::ClusteringError;
use thiserror::Error;

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors surfaced to the caller of a clustering worker.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("failed to spawn clustering worker: {0}")]
    Spawn(#[from] io::Error),

    /// The worker stopped without sending a response.
    #[error("clustering worker exited without a response")]
    Disconnected,

    /// No response arrived in time; the run was cancelled.
    #[error("clustering timed out after {0:?}")]
    Timeout(Duration),

    /// The clustering run failed.
    #[error(transparent)]
    Clustering(#[from] ClusteringError),
}

impl WorkerError {
    /// Returns true if the run ended because it was cancelled or timed out.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Clustering(ClusteringError::Cancelled)
        )
    }
}
