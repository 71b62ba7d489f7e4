//! Messages sent from a clustering worker to its caller.

use std::time::Duration;

use mapcluster_core::{ClusteringError, ClusteringResult};

/// The single response of a worker.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Clustering completed successfully.
    ///
    /// Contains the result and the wall time spent on the worker thread.
    Complete(Box<ClusteringResult>, Duration),

    /// Clustering failed or was cancelled.
    Failed(ClusteringError),
}
