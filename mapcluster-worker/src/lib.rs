//! mapcluster-worker: run clustering requests off the caller's thread.
//!
//! One request in, one response out. Each request gets its own thread and a
//! [`CancellationToken`](mapcluster_core::CancellationToken); the caller
//! waits on a [`WorkerHandle`], optionally with a timeout.
#![warn(missing_docs)]

mod error;
mod message;
mod worker;

pub use error::{Result, WorkerError};
pub use message::WorkerMessage;
pub use worker::{run_clustering_worker, spawn_clustering, spawn_clustering_with, WorkerHandle};
