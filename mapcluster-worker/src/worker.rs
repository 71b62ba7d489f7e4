//! Clustering worker for background processing.
//!
//! Each request runs on its own named thread and answers with exactly one
//! [`WorkerMessage`] over a channel. The caller keeps a [`WorkerHandle`]
//! to wait for the answer, give up after a timeout, or cancel the run.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mapcluster_algorithms::AdaptiveDispatcher;
use mapcluster_core::{CancellationToken, ClusterRequest, ClusteringResult};

use crate::error::{Result, WorkerError};
use crate::message::WorkerMessage;

const THREAD_NAME: &str = "mapcluster-worker";

/// Run one request and send its response.
///
/// A send error means the caller is gone; the result is dropped.
pub fn run_clustering_worker(
    request: ClusterRequest,
    tx: &Sender<WorkerMessage>,
    cancel: &CancellationToken,
) {
    let start = Instant::now();
    let total = request.features.len();

    let message = match AdaptiveDispatcher::new().dispatch(request, cancel) {
        Ok(result) => {
            let elapsed = start.elapsed();
            log::info!(
                "clustered {} features into {} clusters with {} in {:.1} ms",
                total,
                result.stats.total_clusters,
                result.stats.strategy,
                elapsed.as_secs_f64() * 1000.0
            );
            WorkerMessage::Complete(Box::new(result), elapsed)
        }
        Err(e) => {
            log::info!("clustering of {total} features stopped: {e}");
            WorkerMessage::Failed(e)
        }
    };

    if tx.send(message).is_err() {
        log::debug!("clustering response dropped: caller went away");
    }
}

/// Start clustering `request` on a new worker thread.
///
/// # Errors
///
/// Returns [`WorkerError::Spawn`] if the thread cannot be created.
pub fn spawn_clustering(request: ClusterRequest) -> Result<WorkerHandle> {
    spawn_clustering_with(request, CancellationToken::new())
}

/// Start clustering `request` on a new worker thread, observing `cancel`.
///
/// # Errors
///
/// Returns [`WorkerError::Spawn`] if the thread cannot be created.
pub fn spawn_clustering_with(
    request: ClusterRequest,
    cancel: CancellationToken,
) -> Result<WorkerHandle> {
    let (tx, rx) = channel();
    let worker_cancel = cancel.clone();
    let thread = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || run_clustering_worker(request, &tx, &worker_cancel))?;

    Ok(WorkerHandle {
        rx,
        cancel,
        thread: Some(thread),
    })
}

/// Caller side of a running clustering request.
///
/// Dropping the handle cancels a run that has not answered yet.
#[derive(Debug)]
pub struct WorkerHandle {
    rx: Receiver<WorkerMessage>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request cancellation; the worker answers with `Cancelled` at its
    /// next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the token observed by the worker.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns true once the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Non-blocking poll for the response.
    ///
    /// Returns `None` while the worker is still running.
    pub fn try_result(&mut self) -> Option<Result<ClusteringResult>> {
        match self.rx.try_recv() {
            Ok(message) => Some(self.finish(message)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(WorkerError::Disconnected)),
        }
    }

    /// Block until the response arrives.
    ///
    /// # Errors
    ///
    /// Returns the clustering error of a failed run, or
    /// [`WorkerError::Disconnected`] if the worker died without answering.
    pub fn wait(mut self) -> Result<ClusteringResult> {
        match self.rx.recv() {
            Ok(message) => self.finish(message),
            Err(_) => Err(WorkerError::Disconnected),
        }
    }

    /// Block until the response arrives or `timeout` passes.
    ///
    /// On timeout the run is cancelled and [`WorkerError::Timeout`] is
    /// returned; the worker thread stops at its next cancellation check.
    ///
    /// # Errors
    ///
    /// As [`WorkerHandle::wait`], plus [`WorkerError::Timeout`].
    pub fn wait_timeout(mut self, timeout: Duration) -> Result<ClusteringResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => self.finish(message),
            Err(RecvTimeoutError::Timeout) => {
                self.cancel.cancel();
                log::warn!("clustering timed out after {timeout:?}; cancelling");
                Err(WorkerError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    fn finish(&mut self, message: WorkerMessage) -> Result<ClusteringResult> {
        // The worker exits right after sending.
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("clustering worker panicked after responding");
            }
        }
        match message {
            WorkerMessage::Complete(result, _) => Ok(*result),
            WorkerMessage::Failed(e) => Err(e.into()),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}
