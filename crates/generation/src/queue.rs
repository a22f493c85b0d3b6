//! Bounded job queue and worker pool.
//!
//! Jobs are buffered in an `mpsc` channel and dispatched to the coordinator
//! under a semaphore, so at most `max_concurrent_tasks` runs are active at
//! once. Every run executes in its own tokio task; a panic in one run fails
//! that task and leaves the pool running.

use std::sync::Arc;

use mixcut_common::error::{MixcutError, MixcutResult};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::coordinator::GenerationCoordinator;

/// Failure recorded on tasks still queued when the pool stops.
pub const SHUTDOWN_MESSAGE: &str = "generation stopped before the task started";

/// One queued generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub task_id: String,
    pub project_id: String,
}

/// Sending half of the job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<GenerationJob>,
}

impl JobQueue {
    /// Enqueue a job, waiting for room when the queue is full.
    pub async fn enqueue(&self, job: GenerationJob) -> MixcutResult<()> {
        self.tx.send(job).await.map_err(|_| MixcutError::QueueClosed)
    }

    /// A queue whose receiving side is already gone.
    #[cfg(test)]
    pub(crate) fn closed() -> Self {
        let (tx, _) = mpsc::channel(1);
        Self { tx }
    }
}

/// Dispatcher that feeds queued jobs to the coordinator.
pub struct WorkerPool {
    shutdown: CancellationToken,
    dispatcher: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawn the dispatcher. Must be called inside a tokio runtime.
    pub fn start(
        coordinator: Arc<GenerationCoordinator>,
        max_concurrent_tasks: usize,
        queue_capacity: usize,
    ) -> (JobQueue, WorkerPool) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let permits = Arc::new(Semaphore::new(max_concurrent_tasks.max(1)));
        let shutdown = CancellationToken::new();

        let dispatcher = tokio::spawn(dispatch(rx, coordinator, permits, shutdown.clone()));
        tracing::info!(max_concurrent_tasks, queue_capacity, "Worker pool started");

        (JobQueue { tx }, WorkerPool { shutdown, dispatcher })
    }

    /// Stop taking jobs, let running tasks finish, and fail the ones still queued.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.dispatcher.await {
            tracing::error!(error = %e, "Worker pool dispatcher panicked");
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<GenerationJob>,
    coordinator: Arc<GenerationCoordinator>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
) {
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            Some(finished) = running.join_next(), if !running.is_empty() => {
                if let Err(e) = finished {
                    tracing::error!(error = %e, "Worker task aborted");
                }
            }
            job = rx.recv() => {
                let Some(job) = job else { break };

                let permit = tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => None,
                    permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
                };
                let Some(permit) = permit.filter(|_| !shutdown.is_cancelled()) else {
                    coordinator.abandon(&job.task_id, SHUTDOWN_MESSAGE).await;
                    break;
                };

                let coordinator = Arc::clone(&coordinator);
                let shutdown = shutdown.clone();
                running.spawn(async move {
                    let _permit = permit;
                    supervise(coordinator, job, shutdown).await;
                });
            }
        }
    }

    rx.close();
    let mut abandoned = 0usize;
    while let Some(job) = rx.recv().await {
        coordinator.abandon(&job.task_id, SHUTDOWN_MESSAGE).await;
        abandoned += 1;
    }
    if abandoned > 0 {
        tracing::warn!(abandoned, "Failed queued tasks on shutdown");
    }

    while let Some(finished) = running.join_next().await {
        if let Err(e) = finished {
            tracing::error!(error = %e, "Worker task aborted");
        }
    }
    tracing::info!("Worker pool stopped");
}

/// Run one job in its own task so a panic is contained and recorded.
async fn supervise(
    coordinator: Arc<GenerationCoordinator>,
    job: GenerationJob,
    shutdown: CancellationToken,
) {
    let run = {
        let coordinator = Arc::clone(&coordinator);
        let job = job.clone();
        tokio::spawn(async move {
            coordinator
                .run_until_shutdown(&job.task_id, &job.project_id, &shutdown)
                .await
        })
    };

    if let Err(e) = run.await {
        tracing::error!(task_id = %job.task_id, error = %e, "Generation run panicked");
        coordinator
            .abandon(&job.task_id, "generation worker crashed")
            .await;
    }
}
