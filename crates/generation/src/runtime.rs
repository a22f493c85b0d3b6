//! Long-running generation service.
//!
//! [`GenerationRuntime`] wires the stores, the renderer, the worker pool and
//! the scratch sweeper together, and exposes the task operations callers
//! need: submit, status, list, cancel, and wait.

use std::sync::Arc;
use std::time::Duration;

use mixcut_common::config::{GenerationConfig, SweeperConfig};
use mixcut_common::error::{MixcutError, MixcutResult};
use mixcut_project_model::store::{ProjectStore, StoreError, TaskFilter, TaskPage, TaskStore};
use mixcut_project_model::task::{Task, TaskTransition};
use mixcut_render_engine::renderer::Renderer;
use mixcut_render_engine::scratch::ScratchDir;

use crate::coordinator::GenerationCoordinator;
use crate::queue::{GenerationJob, JobQueue, WorkerPool};
use crate::sweeper::TempSweeper;

fn store_error(err: StoreError) -> MixcutError {
    match err {
        StoreError::NotFound { kind: "task", id } => MixcutError::task_not_found(id),
        StoreError::NotFound { kind: "project", id } => MixcutError::project_not_found(id),
        other => MixcutError::store(other.to_string()),
    }
}

/// Fetch a task or fail with [`MixcutError::TaskNotFound`].
pub async fn task_status(tasks: &dyn TaskStore, task_id: &str) -> MixcutResult<Task> {
    tasks
        .get(task_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| MixcutError::task_not_found(task_id))
}

/// Cancel a pending or processing task.
///
/// The task is marked failed with "user cancelled". A running coordinator
/// notices at its next write and stops.
pub async fn cancel_task(tasks: &dyn TaskStore, task_id: &str) -> MixcutResult<Task> {
    match tasks.apply(task_id, TaskTransition::cancel()).await {
        Ok(task) => {
            tracing::info!(task_id, "Task cancelled");
            Ok(task)
        }
        Err(e) if e.is_already_terminal() => Err(MixcutError::TaskAlreadyFinished {
            task_id: task_id.to_string(),
        }),
        Err(e) => Err(store_error(e)),
    }
}

/// Everything the runtime needs to generate clips.
pub struct RuntimeParts {
    pub tasks: Arc<dyn TaskStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub renderer: Arc<dyn Renderer>,

    /// Scratch space to sweep; `None` runs without a sweeper.
    pub scratch: Option<ScratchDir>,
}

/// Handle to a submitted task.
#[derive(Clone)]
pub struct TaskHandle {
    task_id: String,
    tasks: Arc<dyn TaskStore>,
    poll_interval: Duration,
}

impl TaskHandle {
    pub fn id(&self) -> &str {
        &self.task_id
    }

    pub async fn status(&self) -> MixcutResult<Task> {
        task_status(self.tasks.as_ref(), &self.task_id).await
    }

    /// Poll until the task is completed or failed.
    pub async fn wait(&self) -> MixcutResult<Task> {
        self.wait_with(|_| {}).await
    }

    /// Like [`wait`](Self::wait), calling `on_update` whenever status or progress changes.
    pub async fn wait_with(&self, mut on_update: impl FnMut(&Task)) -> MixcutResult<Task> {
        let mut last = None;
        loop {
            let task = self.status().await?;
            let seen = (task.status, task.progress);
            if last != Some(seen) {
                on_update(&task);
                last = Some(seen);
            }
            if task.status.is_terminal() {
                return Ok(task);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task_id", &self.task_id)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Owns the worker pool and sweeper for the lifetime of the service.
pub struct GenerationRuntime {
    tasks: Arc<dyn TaskStore>,
    projects: Arc<dyn ProjectStore>,
    queue: JobQueue,
    pool: WorkerPool,
    sweeper: Option<TempSweeper>,
    poll_interval: Duration,
}

impl GenerationRuntime {
    /// Start the worker pool and, when enabled, the sweeper.
    pub fn start(
        parts: RuntimeParts,
        generation: &GenerationConfig,
        sweeper: &SweeperConfig,
    ) -> Self {
        let coordinator = GenerationCoordinator::new(
            Arc::clone(&parts.tasks),
            Arc::clone(&parts.projects),
            parts.renderer,
        )
        .with_all_failed_policy(generation.all_failed_policy);

        let (queue, pool) = WorkerPool::start(
            Arc::new(coordinator),
            generation.max_concurrent_tasks,
            generation.queue_capacity,
        );

        let sweeper = match parts.scratch {
            Some(scratch) if sweeper.enabled => Some(TempSweeper::spawn(scratch, sweeper)),
            _ => None,
        };

        Self {
            tasks: parts.tasks,
            projects: parts.projects,
            queue,
            pool,
            sweeper,
            poll_interval: Duration::from_millis(generation.poll_interval_ms.max(1)),
        }
    }

    /// Validate the project, create a pending task, and queue it.
    ///
    /// Returns as soon as the task is queued.
    pub async fn submit(&self, project_id: &str) -> MixcutResult<TaskHandle> {
        let project = self
            .projects
            .get(project_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| MixcutError::project_not_found(project_id))?;

        let issues = project.generation_issues();
        if !issues.is_empty() {
            return Err(MixcutError::validation(issues.join("; ")));
        }

        let task = self.tasks.create(project_id).await.map_err(store_error)?;
        tracing::info!(task_id = %task.id, project_id, "Task created");

        let job = GenerationJob {
            task_id: task.id.clone(),
            project_id: project_id.to_string(),
        };
        if let Err(e) = self.queue.enqueue(job).await {
            if let Err(store_err) = self
                .tasks
                .apply(&task.id, TaskTransition::Fail(e.to_string()))
                .await
            {
                tracing::error!(
                    task_id = %task.id,
                    error = %store_err,
                    "Failed to record enqueue failure"
                );
            }
            return Err(e);
        }

        Ok(self.handle(task.id))
    }

    /// Handle for an existing task id.
    pub fn handle(&self, task_id: impl Into<String>) -> TaskHandle {
        TaskHandle {
            task_id: task_id.into(),
            tasks: Arc::clone(&self.tasks),
            poll_interval: self.poll_interval,
        }
    }

    pub async fn status(&self, task_id: &str) -> MixcutResult<Task> {
        task_status(self.tasks.as_ref(), task_id).await
    }

    pub async fn list(&self, filter: &TaskFilter) -> MixcutResult<TaskPage> {
        self.tasks.list(filter).await.map_err(store_error)
    }

    pub async fn cancel(&self, task_id: &str) -> MixcutResult<Task> {
        cancel_task(self.tasks.as_ref(), task_id).await
    }

    /// Stop the sweeper and the pool. Running tasks finish; queued ones fail.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down generation runtime");
        if let Some(sweeper) = self.sweeper {
            sweeper.stop().await;
        }
        self.pool.shutdown().await;
    }
}
