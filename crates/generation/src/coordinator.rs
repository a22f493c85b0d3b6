//! Per-task orchestration.
//!
//! The coordinator drives the renderer across a project's selected scripts
//! and records everything on the task: `processing` at 10%, progress after
//! every published clip, then a terminal status. Only the per-clip stage
//! isolates failures; anything else fails the task.

use std::sync::Arc;

use mixcut_common::config::AllFailedPolicy;
use mixcut_common::error::MixcutError;
use mixcut_project_model::store::{ProjectStore, StoreError, TaskStore};
use mixcut_project_model::task::{
    GenerationResult, Task, TaskTransition, MAX_RUNNING_PROGRESS, STARTED_PROGRESS,
};
use mixcut_render_engine::renderer::Renderer;
use tokio_util::sync::CancellationToken;

use crate::queue::SHUTDOWN_MESSAGE;

/// Progress persisted after the clip at `index` of `total` is published.
///
/// `10 + floor(index * 80 / total)`, clamped to `[10, 90]`.
pub fn clip_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return STARTED_PROGRESS;
    }
    let span = (MAX_RUNNING_PROGRESS - STARTED_PROGRESS) as usize;
    let progress = STARTED_PROGRESS as usize + index.saturating_mul(span) / total;
    progress.clamp(STARTED_PROGRESS as usize, MAX_RUNNING_PROGRESS as usize) as u8
}

/// Why a run stopped early.
#[derive(Debug)]
enum RunError {
    /// The task reached a terminal state elsewhere (e.g. cancelled).
    Superseded,
    /// Shutdown was requested before the task started.
    Stopped,
    Fatal(MixcutError),
}

impl From<MixcutError> for RunError {
    fn from(err: MixcutError) -> Self {
        RunError::Fatal(err)
    }
}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        if err.is_already_terminal() {
            RunError::Superseded
        } else {
            RunError::Fatal(MixcutError::store(err.to_string()))
        }
    }
}

/// Runs the generation pipeline for one task at a time.
pub struct GenerationCoordinator {
    tasks: Arc<dyn TaskStore>,
    projects: Arc<dyn ProjectStore>,
    renderer: Arc<dyn Renderer>,
    all_failed_policy: AllFailedPolicy,
}

impl GenerationCoordinator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        projects: Arc<dyn ProjectStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            tasks,
            projects,
            renderer,
            all_failed_policy: AllFailedPolicy::default(),
        }
    }

    pub fn with_all_failed_policy(mut self, policy: AllFailedPolicy) -> Self {
        self.all_failed_policy = policy;
        self
    }

    /// Generate every clip for `task_id`. All outcomes are written to the task.
    pub async fn run(&self, task_id: &str, project_id: &str) {
        self.run_inner(task_id, project_id, None).await
    }

    /// Like [`run`](Self::run), but a task that has not started when
    /// `shutdown` fires is failed instead of rendered.
    pub async fn run_until_shutdown(
        &self,
        task_id: &str,
        project_id: &str,
        shutdown: &CancellationToken,
    ) {
        self.run_inner(task_id, project_id, Some(shutdown)).await
    }

    async fn run_inner(
        &self,
        task_id: &str,
        project_id: &str,
        shutdown: Option<&CancellationToken>,
    ) {
        tracing::info!(task_id, project_id, "Generation started");

        match self.execute(task_id, project_id, shutdown).await {
            Ok(()) => {}
            Err(RunError::Stopped) => {
                tracing::info!(task_id, "Shutdown requested before the task started");
                self.abandon(task_id, SHUTDOWN_MESSAGE).await;
            }
            Err(RunError::Superseded) => {
                tracing::info!(task_id, "Task already finished elsewhere, stopping generation");
            }
            Err(RunError::Fatal(err)) => {
                tracing::error!(task_id, error = %err, "Generation failed");
                self.abandon(task_id, err.to_string()).await;
            }
        }
    }

    /// Mark a task failed unless it already finished.
    pub async fn abandon(&self, task_id: &str, reason: impl Into<String>) {
        match self
            .tasks
            .apply(task_id, TaskTransition::Fail(reason.into()))
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_already_terminal() => {}
            Err(e) => tracing::error!(task_id, error = %e, "Failed to record task failure"),
        }
    }

    async fn execute(
        &self,
        task_id: &str,
        project_id: &str,
        shutdown: Option<&CancellationToken>,
    ) -> Result<(), RunError> {
        if self.tasks.get(task_id).await?.is_none() {
            tracing::warn!(task_id, "Task record missing, nothing to generate");
            return Ok(());
        }

        let project = self
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| MixcutError::project_not_found(project_id))?;

        if shutdown.is_some_and(CancellationToken::is_cancelled) {
            return Err(RunError::Stopped);
        }
        self.apply(
            task_id,
            TaskTransition::Start {
                progress: STARTED_PROGRESS,
            },
        )
        .await?;

        let selected = project.selected_scripts();
        let total = project.planned_clip_count();
        let mut videos = Vec::with_capacity(total);

        for (index, script) in selected.into_iter().take(total).enumerate() {
            match self.renderer.render(&project, script, index).await {
                Ok(url) => {
                    videos.push(url);
                    self.apply(task_id, TaskTransition::Progress(clip_progress(index, total)))
                        .await?;
                }
                Err(err) => {
                    tracing::warn!(
                        task_id,
                        index,
                        script_id = %script.id,
                        error = %err,
                        "Clip render failed, continuing with the next script"
                    );
                }
            }
        }

        let rendered = videos.len();
        let finish = if total > 0
            && rendered == 0
            && self.all_failed_policy == AllFailedPolicy::Fail
        {
            TaskTransition::Fail(format!("all {total} clip renders failed"))
        } else {
            TaskTransition::Complete(GenerationResult::from_videos(videos))
        };
        self.apply(task_id, finish).await?;

        tracing::info!(task_id, rendered, attempted = total, "Generation finished");
        Ok(())
    }

    async fn apply(&self, task_id: &str, transition: TaskTransition) -> Result<Task, RunError> {
        Ok(self.tasks.apply(task_id, transition).await?)
    }
}
