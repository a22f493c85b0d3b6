//! Generation task records and their state machine.
//!
//! Every mutation of a [`Task`] goes through [`Task::apply`], which is the
//! single place the lifecycle invariants are enforced:
//!
//! - `progress` never decreases and `progress == 100` iff `completed`
//! - `result` is present iff `completed`
//! - `error` is present only when `failed`
//! - `completed` and `failed` are final
//!
//! Stores apply transitions under their own lock, so a transition is an
//! atomic compare-and-swap on the task's status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress reported once the coordinator has started a task.
pub const STARTED_PROGRESS: u8 = 10;

/// Highest progress reported before the final write.
pub const MAX_RUNNING_PROGRESS: u8 = 90;

/// Error written to tasks cancelled by a user.
pub const CANCELLED_MESSAGE: &str = "user cancelled";

/// Persisted record tracking one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    /// Project this task renders; never changes.
    pub project_id: String,

    pub status: TaskStatus,

    /// Percent complete in `[0, 100]`.
    pub progress: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!(
                "unknown status '{other}' (expected pending, processing, completed, failed)"
            )),
        }
    }
}

/// Output of a completed task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Published clip URLs in script order.
    pub videos: Vec<String>,

    /// First published clip, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl GenerationResult {
    pub fn from_videos(videos: Vec<String>) -> Self {
        let preview_url = videos.first().cloned();
        Self {
            videos,
            preview_url,
        }
    }
}

/// A requested change to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskTransition {
    /// `pending -> processing` with an initial progress marker.
    Start { progress: u8 },
    /// Intermediate progress while processing.
    Progress(u8),
    /// Terminal success.
    Complete(GenerationResult),
    /// Terminal failure with a human-readable reason.
    Fail(String),
}

impl TaskTransition {
    /// User-requested cancellation.
    pub fn cancel() -> Self {
        TaskTransition::Fail(CANCELLED_MESSAGE.to_string())
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("task is already {status}")]
    AlreadyTerminal { status: TaskStatus },

    #[error("cannot move task from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

impl Task {
    /// A fresh pending task.
    pub fn new(project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            status: TaskStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a transition, enforcing the lifecycle invariants.
    ///
    /// On error the task is left untouched.
    pub fn apply(&mut self, transition: TaskTransition) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                status: self.status,
            });
        }

        match transition {
            TaskTransition::Start { progress } => {
                if self.status != TaskStatus::Pending {
                    return Err(TransitionError::InvalidTransition {
                        from: self.status,
                        to: TaskStatus::Processing,
                    });
                }
                self.status = TaskStatus::Processing;
                self.raise_progress(progress);
            }
            TaskTransition::Progress(progress) => {
                if self.status != TaskStatus::Processing {
                    return Err(TransitionError::InvalidTransition {
                        from: self.status,
                        to: TaskStatus::Processing,
                    });
                }
                self.raise_progress(progress);
            }
            TaskTransition::Complete(result) => {
                self.status = TaskStatus::Completed;
                self.progress = 100;
                self.result = Some(result);
                self.error = None;
            }
            TaskTransition::Fail(message) => {
                self.status = TaskStatus::Failed;
                self.result = None;
                self.error = Some(message);
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Progress only moves forward and stays below 100 until completion.
    fn raise_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(99));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_task_is_pending_at_zero() {
        let task = Task::new("p1");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_happy_path_reaches_completed() {
        let mut task = Task::new("p1");
        task.apply(TaskTransition::Start { progress: 10 }).unwrap();
        task.apply(TaskTransition::Progress(50)).unwrap();
        task.apply(TaskTransition::Complete(GenerationResult::from_videos(vec![
            "https://cdn/a.mp4".to_string(),
        ])))
        .unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        let result = task.result.unwrap();
        assert_eq!(result.preview_url.as_deref(), Some("https://cdn/a.mp4"));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut task = Task::new("p1");
        task.apply(TaskTransition::Complete(GenerationResult::default()))
            .unwrap();
        let before = task.clone();

        for transition in [
            TaskTransition::cancel(),
            TaskTransition::Progress(50),
            TaskTransition::Start { progress: 10 },
            TaskTransition::Complete(GenerationResult::default()),
        ] {
            assert_eq!(
                task.apply(transition),
                Err(TransitionError::AlreadyTerminal {
                    status: TaskStatus::Completed
                })
            );
        }
        assert_eq!(task, before);
    }

    #[test]
    fn test_cancel_pending_task() {
        let mut task = Task::new("p1");
        task.apply(TaskTransition::cancel()).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some(CANCELLED_MESSAGE));
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn test_progress_requires_processing() {
        let mut task = Task::new("p1");
        assert!(matches!(
            task.apply(TaskTransition::Progress(20)),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut task = Task::new("p1");
        task.apply(TaskTransition::Start { progress: 10 }).unwrap();
        task.apply(TaskTransition::Progress(60)).unwrap();
        task.apply(TaskTransition::Progress(30)).unwrap();
        assert_eq!(task.progress, 60);
    }

    #[test]
    fn test_empty_result_has_no_preview() {
        let result = GenerationResult::from_videos(vec![]);
        assert!(result.videos.is_empty());
        assert!(result.preview_url.is_none());
    }

    #[test]
    fn test_status_parse_and_display_agree() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    fn arb_transition() -> impl Strategy<Value = TaskTransition> {
        prop_oneof![
            (0u8..=100).prop_map(|progress| TaskTransition::Start { progress }),
            (0u8..=255).prop_map(TaskTransition::Progress),
            prop::collection::vec("[a-z]{1,8}", 0..3)
                .prop_map(|v| TaskTransition::Complete(GenerationResult::from_videos(v))),
            "[a-z ]{1,16}".prop_map(TaskTransition::Fail),
        ]
    }

    proptest! {
        #[test]
        fn prop_invariants_hold_for_any_transition_sequence(
            transitions in prop::collection::vec(arb_transition(), 0..12)
        ) {
            let mut task = Task::new("p1");
            let mut last_progress = task.progress;
            let mut was_terminal = false;

            for transition in transitions {
                let before = task.clone();
                let outcome = task.apply(transition);
                if was_terminal {
                    prop_assert!(outcome.is_err());
                    prop_assert_eq!(&task, &before);
                }
                if outcome.is_err() {
                    prop_assert_eq!(&task, &before);
                }

                prop_assert!(task.progress <= 100);
                prop_assert!(task.progress >= last_progress);
                prop_assert_eq!(task.progress == 100, task.status == TaskStatus::Completed);
                prop_assert_eq!(task.result.is_some(), task.status == TaskStatus::Completed);
                if task.error.is_some() {
                    prop_assert_eq!(task.status, TaskStatus::Failed);
                }
                last_progress = task.progress;
                was_terminal = task.status.is_terminal();
            }
        }
    }
}
