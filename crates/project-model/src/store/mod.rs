//! Persistence seams for tasks and projects.
//!
//! The generation pipeline only talks to these traits. Two backends ship:
//! [`memory`] for tests and embedding, [`fs`] for a directory of JSON
//! documents.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::project::Project;
use crate::task::{Task, TaskStatus, TaskTransition, TransitionError};

pub mod fs;
pub mod memory;

pub use fs::{JsonDirProjectStore, JsonDirTaskStore};
pub use memory::{InMemoryProjectStore, InMemoryTaskStore};

/// Task persistence.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new pending task for `project_id`.
    async fn create(&self, project_id: &str) -> Result<Task, StoreError>;

    /// Fetch a task by id.
    async fn get(&self, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Atomically apply a transition and return the updated task.
    ///
    /// Fails with [`StoreError::Transition`] without writing anything when
    /// the task's current state does not allow the transition.
    async fn apply(&self, task_id: &str, transition: TaskTransition) -> Result<Task, StoreError>;

    /// Page through tasks, newest first.
    async fn list(&self, filter: &TaskFilter) -> Result<TaskPage, StoreError>;
}

/// Project persistence. The pipeline only reads.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, project_id: &str) -> Result<Option<Project>, StoreError>;

    async fn save(&self, project: &Project) -> Result<(), StoreError>;
}

/// Task listing criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub project_id: Option<String>,

    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            status: None,
            project_id: None,
            page: 1,
            limit: 10,
        }
    }
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self
                .project_id
                .as_deref()
                .map_or(true, |p| task.project_id == p)
    }
}

/// One page of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

/// Filter, sort newest first, and cut out the requested page.
pub(crate) fn paginate(tasks: impl IntoIterator<Item = Task>, filter: &TaskFilter) -> TaskPage {
    let mut matching: Vec<Task> = tasks.into_iter().filter(|t| filter.matches(t)).collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let limit = filter.limit.max(1);
    let page = filter.page.max(1);
    let total = matching.len();
    let tasks = matching
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    TaskPage {
        tasks,
        page,
        limit,
        total,
        pages: total.div_ceil(limit),
    }
}

/// Errors raised by store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("task {task_id}: {source}")]
    Transition {
        task_id: String,
        #[source]
        source: TransitionError,
    },

    #[error("invalid identifier: {id:?}")]
    InvalidId { id: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Whether the write was refused because the task already finished.
    pub fn is_already_terminal(&self) -> bool {
        matches!(
            self,
            StoreError::Transition {
                source: TransitionError::AlreadyTerminal { .. },
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_at(project: &str, status: TaskStatus, age_secs: i64) -> Task {
        let mut task = Task::new(project);
        task.status = status;
        task.created_at = chrono::Utc::now() - chrono::Duration::seconds(age_secs);
        task
    }

    #[test]
    fn test_paginate_sorts_newest_first() {
        let tasks = vec![
            task_at("p", TaskStatus::Pending, 30),
            task_at("p", TaskStatus::Pending, 10),
            task_at("p", TaskStatus::Pending, 20),
        ];
        let newest = tasks[1].id.clone();
        let page = paginate(tasks, &TaskFilter::default());
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 1);
        assert_eq!(page.tasks[0].id, newest);
    }

    #[test]
    fn test_paginate_filters_and_splits_pages() {
        let mut tasks: Vec<Task> = (0..5)
            .map(|i| task_at("p", TaskStatus::Completed, i))
            .collect();
        tasks.push(task_at("p", TaskStatus::Failed, 100));
        tasks.push(task_at("other", TaskStatus::Completed, 100));

        let filter = TaskFilter {
            status: Some(TaskStatus::Completed),
            project_id: Some("p".to_string()),
            page: 2,
            limit: 2,
        };
        let page = paginate(tasks, &filter);
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.tasks.len(), 2);
        assert!(page.tasks.iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[test]
    fn test_zero_limit_is_treated_as_one() {
        let tasks = vec![task_at("p", TaskStatus::Pending, 1)];
        let filter = TaskFilter {
            limit: 0,
            page: 0,
            ..TaskFilter::default()
        };
        let page = paginate(tasks, &filter);
        assert_eq!(page.limit, 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.tasks.len(), 1);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let tasks = vec![task_at("p", TaskStatus::Pending, 1)];
        let filter = TaskFilter {
            page: usize::MAX,
            limit: 10,
            ..TaskFilter::default()
        };
        let page = paginate(tasks, &filter);
        assert!(page.tasks.is_empty());
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.total, 1);
        assert_eq!(page.pages, 1);
    }
}
