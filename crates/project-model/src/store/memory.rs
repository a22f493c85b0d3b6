//! In-memory store backends.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{paginate, ProjectStore, StoreError, TaskFilter, TaskPage, TaskStore};
use crate::project::Project;
use crate::task::{Task, TaskTransition};

/// Tasks held in a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, project_id: &str) -> Result<Task, StoreError> {
        let task = Task::new(project_id);
        self.tasks
            .lock()
            .await
            .insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().await.get(task_id).cloned())
    }

    async fn apply(&self, task_id: &str, transition: TaskTransition) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(task_id).ok_or_else(|| StoreError::NotFound {
            kind: "task",
            id: task_id.to_string(),
        })?;
        task.apply(transition)
            .map_err(|source| StoreError::Transition {
                task_id: task_id.to_string(),
                source,
            })?;
        Ok(task.clone())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<TaskPage, StoreError> {
        let tasks = self.tasks.lock().await;
        Ok(paginate(tasks.values().cloned(), filter))
    }
}

/// Projects held in a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: Mutex<HashMap<String, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `projects`.
    pub fn with_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let map = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            projects: Mutex::new(map),
        }
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.projects.lock().await.get(project_id).cloned())
    }

    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.projects
            .lock()
            .await
            .insert(project.id.clone(), project.clone());
        Ok(())
    }
}
