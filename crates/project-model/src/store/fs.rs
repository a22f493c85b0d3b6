//! JSON-directory store backends.
//!
//! Directory structure:
//! ```text
//! data_dir/
//! ├── tasks/
//! │   ├── <task-id>.json
//! │   └── ...
//! └── projects/
//!     ├── <project-id>.json
//!     └── ...
//! ```
//!
//! Writes go to a temporary sibling and are renamed into place, so readers
//! never observe a half-written document. Transitions are serialized by an
//! in-process lock; there is no cross-process locking.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{paginate, ProjectStore, StoreError, TaskFilter, TaskPage, TaskStore};
use crate::project::Project;
use crate::task::{Task, TaskTransition};

/// A directory of `<id>.json` documents.
#[derive(Debug, Clone)]
struct JsonDir {
    root: PathBuf,
}

impl JsonDir {
    async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Io {
                path: root.clone(),
                source: e,
            })?;
        Ok(Self { root })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId { id: id.to_string() });
        }
        Ok(self.root.join(format!("{id}.json")))
    }

    async fn read<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(id)?;
        read_document(&path).await
    }

    async fn write<T: Serialize>(&self, id: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Parse {
            path: path.clone(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Io {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Io {
                path: path.clone(),
                source: e,
            })
    }

    async fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let io_err = |e| StoreError::Io {
            path: self.root.clone(),
            source: e,
        };
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut documents = vec![];
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_document(&path).await {
                Ok(Some(doc)) => documents.push(doc),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable document"
                ),
            }
        }
        Ok(documents)
    }
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Tasks persisted as one JSON file each.
#[derive(Debug)]
pub struct JsonDirTaskStore {
    dir: JsonDir,
    write_lock: Mutex<()>,
}

impl JsonDirTaskStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: JsonDir::open(root).await?,
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl TaskStore for JsonDirTaskStore {
    async fn create(&self, project_id: &str) -> Result<Task, StoreError> {
        let task = Task::new(project_id);
        let _guard = self.write_lock.lock().await;
        self.dir.write(&task.id, &task).await?;
        tracing::debug!(task_id = %task.id, project_id, "Task created");
        Ok(task)
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        self.dir.read(task_id).await
    }

    async fn apply(&self, task_id: &str, transition: TaskTransition) -> Result<Task, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut task: Task = self
            .dir
            .read(task_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: "task",
                id: task_id.to_string(),
            })?;
        task.apply(transition)
            .map_err(|source| StoreError::Transition {
                task_id: task_id.to_string(),
                source,
            })?;
        self.dir.write(task_id, &task).await?;
        Ok(task)
    }

    async fn list(&self, filter: &TaskFilter) -> Result<TaskPage, StoreError> {
        let tasks: Vec<Task> = self.dir.read_all().await?;
        Ok(paginate(tasks, filter))
    }
}

/// Projects persisted as one JSON file each.
#[derive(Debug)]
pub struct JsonDirProjectStore {
    dir: JsonDir,
}

impl JsonDirProjectStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: JsonDir::open(root).await?,
        })
    }
}

#[async_trait]
impl ProjectStore for JsonDirProjectStore {
    async fn get(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        self.dir.read(project_id).await
    }

    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.dir.write(&project.id, project).await
    }
}
