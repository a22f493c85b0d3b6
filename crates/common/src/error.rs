//! Error types shared across MixCut crates.

use std::path::PathBuf;

/// Top-level error type for MixCut operations.
#[derive(Debug, thiserror::Error)]
pub enum MixcutError {
    #[error("project not found")]
    ProjectNotFound { project_id: String },

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("task {task_id} already finished, cannot cancel")]
    TaskAlreadyFinished { task_id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Generation queue is closed")]
    QueueClosed,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using MixcutError.
pub type MixcutResult<T> = Result<T, MixcutError>;

impl MixcutError {
    pub fn project_not_found(project_id: impl Into<String>) -> Self {
        Self::ProjectNotFound {
            project_id: project_id.into(),
        }
    }

    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
