pub mod cancel;
pub mod check;
pub mod generate;
pub mod import;
pub mod init;
pub mod status;
pub mod sweep;
pub mod tasks;

use std::sync::Arc;

use mixcut_common::config::AppConfig;
use mixcut_project_model::store::{JsonDirProjectStore, JsonDirTaskStore};
use mixcut_project_model::task::Task;

/// Open the task and project stores under the configured data directory.
pub async fn open_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<JsonDirTaskStore>, Arc<JsonDirProjectStore>)> {
    let tasks = JsonDirTaskStore::open(config.tasks_dir())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open task store: {e}"))?;
    let projects = JsonDirProjectStore::open(config.projects_dir())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open project store: {e}"))?;
    Ok((Arc::new(tasks), Arc::new(projects)))
}

/// Print a task the same way every command does.
pub fn print_task(task: &Task) {
    println!("Task: {}", task.id);
    println!("  Project: {}", task.project_id);
    println!("  Status: {}", task.status);
    println!("  Progress: {}%", task.progress);
    println!("  Created: {}", task.created_at);
    println!("  Updated: {}", task.updated_at);
    if let Some(ref error) = task.error {
        println!("  Error: {error}");
    }
    if let Some(ref result) = task.result {
        println!("  Videos: {}", result.videos.len());
        for url in &result.videos {
            println!("    {url}");
        }
        if let Some(ref preview) = result.preview_url {
            println!("  Preview: {preview}");
        }
    }
}
