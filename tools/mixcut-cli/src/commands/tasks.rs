//! List tasks.

use mixcut_common::config::AppConfig;
use mixcut_project_model::store::{TaskFilter, TaskStore};
use mixcut_project_model::task::TaskStatus;

pub async fn run(
    config: &AppConfig,
    status: Option<String>,
    project: Option<String>,
    page: usize,
    limit: usize,
) -> anyhow::Result<()> {
    let status = status
        .map(|s| s.parse::<TaskStatus>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("{e}. Use: pending, processing, completed, failed"))?;

    let (tasks, _) = super::open_stores(config).await?;
    let filter = TaskFilter {
        status,
        project_id: project,
        page,
        limit,
    };
    let page = tasks
        .list(&filter)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list tasks: {e}"))?;

    if page.tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<38} {:<11} {:>4}  CREATED",
        "TASK", "PROJECT", "STATUS", "%"
    );
    for task in &page.tasks {
        println!(
            "{:<38} {:<38} {:<11} {:>4}  {}",
            task.id,
            task.project_id,
            task.status.as_str(),
            task.progress,
            task.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!();
    println!(
        "Page {}/{} ({} tasks)",
        page.page,
        page.pages.max(1),
        page.total
    );

    Ok(())
}
