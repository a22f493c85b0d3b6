//! Cancel a task.

use mixcut_common::config::AppConfig;
use mixcut_generation::cancel_task;

pub async fn run(config: &AppConfig, task_id: String) -> anyhow::Result<()> {
    let (tasks, _) = super::open_stores(config).await?;
    let task = cancel_task(tasks.as_ref(), &task_id).await?;
    println!("Task {} cancelled", task.id);
    Ok(())
}
