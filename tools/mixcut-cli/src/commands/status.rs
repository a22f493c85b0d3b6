//! Show a task.

use mixcut_common::config::AppConfig;
use mixcut_generation::task_status;

pub async fn run(config: &AppConfig, task_id: String, json: bool) -> anyhow::Result<()> {
    let (tasks, _) = super::open_stores(config).await?;
    let task = task_status(tasks.as_ref(), &task_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        super::print_task(&task);
    }
    Ok(())
}
