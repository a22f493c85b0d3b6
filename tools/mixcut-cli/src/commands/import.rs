//! Import a project document into the project store.

use std::path::PathBuf;

use mixcut_common::config::AppConfig;
use mixcut_project_model::project::Project;
use mixcut_project_model::store::ProjectStore;

pub async fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let project =
        Project::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let (_, projects) = super::open_stores(config).await?;
    projects
        .save(&project)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    println!("Imported project '{}'", project.name);
    println!("  ID: {}", project.id);
    println!("  Videos: {}", project.videos.len());
    println!("  Audios: {}", project.audios.len());
    println!(
        "  Scripts: {} ({} selected)",
        project.scripts.len(),
        project.selected_scripts().len()
    );
    println!("  Clips per run: {}", project.planned_clip_count());

    let issues = project.generation_issues();
    if !issues.is_empty() {
        println!();
        println!("Not ready to generate:");
        for issue in issues {
            println!("  - {issue}");
        }
    }

    Ok(())
}
