//! Write a default config file.

use std::path::PathBuf;

use mixcut_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_file_path);
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    config.save_to(&path)?;
    std::fs::create_dir_all(&config.work_dir)?;
    std::fs::create_dir_all(config.tasks_dir())?;
    std::fs::create_dir_all(config.projects_dir())?;

    println!("Config written to {}", path.display());
    println!("  Scratch directory: {}", config.work_dir.display());
    println!("  Data directory: {}", config.data_dir.display());
    println!();
    println!("Layout:");
    println!("  {}/", config.data_dir.display());
    println!("  ├── projects/    (project documents)");
    println!("  └── tasks/       (generation task records)");

    Ok(())
}
