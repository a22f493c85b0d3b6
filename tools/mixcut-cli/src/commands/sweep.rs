//! One-shot scratch cleanup.

use std::time::Duration;

use mixcut_common::config::AppConfig;
use mixcut_generation::sweep_once;
use mixcut_render_engine::ScratchDir;

pub async fn run(config: &AppConfig, max_age_secs: Option<u64>) -> anyhow::Result<()> {
    let max_age = Duration::from_secs(max_age_secs.unwrap_or(config.sweeper.max_age_secs));
    let scratch = ScratchDir::new(&config.work_dir)?;

    println!(
        "Sweeping {} (files older than {}s)",
        scratch.root().display(),
        max_age.as_secs()
    );
    let report = sweep_once(&scratch, max_age).await;

    println!("  Scanned: {}", report.scanned);
    println!("  Removed: {}", report.removed);
    if report.failed > 0 {
        println!("  Failed: {} (see log)", report.failed);
    }
    Ok(())
}
