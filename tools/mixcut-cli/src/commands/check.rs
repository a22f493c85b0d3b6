//! Check that generation can run.

use mixcut_common::config::{AppConfig, StorageConfig};
use mixcut_render_engine::{object_store_from_config, FfmpegTranscoder, Transcoder};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("MixCut System Check");
    println!("{}", "=".repeat(50));

    let mut ok = true;

    let transcoder = FfmpegTranscoder::new(config.render.ffmpeg_binary.clone());
    if transcoder.is_available() {
        println!("[OK] Transcoder: {} ({})", transcoder.name(), config.render.ffmpeg_binary);
    } else {
        println!(
            "[FAIL] Transcoder: {} not found on PATH",
            config.render.ffmpeg_binary
        );
        ok = false;
    }

    match config.validate() {
        Ok(()) => println!("[OK] Configuration valid"),
        Err(e) => {
            println!("[FAIL] Configuration: {e}");
            ok = false;
        }
    }

    match &config.storage {
        StorageConfig::Local { root, .. } => println!("[OK] Storage: local ({})", root.display()),
        StorageConfig::Http { endpoint, .. } => println!("[OK] Storage: http ({endpoint})"),
    }
    if let Err(e) = object_store_from_config(&config.storage) {
        println!("[FAIL] Storage backend: {e}");
        ok = false;
    }

    for (label, dir) in [
        ("Scratch directory", config.work_dir.clone()),
        ("Task store", config.tasks_dir()),
        ("Project store", config.projects_dir()),
    ] {
        match std::fs::create_dir_all(&dir) {
            Ok(()) => println!("[OK] {label}: {}", dir.display()),
            Err(e) => {
                println!("[FAIL] {label}: {} ({e})", dir.display());
                ok = false;
            }
        }
    }

    println!();
    println!(
        "Workers: {} concurrent, queue of {}, all-failed policy: {:?}",
        config.generation.max_concurrent_tasks,
        config.generation.queue_capacity,
        config.generation.all_failed_policy
    );

    if ok {
        println!("All checks passed. MixCut is ready.");
        Ok(())
    } else {
        anyhow::bail!("Some checks failed. See above for fixes.")
    }
}
