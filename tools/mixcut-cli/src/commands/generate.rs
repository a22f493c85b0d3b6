//! Run a generation task in the foreground.

use std::io::Write;
use std::sync::Arc;

use mixcut_common::config::AppConfig;
use mixcut_generation::{GenerationRuntime, RuntimeParts};
use mixcut_project_model::task::TaskStatus;
use mixcut_render_engine::{
    object_store_from_config, FfmpegTranscoder, MediaRenderer, NoSpeech, ScratchDir, Transcoder,
};

pub async fn run(config: &AppConfig, project_id: String) -> anyhow::Result<()> {
    let transcoder = FfmpegTranscoder::new(config.render.ffmpeg_binary.clone());
    if !transcoder.is_available() {
        anyhow::bail!(
            "{} not found; install ffmpeg or set render.ffmpeg_binary",
            config.render.ffmpeg_binary
        );
    }

    let store = object_store_from_config(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to set up object store: {e}"))?;
    let scratch = ScratchDir::new(&config.work_dir)?;
    let renderer = MediaRenderer::new(
        Arc::new(transcoder),
        store,
        Arc::new(NoSpeech),
        scratch.clone(),
        config.render.clone(),
    );

    let (tasks, projects) = super::open_stores(config).await?;
    let runtime = GenerationRuntime::start(
        RuntimeParts {
            tasks,
            projects,
            renderer: Arc::new(renderer),
            scratch: Some(scratch),
        },
        &config.generation,
        &config.sweeper,
    );

    let handle = match runtime.submit(&project_id).await {
        Ok(handle) => handle,
        Err(e) => {
            runtime.shutdown().await;
            return Err(anyhow::anyhow!("Failed to start generation: {e}"));
        }
    };
    println!("Task {} queued for project {project_id}", handle.id());

    let outcome = tokio::select! {
        task = handle.wait_with(|t| {
            print!("\r  Status: {:<10} Progress: {:>3}%  ", t.status, t.progress);
            let _ = std::io::stdout().flush();
        }) => task,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted, cancelling task {}", handle.id());
            runtime.cancel(handle.id()).await
        }
    };
    println!();
    runtime.shutdown().await;

    let task = outcome.map_err(|e| anyhow::anyhow!("Generation failed: {e}"))?;
    super::print_task(&task);

    if task.status == TaskStatus::Failed {
        anyhow::bail!(
            "Task {} failed: {}",
            task.id,
            task.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
