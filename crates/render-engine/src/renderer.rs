//! Single-clip rendering.

use std::sync::Arc;

use async_trait::async_trait;
use mixcut_common::config::RenderDefaults;
use mixcut_project_model::project::{DurationClass, Project, Script};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{RenderError, RenderResult};
use crate::scratch::ScratchDir;
use crate::speech::SpeechSynthesizer;
use crate::storage::{ObjectStore, GENERATED_FOLDER};
use crate::transcode::{OutputPolicy, TranscodeRequest, Transcoder};

/// Produces one published clip for one script.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `script` (the `index`-th selected script of `project`) and
    /// return the published clip's URL.
    async fn render(
        &self,
        project: &Project,
        script: &Script,
        index: usize,
    ) -> RenderResult<String>;
}

/// Clip length in seconds for a duration class.
///
/// `30-60s` draws uniformly from `[30, 60)`, so repeated renders differ.
pub fn clip_duration_secs<R: Rng + ?Sized>(class: DurationClass, rng: &mut R) -> u32 {
    match class {
        DurationClass::Short => 15,
        DurationClass::Standard => 30,
        DurationClass::Variable => rng.gen_range(30..60),
        DurationClass::Unknown => 30,
    }
}

/// Random choices made for one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipPlan {
    pub duration_secs: u32,

    /// Background track picked uniformly from the project's audios.
    pub background_audio: Option<String>,
}

pub fn plan_clip<R: Rng + ?Sized>(project: &Project, rng: &mut R) -> ClipPlan {
    ClipPlan {
        duration_secs: clip_duration_secs(project.duration, rng),
        background_audio: project.audios.choose(rng).map(|a| a.url.clone()),
    }
}

/// Renderer backed by a transcoder, an object store, and a speech provider.
pub struct MediaRenderer {
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn ObjectStore>,
    speech: Arc<dyn SpeechSynthesizer>,
    scratch: ScratchDir,
    defaults: RenderDefaults,
}

impl MediaRenderer {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn ObjectStore>,
        speech: Arc<dyn SpeechSynthesizer>,
        scratch: ScratchDir,
        defaults: RenderDefaults,
    ) -> Self {
        Self {
            transcoder,
            store,
            speech,
            scratch,
            defaults,
        }
    }
}

#[async_trait]
impl Renderer for MediaRenderer {
    async fn render(
        &self,
        project: &Project,
        script: &Script,
        index: usize,
    ) -> RenderResult<String> {
        if project.videos.is_empty() {
            return Err(RenderError::MissingInput {
                message: format!("project {} has no video assets", project.id),
            });
        }

        // ThreadRng is !Send; keep it out of scope before the first await.
        let plan = {
            let mut rng = rand::thread_rng();
            plan_clip(project, &mut rng)
        };
        tracing::info!(
            project_id = %project.id,
            script_id = %script.id,
            index,
            duration_secs = plan.duration_secs,
            background_audio = plan.background_audio.is_some(),
            "Rendering clip"
        );

        let mut audio_inputs: Vec<String> = plan.background_audio.into_iter().collect();
        if let Some(speech) = self.speech.synthesize(&script.content, project.voice).await {
            audio_inputs.push(speech);
        }

        let output = self
            .scratch
            .allocate(&format!("output_{index}"), "mp4")
            .map_err(|e| RenderError::Io {
                path: self.scratch.root().to_path_buf(),
                source: e,
            })?;
        let request = TranscodeRequest {
            visual_inputs: project.videos.iter().map(|v| v.url.clone()).collect(),
            audio_inputs,
            output_path: output.path().to_path_buf(),
            policy: OutputPolicy::from_defaults(&self.defaults, plan.duration_secs),
        };

        self.transcoder.transcode(&request).await?;

        let bytes = tokio::fs::read(output.path())
            .await
            .map_err(|e| RenderError::Io {
                path: output.path().to_path_buf(),
                source: e,
            })?;
        let url = self.store.put(bytes, "video/mp4", GENERATED_FOLDER).await?;

        tracing::info!(index, %url, "Clip published");
        Ok(url)
    }
}
