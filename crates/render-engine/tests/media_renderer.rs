use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mixcut_common::config::RenderDefaults;
use mixcut_project_model::project::{DurationClass, Project, Script, VideoAsset, Voice};
use mixcut_render_engine::{
    LocalObjectStore, MediaRenderer, NoSpeech, ObjectStore, RenderError, RenderResult, Renderer,
    ScratchDir, SpeechSynthesizer, TranscodeRequest, Transcoder,
};

/// Writes a fake output file and remembers every request.
#[derive(Default)]
struct RecordingTranscoder {
    requests: Mutex<Vec<TranscodeRequest>>,
    fail: bool,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> RenderResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::fs::write(&request.output_path, b"fake mp4").await.unwrap();
        if self.fail {
            return Err(RenderError::transcode("exit status 1: Invalid data found"));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, _: Vec<u8>, _: &str, _: &str) -> RenderResult<String> {
        Err(RenderError::upload("bucket unavailable"))
    }
}

struct FixedSpeech;

#[async_trait]
impl SpeechSynthesizer for FixedSpeech {
    async fn synthesize(&self, _text: &str, voice: Voice) -> Option<String> {
        Some(format!("https://tts/{}.mp3", voice.as_str()))
    }
}

fn project() -> Project {
    let mut project = Project::new("Autumn promo");
    project.duration = DurationClass::Short;
    project.videos = ["intro", "product"]
        .iter()
        .map(|name| VideoAsset {
            id: name.to_string(),
            name: format!("{name}.mp4"),
            url: format!("https://cdn/{name}.mp4"),
            size: 1024,
            duration: 20.0,
            thumbnail: None,
        })
        .collect();
    project.scripts = vec![Script {
        id: "s1".to_string(),
        content: "Fresh coffee, every morning.".to_string(),
        selected: true,
        generated_at: None,
    }];
    project
}

fn scratch_is_empty(scratch: &ScratchDir) -> bool {
    std::fs::read_dir(scratch.root()).unwrap().next().is_none() && scratch.in_flight_count() == 0
}

#[tokio::test]
async fn renders_uploads_and_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let objects = tempfile::tempdir().unwrap();
    let scratch = ScratchDir::new(work.path()).unwrap();
    let transcoder = Arc::new(RecordingTranscoder::default());

    let renderer = MediaRenderer::new(
        transcoder.clone(),
        Arc::new(LocalObjectStore::new(
            objects.path().to_path_buf(),
            "https://cdn.test".to_string(),
        )),
        Arc::new(NoSpeech),
        scratch.clone(),
        RenderDefaults::default(),
    );

    let project = project();
    let url = renderer
        .render(&project, &project.scripts[0], 0)
        .await
        .unwrap();

    assert!(url.starts_with("https://cdn.test/generated/"));
    assert!(url.ends_with(".mp4"));
    assert!(scratch_is_empty(&scratch));

    let requests = transcoder.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].visual_inputs,
        ["https://cdn/intro.mp4", "https://cdn/product.mp4"]
    );
    assert!(requests[0].audio_inputs.is_empty());
    assert_eq!(requests[0].policy.duration_secs, 15);
}

#[tokio::test]
async fn speech_track_is_added_as_audio_input() {
    let work = tempfile::tempdir().unwrap();
    let objects = tempfile::tempdir().unwrap();
    let transcoder = Arc::new(RecordingTranscoder::default());
    let renderer = MediaRenderer::new(
        transcoder.clone(),
        Arc::new(LocalObjectStore::new(
            objects.path().to_path_buf(),
            "https://cdn.test".to_string(),
        )),
        Arc::new(FixedSpeech),
        ScratchDir::new(work.path()).unwrap(),
        RenderDefaults::default(),
    );

    let project = project();
    renderer
        .render(&project, &project.scripts[0], 0)
        .await
        .unwrap();

    let requests = transcoder.requests.lock().unwrap();
    assert_eq!(requests[0].audio_inputs, ["https://tts/female.mp3"]);
}

#[tokio::test]
async fn transcode_failure_still_removes_output() {
    let work = tempfile::tempdir().unwrap();
    let objects = tempfile::tempdir().unwrap();
    let scratch = ScratchDir::new(work.path()).unwrap();
    let renderer = MediaRenderer::new(
        Arc::new(RecordingTranscoder {
            fail: true,
            ..Default::default()
        }),
        Arc::new(LocalObjectStore::new(
            objects.path().to_path_buf(),
            "https://cdn.test".to_string(),
        )),
        Arc::new(NoSpeech),
        scratch.clone(),
        RenderDefaults::default(),
    );

    let project = project();
    let err = renderer
        .render(&project, &project.scripts[0], 3)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Transcode { .. }));
    assert!(scratch_is_empty(&scratch));
}

#[tokio::test]
async fn upload_failure_surfaces_as_render_error_and_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let scratch = ScratchDir::new(work.path()).unwrap();
    let renderer = MediaRenderer::new(
        Arc::new(RecordingTranscoder::default()),
        Arc::new(FailingStore),
        Arc::new(NoSpeech),
        scratch.clone(),
        RenderDefaults::default(),
    );

    let project = project();
    let err = renderer
        .render(&project, &project.scripts[0], 0)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Upload { .. }));
    assert!(scratch_is_empty(&scratch));
}

#[tokio::test]
async fn project_without_videos_is_rejected_before_transcoding() {
    let work = tempfile::tempdir().unwrap();
    let transcoder = Arc::new(RecordingTranscoder::default());
    let renderer = MediaRenderer::new(
        transcoder.clone(),
        Arc::new(FailingStore),
        Arc::new(NoSpeech),
        ScratchDir::new(work.path()).unwrap(),
        RenderDefaults::default(),
    );

    let mut project = project();
    project.videos.clear();
    let err = renderer
        .render(&project, &project.scripts[0], 0)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::MissingInput { .. }));
    assert!(transcoder.requests.lock().unwrap().is_empty());
}
