//! Text-to-speech seam.

use async_trait::async_trait;
use mixcut_project_model::project::Voice;

/// Produces a narration track for a script.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Location of a synthesized audio track, or `None` when no speech is available.
    async fn synthesize(&self, text: &str, voice: Voice) -> Option<String>;
}

/// Synthesizer used when no TTS provider is configured. Never yields audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

#[async_trait]
impl SpeechSynthesizer for NoSpeech {
    async fn synthesize(&self, text: &str, voice: Voice) -> Option<String> {
        tracing::debug!(
            voice = voice.as_str(),
            chars = text.chars().count(),
            "No TTS provider, skipping narration"
        );
        None
    }
}
