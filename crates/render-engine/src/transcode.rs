//! Transcoder invocation: request building and the ffmpeg backend.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mixcut_common::config::RenderDefaults;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::error::{RenderError, RenderResult};

/// How long ffmpeg may go without advancing before we log a warning.
const STALL_WARNING: Duration = Duration::from_secs(10);

/// Output encoding policy for one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPolicy {
    /// Hard cutoff passed as `-t`.
    pub duration_secs: u32,

    /// Frame size; sources are scaled down and letterboxed into it.
    pub width: u32,
    pub height: u32,

    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl OutputPolicy {
    pub fn from_defaults(defaults: &RenderDefaults, duration_secs: u32) -> Self {
        Self {
            duration_secs,
            width: defaults.width,
            height: defaults.height,
            fps: defaults.fps,
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
        }
    }

    /// `scale` + `pad` filter that fits the source inside the frame, centered.
    pub fn letterbox_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = self.width,
            h = self.height
        )
    }
}

/// Everything the transcoder needs to produce one output file.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Video inputs, in project order.
    pub visual_inputs: Vec<String>,

    /// Audio inputs (background track, speech).
    pub audio_inputs: Vec<String>,

    pub output_path: PathBuf,

    pub policy: OutputPolicy,
}

impl TranscodeRequest {
    /// Command-line arguments for ffmpeg, excluding the binary itself.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
        ];

        for input in self.visual_inputs.iter().chain(&self.audio_inputs) {
            args.push("-i".to_string());
            args.push(input.clone());
        }

        let policy = &self.policy;
        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-shortest".to_string(),
            "-t".to_string(),
            policy.duration_secs.to_string(),
            "-vf".to_string(),
            policy.letterbox_filter(),
            "-r".to_string(),
            policy.fps.to_string(),
            "-b:v".to_string(),
            format!("{}k", policy.video_bitrate_kbps),
            "-b:a".to_string(),
            format!("{}k", policy.audio_bitrate_kbps),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);

        args.push(self.output_path.display().to_string());
        args
    }
}

/// Backend that turns a [`TranscodeRequest`] into an output file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run the transcode; the output file exists on success.
    async fn transcode(&self, request: &TranscodeRequest) -> RenderResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Transcoder that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> RenderResult<()> {
        if request.visual_inputs.is_empty() {
            return Err(RenderError::MissingInput {
                message: "no video inputs".to_string(),
            });
        }

        let args = request.ffmpeg_args();
        tracing::debug!(binary = %self.binary, args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RenderError::Unavailable {
                    tool: self.binary.clone(),
                },
                _ => RenderError::transcode(format!("Failed to start {}: {e}", self.binary)),
            })?;

        tracing::info!(
            pid = child.id(),
            output = %request.output_path.display(),
            duration_secs = request.policy.duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::transcode("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::transcode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let started = Instant::now();
        let mut lines = BufReader::new(stdout).lines();
        let mut progress = ProgressState::default();
        let mut last_advance_secs = 0.0f64;
        let mut last_advance_at = Instant::now();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| RenderError::transcode(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            progress.update(key, value);
            if key != "progress" {
                continue;
            }

            if progress.out_time_secs > last_advance_secs + 0.001 {
                last_advance_secs = progress.out_time_secs;
                last_advance_at = Instant::now();
            }
            tracing::debug!(
                out_time_secs = progress.out_time_secs,
                fraction = progress.fraction_of(request.policy.duration_secs),
                "ffmpeg progress"
            );
            if last_advance_at.elapsed() >= STALL_WARNING {
                tracing::warn!(
                    out_time_secs = progress.out_time_secs,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_advance_at = Instant::now();
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RenderError::transcode(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(RenderError::transcode(format!(
                "ffmpeg exited with {status}: {}",
                stderr_tail(&stderr_output, 20)
            )));
        }

        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %request.output_path.display(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Last `max_lines` non-empty lines of ffmpeg's stderr.
fn stderr_tail(stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

fn command_exists(binary: &str) -> bool {
    std::process::Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Parsed `-progress pipe:1` key/value stream.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn fraction_of(&self, duration_secs: u32) -> f64 {
        if self.complete {
            return 1.0;
        }
        if duration_secs == 0 {
            return 0.0;
        }
        (self.out_time_secs / duration_secs as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(audio: Vec<&str>) -> TranscodeRequest {
        TranscodeRequest {
            visual_inputs: vec!["https://cdn/a.mp4".to_string(), "https://cdn/b.mp4".to_string()],
            audio_inputs: audio.into_iter().map(String::from).collect(),
            output_path: PathBuf::from("/tmp/mixcut/out.mp4"),
            policy: OutputPolicy::from_defaults(&RenderDefaults::default(), 15),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_args_carry_fixed_output_policy() {
        let args = request(vec![]).ffmpeg_args();
        assert_eq!(value_after(&args, "-t"), Some("15"));
        assert_eq!(value_after(&args, "-r"), Some("30"));
        assert_eq!(value_after(&args, "-b:v"), Some("2000k"));
        assert_eq!(value_after(&args, "-b:a"), Some("128k"));
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert!(args.iter().any(|a| a == "-shortest"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some(concat!(
                "scale=1920:1080:force_original_aspect_ratio=decrease,",
                "pad=1920:1080:(ow-iw)/2:(oh-ih)/2"
            ))
        );
        assert_eq!(args.last().map(String::as_str), Some("/tmp/mixcut/out.mp4"));
    }

    #[test]
    fn test_inputs_keep_video_order_then_audio() {
        let args = request(vec!["https://cdn/bgm.mp3"]).ffmpeg_args();
        let inputs: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(
            inputs,
            ["https://cdn/a.mp4", "https://cdn/b.mp4", "https://cdn/bgm.mp3"]
        );
    }

    #[test]
    fn test_progress_state_parses_microseconds() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "7500000");
        assert!((state.out_time_secs - 7.5).abs() < 1e-9);
        assert!((state.fraction_of(15) - 0.5).abs() < 1e-9);
        state.update("progress", "end");
        assert_eq!(state.fraction_of(15), 1.0);
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let tail = stderr_tail("a\n\nb\nc\nd\n", 2);
        assert_eq!(tail, "c\nd");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let transcoder = FfmpegTranscoder::new("mixcut-no-such-ffmpeg-binary");
        assert!(!transcoder.is_available());
        let err = transcoder.transcode(&request(vec![])).await.unwrap_err();
        assert!(matches!(&err, RenderError::Unavailable { .. }));
        assert_eq!(err.to_string(), "mixcut-no-such-ffmpeg-binary is not available");
    }

    #[tokio::test]
    async fn test_empty_visual_inputs_are_rejected() {
        let mut req = request(vec![]);
        req.visual_inputs.clear();
        let err = FfmpegTranscoder::default().transcode(&req).await.unwrap_err();
        assert!(matches!(err, RenderError::MissingInput { .. }));
    }
}
