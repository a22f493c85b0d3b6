//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MixcutError, MixcutResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scratch directory for in-progress render outputs.
    pub work_dir: PathBuf,

    /// Directory holding the task and project stores.
    pub data_dir: PathBuf,

    /// Transcoder output policy.
    pub render: RenderDefaults,

    /// Worker pool and coordinator settings.
    pub generation: GenerationConfig,

    /// Temporary artifact sweeper settings.
    pub sweeper: SweeperConfig,

    /// Where finished clips are published.
    pub storage: StorageConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Output policy handed to ffmpeg for every clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// ffmpeg executable name or path.
    pub ffmpeg_binary: String,

    /// Output frame size; sources are letterboxed into it.
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

/// What a task ends as when every clip render failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllFailedPolicy {
    /// Mark the task completed with an empty video list.
    #[default]
    CompleteEmpty,
    /// Mark the task failed.
    Fail,
}

/// Worker pool and coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum number of tasks rendering at the same time.
    pub max_concurrent_tasks: usize,

    /// Pending jobs buffered before `submit` waits.
    pub queue_capacity: usize,

    /// Outcome when no clip of a non-empty batch rendered.
    pub all_failed_policy: AllFailedPolicy,

    /// Poll interval used by task handles waiting for completion.
    pub poll_interval_ms: u64,
}

/// Temporary artifact sweeper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Whether the background sweeper runs at all.
    pub enabled: bool,

    /// Files older than this are deleted.
    pub max_age_secs: u64,

    /// Time between sweeps.
    pub interval_secs: u64,
}

/// Object store backend for published clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Copy objects into a local directory served under `public_base_url`.
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    /// HTTP PUT objects to `endpoint`; public URLs are built from `public_base_url`.
    Http {
        endpoint: String,
        public_base_url: String,
        #[serde(default)]
        bearer_token: Option<String>,
    },
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mixcut_generation=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        let objects = data_dir.join("objects");
        Self {
            work_dir: std::env::temp_dir().join("mixcut"),
            storage: StorageConfig::Local {
                public_base_url: format!("file://{}", objects.display()),
                root: objects,
            },
            data_dir,
            render: RenderDefaults::default(),
            generation: GenerationConfig::default(),
            sweeper: SweeperConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            width: 1920,
            height: 1080,
            fps: 30,
            video_bitrate_kbps: 2000,
            audio_bitrate_kbps: 128,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 2,
            queue_capacity: 64,
            all_failed_policy: AllFailedPolicy::CompleteEmpty,
            poll_interval_ms: 500,
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_secs: 60 * 60,
            interval_secs: 30 * 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing sections take defaults.
    pub fn load_from(path: impl AsRef<Path>) -> MixcutResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MixcutError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                MixcutError::Io(e)
            }
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| MixcutError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> MixcutResult<()> {
        if self.generation.max_concurrent_tasks == 0 {
            return Err(MixcutError::config(
                "generation.max_concurrent_tasks must be at least 1",
            ));
        }
        if self.generation.queue_capacity == 0 {
            return Err(MixcutError::config(
                "generation.queue_capacity must be at least 1",
            ));
        }
        if self.sweeper.enabled && self.sweeper.interval_secs == 0 {
            return Err(MixcutError::config("sweeper.interval_secs must be positive"));
        }
        if self.render.width == 0 || self.render.height == 0 || self.render.fps == 0 {
            return Err(MixcutError::config(
                "render width, height and fps must be positive",
            ));
        }
        Ok(())
    }

    /// Write config as pretty JSON to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> MixcutResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Directory of the task store.
    pub fn tasks_dir(&self) -> PathBuf {
        self.data_dir.join("tasks")
    }

    /// Directory of the project store.
    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mixcut").join("config.json")
}

/// Default data directory.
fn default_data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("mixcut")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_output_policy() {
        let config = AppConfig::default();
        assert_eq!(config.render.width, 1920);
        assert_eq!(config.render.height, 1080);
        assert_eq!(config.render.fps, 30);
        assert_eq!(config.render.video_bitrate_kbps, 2000);
        assert_eq!(config.render.audio_bitrate_kbps, 128);
        assert_eq!(config.sweeper.max_age_secs, 3600);
        assert_eq!(config.sweeper.interval_secs, 1800);
        assert_eq!(
            config.generation.all_failed_policy,
            AllFailedPolicy::CompleteEmpty
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "generation": { "max_concurrent_tasks": 4, "all_failed_policy": "fail" },
                "storage": {
                    "kind": "http",
                    "endpoint": "http://minio:9000/clips",
                    "public_base_url": "https://cdn.example.com"
                }
            }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.generation.max_concurrent_tasks, 4);
        assert_eq!(config.generation.queue_capacity, 64);
        assert_eq!(config.generation.all_failed_policy, AllFailedPolicy::Fail);
        assert_eq!(config.render.fps, 30);
        assert!(matches!(config.storage, StorageConfig::Http { bearer_token: None, .. }));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "generation": { "max_concurrent_tasks": 0 } }"#).unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, MixcutError::Config { .. }));
    }

    #[test]
    fn test_save_to_creates_parents_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mixcut").join("config.json");
        let mut config = AppConfig::default();
        config.generation.max_concurrent_tasks = 7;

        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.generation.max_concurrent_tasks, 7);
        assert_eq!(loaded.work_dir, config.work_dir);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = AppConfig::load_from("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, MixcutError::FileNotFound { .. }));
    }
}
