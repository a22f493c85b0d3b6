//! Project configuration types.
//!
//! A project is the read-only snapshot that drives generation: source
//! assets, script variants, the target clip length, and caption styling.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project identifier.
    pub id: String,

    /// Human-readable project name.
    pub name: String,

    /// Source video assets, in project order.
    #[serde(default)]
    pub videos: Vec<VideoAsset>,

    /// Background audio assets.
    #[serde(default)]
    pub audios: Vec<AudioAsset>,

    /// Script variants; order is render order.
    #[serde(default)]
    pub scripts: Vec<Script>,

    /// Target clip length class.
    #[serde(default)]
    pub duration: DurationClass,

    /// Desired number of clips per generation run.
    #[serde(default = "default_video_count")]
    pub video_count: u32,

    /// Narration voice.
    #[serde(default)]
    pub voice: Voice,

    /// Caption styling.
    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// An uploaded video asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsset {
    pub id: String,
    pub name: String,

    /// Location ffmpeg can read from (URL or local path).
    pub url: String,

    /// Size in bytes.
    #[serde(default)]
    pub size: u64,

    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// An uploaded background audio asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAsset {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub duration: f64,
}

/// One marketing script variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,

    /// Narration text.
    pub content: String,

    /// Only selected scripts are rendered.
    #[serde(default)]
    pub selected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Target clip length class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DurationClass {
    #[serde(rename = "15s")]
    Short,
    #[default]
    #[serde(rename = "30s")]
    Standard,
    /// Random length in `[30, 60)` seconds per clip.
    #[serde(rename = "30-60s")]
    Variable,
    /// Any value this build does not know about.
    #[serde(other)]
    Unknown,
}

/// Narration voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Male,
    #[default]
    Female,
}

impl Voice {
    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Male => "male",
            Voice::Female => "female",
        }
    }
}

/// Caption styling for title and subtitle text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    pub title: TextStyle,
    pub subtitle: TextStyle,
}

/// Styling for one caption line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Hex color, e.g. `#ffffff`.
    pub color: String,
    pub position: TextPosition,
    pub font_size: u32,
}

/// Vertical placement of a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    Center,
    Bottom,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            title: TextStyle {
                color: "#ffffff".to_string(),
                position: TextPosition::Top,
                font_size: 24,
            },
            subtitle: TextStyle {
                color: "#ffffff".to_string(),
                position: TextPosition::Bottom,
                font_size: 18,
            },
        }
    }
}

fn default_video_count() -> u32 {
    3
}

impl Project {
    /// Create an empty project with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            videos: vec![],
            audios: vec![],
            scripts: vec![],
            duration: DurationClass::default(),
            video_count: default_video_count(),
            voice: Voice::default(),
            style: StyleConfig::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Selected scripts in list order.
    pub fn selected_scripts(&self) -> Vec<&Script> {
        self.scripts.iter().filter(|s| s.selected).collect()
    }

    /// Number of clips a generation run renders: `min(video_count, selected)`.
    pub fn planned_clip_count(&self) -> usize {
        (self.video_count as usize).min(self.selected_scripts().len())
    }

    /// Problems that prevent starting a generation run.
    pub fn generation_issues(&self) -> Vec<String> {
        let mut issues = vec![];
        if self.videos.is_empty() {
            issues.push("project has no video assets".to_string());
        }
        if self.selected_scripts().is_empty() {
            issues.push("select at least one script".to_string());
        }
        if self.video_count == 0 {
            issues.push("videoCount must be at least 1".to_string());
        }
        issues
    }

    /// Read a project document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the project document as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors that can occur when working with project documents.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}
