//! Render failures.

use std::path::PathBuf;

use mixcut_common::error::MixcutError;

/// Why a single clip could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Transcode failed: {message}")]
    Transcode { message: String },

    #[error("Upload failed: {message}")]
    Upload { message: String },

    #[error("Missing input: {message}")]
    MissingInput { message: String },

    #[error("{tool} is not available")]
    Unavailable { tool: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload {
            message: msg.into(),
        }
    }
}

impl From<RenderError> for MixcutError {
    fn from(err: RenderError) -> Self {
        MixcutError::render(err.to_string())
    }
}
