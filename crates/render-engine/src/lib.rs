//! MixCut Render Engine
//!
//! Renders one marketing clip per script and publishes it.
//!
//! # Pipeline
//!
//! ```text
//! project videos ───┐
//! random bgm track ─┼── ffmpeg (scale/pad 1920x1080, 30fps, -t duration)
//! speech (optional) ┘          │
//!                              ▼
//!                  scratch/output_<n>_<uuid>.mp4
//!                              │
//!                              ▼
//!                 object store: generated/<uuid>.mp4 ──► URL
//! ```
//!
//! The scratch file is deleted when the render finishes, whatever the
//! outcome, and is registered as in-flight until then so the sweeper
//! leaves it alone.

pub mod error;
pub mod renderer;
pub mod scratch;
pub mod speech;
pub mod storage;
pub mod transcode;

pub use error::*;
pub use renderer::*;
pub use scratch::*;
pub use speech::*;
pub use storage::*;
pub use transcode::*;
