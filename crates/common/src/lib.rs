//! MixCut Common
//!
//! Pieces every MixCut crate and the CLI share: the [`MixcutError`] type,
//! the layered [`AppConfig`], and tracing setup.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
