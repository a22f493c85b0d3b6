//! MixCut Generation Pipeline
//!
//! Turns a generation request into published clips:
//!
//! ```text
//! submit(project) ──► Task(pending) ──► queue ──► worker pool (N permits)
//!                                                     │
//!                                                     ▼
//!                                          GenerationCoordinator::run
//!                                   processing ─► render selected[0..n]
//!                                                     │
//!                                                     ▼
//!                                        completed { videos, previewUrl }
//!                                             or failed { error }
//! ```
//!
//! [`GenerationRuntime`] owns the worker pool and the scratch sweeper and
//! stops both on shutdown.

pub mod coordinator;
pub mod queue;
pub mod runtime;
pub mod sweeper;

pub use coordinator::*;
pub use queue::*;
pub use runtime::*;
pub use sweeper::*;
