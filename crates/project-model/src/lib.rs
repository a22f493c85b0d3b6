//! MixCut Project Model
//!
//! Defines the core data contracts for MixCut:
//! - **Project:** Source assets, script variants, and clip settings
//! - **Task:** One generation request and its lifecycle state machine
//! - **Stores:** Async persistence seams for tasks and projects, with
//!   in-memory and JSON-directory backends

pub mod project;
pub mod store;
pub mod task;

pub use project::*;
pub use store::*;
pub use task::*;
