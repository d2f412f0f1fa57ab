//! Howzit - a build notes reader and runner
//!
//! Howzit reads a project's markdown build notes, splits them into topics and
//! runs the executable directives inside a topic in order, honoring
//! conditional blocks that are re-evaluated as tasks change state.

// Public modules
pub mod cli;
pub mod config;
pub mod directive;
pub mod error;
pub mod notes;
pub mod runner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, ExecutionError};
