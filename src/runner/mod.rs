//! Topic execution engine
//!
//! This module handles running a topic's directives: condition evaluation,
//! variable substitution, task execution and the script side channel.

pub mod comm;
pub mod command;
pub mod condition;
pub mod context;
pub mod engine;
pub mod interpolate;
pub mod script;
pub mod task;
pub mod variables;

// Re-export main types
pub use comm::*;
pub use command::*;
pub use condition::*;
pub use context::*;
pub use engine::*;
pub use interpolate::*;
pub use task::*;
pub use variables::*;
