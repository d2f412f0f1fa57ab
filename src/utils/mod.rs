//! Small shared helpers

pub mod platform;
pub mod shell;

pub use platform::*;
pub use shell::*;
