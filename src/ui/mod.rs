//! Terminal interaction
//!
//! Level-gated console logging, confirmation prompts and run reporting.

pub mod console;
pub mod prompt;

// Re-export main types
pub use console::*;
pub use prompt::*;
