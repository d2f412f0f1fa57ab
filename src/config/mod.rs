//! Settings and build notes discovery
//!
//! This module loads the user's `howzit.yaml` settings and locates the
//! build notes file(s) for a directory.

pub mod discovery;
pub mod settings;

// Re-export main types
pub use discovery::*;
pub use settings::*;
