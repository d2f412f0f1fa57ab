//! Build notes: markdown files split into topics
//!
//! A note is parsed once into [`Topic`]s, each carrying its parsed directive
//! list. Notes can be stacked (merged from parent directories) and can pull
//! in topics from templates.

pub mod buildnote;
pub mod topic;

// Re-export main types
pub use buildnote::*;
pub use topic::*;
