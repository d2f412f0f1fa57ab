//! Common test utilities

#![allow(dead_code)]

use howzit::notes::BuildNote;
use howzit::runner::Context;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a buildnotes.md file
pub fn create_test_note(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let note_path = temp_dir.path().join("buildnotes.md");
    fs::write(&note_path, content).unwrap();
    (temp_dir, note_path)
}

/// Create a note in the temp root and a second one in a subdirectory
pub fn create_stacked_notes(root: &str, nested: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let sub_dir = temp_dir.path().join("project");

    fs::write(temp_dir.path().join("buildnotes.md"), root).unwrap();
    fs::create_dir(&sub_dir).unwrap();
    fs::write(sub_dir.join("buildnotes.md"), nested).unwrap();

    (temp_dir, sub_dir)
}

/// Parse a note from a string
pub fn note(content: &str) -> BuildNote {
    BuildNote::parse(content, None)
}

/// A context that runs in `dir` and answers every prompt with its default
pub fn context_in(dir: &TempDir) -> Context {
    Context::new().with_working_dir(dir.path().to_path_buf())
}

/// Titles of the tasks recorded in the run log
pub fn ran(ctx: &Context) -> Vec<String> {
    ctx.run_log.iter().map(|e| e.task_title.clone()).collect()
}
