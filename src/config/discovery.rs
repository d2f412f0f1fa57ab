//! Build notes discovery

use crate::error::{ConfigError, ConfigResult};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

/// Note file stems, in order of preference
const NOTE_STEMS: &[&str] = &["buildnotes", "build-notes", "build_notes", "howzit"];

/// Accepted note file extensions
const NOTE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Find the notes file in a single directory
pub fn find_note_in(dir: &Path) -> Option<PathBuf> {
    let escaped = Pattern::escape(&dir.to_string_lossy());

    for stem in NOTE_STEMS {
        let pattern = format!("{}/{}.*", escaped, stem);
        let Ok(paths) = glob::glob_with(&pattern, MATCH_OPTIONS) else {
            continue;
        };

        let mut matches: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file() && has_note_extension(p))
            .collect();
        matches.sort();

        if let Some(found) = matches.into_iter().next() {
            return Some(found);
        }
    }

    None
}

fn has_note_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| NOTE_EXTENSIONS.iter().any(|n| e.eq_ignore_ascii_case(n)))
}

/// Every notes file from `start_dir` up to the filesystem root, nearest first
pub fn find_notes_from(start_dir: &Path) -> Vec<PathBuf> {
    start_dir.ancestors().filter_map(find_note_in).collect()
}

/// Find the nearest notes file by searching a directory and its parents
pub fn find_note_from(start_dir: &Path) -> ConfigResult<PathBuf> {
    find_notes_from(start_dir)
        .into_iter()
        .next()
        .ok_or_else(|| ConfigError::NotFound(format!("{} and its parents", start_dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_note_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let note_path = temp_dir.path().join("buildnotes.md");
        fs::write(&note_path, "## Build\n").unwrap();

        assert_eq!(find_note_from(temp_dir.path()).unwrap(), note_path);
    }

    #[test]
    fn test_find_note_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let note_path = temp_dir.path().join("BuildNotes.markdown");
        fs::write(&note_path, "## Build\n").unwrap();

        assert_eq!(find_note_in(temp_dir.path()), Some(note_path));
    }

    #[test]
    fn test_stem_preference() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("howzit.md"), "").unwrap();
        fs::write(temp_dir.path().join("build_notes.txt"), "").unwrap();

        assert_eq!(
            find_note_in(temp_dir.path()),
            Some(temp_dir.path().join("build_notes.txt"))
        );
    }

    #[test]
    fn test_other_extensions_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("buildnotes.bak"), "").unwrap();
        assert_eq!(find_note_in(temp_dir.path()), None);
    }

    #[test]
    fn test_find_note_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let note_path = temp_dir.path().join("buildnotes.md");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(&note_path, "## Build\n").unwrap();

        assert_eq!(find_note_from(&sub_dir).unwrap(), note_path);
    }

    #[test]
    fn test_find_notes_nearest_first() {
        let temp_dir = TempDir::new().unwrap();
        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let far = temp_dir.path().join("buildnotes.md");
        let near = sub_dir.join("howzit.md");
        fs::write(&far, "").unwrap();
        fs::write(&near, "").unwrap();

        let found = find_notes_from(&sub_dir);
        assert_eq!(&found[..2], &[near, far]);
    }

    #[test]
    fn test_note_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&empty).unwrap();

        // Only meaningful when nothing above the temp dir has notes
        if find_notes_from(temp_dir.path()).is_empty() {
            let result = find_note_from(&empty);
            assert!(matches!(result, Err(ConfigError::NotFound(_))));
        }
    }
}
