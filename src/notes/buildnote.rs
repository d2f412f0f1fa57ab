//! Build note parsing and topic lookup

use crate::error::{ConfigError, ConfigResult};
use crate::notes::Topic;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

static METADATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9 _-]*):\s*(.*?)\s*$").unwrap());
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*```").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[%([A-Za-z0-9_ -]+)\]").unwrap());

/// A parsed build notes file
#[derive(Debug, Clone, Default)]
pub struct BuildNote {
    /// Text of the leading `# ` header, if any
    pub title: Option<String>,

    /// Leading `key: value` lines, keys lower-cased
    pub metadata: HashMap<String, String>,

    pub topics: Vec<Topic>,

    /// File this note was read from
    pub path: Option<PathBuf>,
}

impl BuildNote {
    /// Parse note text
    pub fn parse(text: &str, path: Option<&Path>) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let (metadata, body_start) = parse_metadata(&lines);

        let mut note = BuildNote {
            title: None,
            metadata,
            topics: Vec::new(),
            path: path.map(Path::to_path_buf),
        };

        let mut current: Option<(String, Vec<&str>)> = None;
        let mut in_fence = false;

        for line in &lines[body_start..] {
            if FENCE_RE.is_match(line) {
                in_fence = !in_fence;
            }

            let header = if in_fence { None } else { HEADER_RE.captures(line) };
            match header {
                Some(caps) => {
                    let level = caps[1].len();
                    let text = caps[2].to_string();
                    if level == 1 && note.title.is_none() && note.topics.is_empty() && current.is_none() {
                        note.title = Some(text);
                        continue;
                    }
                    if let Some((title, body)) = current.take() {
                        note.push_topic(&title, &body.join("\n"));
                    }
                    current = Some((text, Vec::new()));
                }
                None => {
                    if let Some((_, body)) = current.as_mut() {
                        body.push(line);
                    }
                }
            }
        }

        if let Some((title, body)) = current {
            note.push_topic(&title, &body.join("\n"));
        }

        note
    }

    fn push_topic(&mut self, header: &str, body: &str) {
        let body = self.replace_placeholders(body);
        self.topics.push(Topic::new(header, &body, self.path.clone()));
    }

    /// Replace `[%key]` with metadata values; unknown keys are left alone
    fn replace_placeholders(&self, body: &str) -> String {
        if self.metadata.is_empty() {
            return body.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(body, |caps: &regex::Captures| {
                self.metadata
                    .get(&caps[1].trim().to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Read and parse a note file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadNote {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(Self::parse(&text, Some(path)))
    }

    /// Load several notes, nearest first, merging topics into the first
    pub fn load_stack(paths: &[PathBuf]) -> ConfigResult<Self> {
        let mut iter = paths.iter();
        let first = iter
            .next()
            .ok_or_else(|| ConfigError::NotFound("no note files given".to_string()))?;

        let mut note = Self::load(first)?;
        for path in iter {
            note.merge(Self::load(path)?);
        }
        Ok(note)
    }

    /// Add the other note's topics whose titles are not already present
    pub fn merge(&mut self, other: BuildNote) {
        for (key, value) in other.metadata {
            self.metadata.entry(key).or_insert(value);
        }
        for topic in other.topics {
            if !self.has_topic(&topic.title) {
                self.topics.push(topic);
            }
        }
    }

    /// Template names listed in the `template` metadata key
    pub fn template_names(&self) -> Vec<String> {
        self.metadata
            .get("template")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merge topics from `<template_dir>/<name>.md` for each listed template
    ///
    /// Returns the names of templates that could not be found.
    pub fn apply_templates(&mut self, template_dir: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for name in self.template_names() {
            let path = template_dir.join(format!("{}.md", name));
            match Self::load(&path) {
                Ok(template) => {
                    for topic in template.topics {
                        if !self.has_topic(&topic.title) {
                            self.topics.push(topic);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("template '{}' not loaded: {}", name, e);
                    missing.push(name);
                }
            }
        }

        missing
    }

    fn has_topic(&self, title: &str) -> bool {
        self.topics.iter().any(|t| t.title.eq_ignore_ascii_case(title))
    }

    /// Find topics by title
    ///
    /// An exact (case-insensitive) match wins, then titles starting with the
    /// term, then titles containing it.
    pub fn find_topic(&self, term: &str) -> Vec<&Topic> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let exact: Vec<&Topic> = self
            .topics
            .iter()
            .filter(|t| t.title.to_lowercase() == term)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let prefix: Vec<&Topic> = self
            .topics
            .iter()
            .filter(|t| t.title.to_lowercase().starts_with(&term))
            .collect();
        if !prefix.is_empty() {
            return prefix;
        }

        self.topics
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&term))
            .collect()
    }

    pub fn topic_titles(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.title.as_str()).collect()
    }

    /// Topics with at least one task
    pub fn runnable_topics(&self) -> Vec<&Topic> {
        self.topics.iter().filter(|t| t.is_runnable()).collect()
    }
}

/// Leading metadata lines; returns the map and the index where the body starts
fn parse_metadata(lines: &[&str]) -> (HashMap<String, String>, usize) {
    let mut metadata = HashMap::new();

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            return (metadata, idx);
        }
        match METADATA_RE.captures(line) {
            Some(caps) if !line.starts_with('#') => {
                metadata.insert(caps[1].trim().to_lowercase(), caps[2].to_string());
            }
            _ => return (metadata, idx),
        }
    }

    (metadata, lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOTE: &str = "project: widget\nauthor: Sam\n\n# Widget\n\nIntro text.\n\n## Build\n\n@run(make [%project])\n\n```bash\n## not a topic\n```\n\n### Test Suite\n\n@run(make test)\n\n## Notes\n\nNothing to run.\n";

    #[test]
    fn test_parse_metadata_and_title() {
        let note = BuildNote::parse(NOTE, None);
        assert_eq!(note.title, Some("Widget".to_string()));
        assert_eq!(note.metadata.get("project"), Some(&"widget".to_string()));
        assert_eq!(note.metadata.get("author"), Some(&"Sam".to_string()));
    }

    #[test]
    fn test_topics_split_on_headers_outside_fences() {
        let note = BuildNote::parse(NOTE, None);
        assert_eq!(note.topic_titles(), vec!["Build", "Test Suite", "Notes"]);
        assert!(note.topics[0].content.contains("## not a topic"));
    }

    #[test]
    fn test_metadata_placeholders() {
        let note = BuildNote::parse(NOTE, None);
        let spec = note.topics[0].tasks().next().unwrap();
        assert_eq!(spec.action, "make widget");
    }

    #[test]
    fn test_note_without_metadata() {
        let note = BuildNote::parse("## Only\n\n@run(ls)\n", None);
        assert!(note.metadata.is_empty());
        assert_eq!(note.title, None);
        assert_eq!(note.topics.len(), 1);
    }

    #[test]
    fn test_find_topic_ordering() {
        let note = BuildNote::parse("## Build\n\n## Build All\n\n## Rebuild\n", None);

        let exact = note.find_topic("build");
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].title, "Build");

        let prefix = note.find_topic("build a");
        assert_eq!(prefix[0].title, "Build All");

        let contains = note.find_topic("ebui");
        assert_eq!(contains[0].title, "Rebuild");

        assert!(note.find_topic("deploy").is_empty());
        assert!(note.find_topic("  ").is_empty());
    }

    #[test]
    fn test_runnable_topics() {
        let note = BuildNote::parse(NOTE, None);
        let runnable: Vec<&str> = note.runnable_topics().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(runnable, vec!["Build", "Test Suite"]);
    }

    #[test]
    fn test_merge_keeps_nearest_topics() {
        let mut near = BuildNote::parse("## Build\n\n@run(near)\n", Some(Path::new("/a/buildnotes.md")));
        let far = BuildNote::parse("## Build\n\n@run(far)\n\n## Lint\n", Some(Path::new("/buildnotes.md")));
        near.merge(far);

        assert_eq!(near.topic_titles(), vec!["Build", "Lint"]);
        assert_eq!(near.topics[0].tasks().next().unwrap().action, "near");
        assert_eq!(near.topics[1].source_file, Some(PathBuf::from("/buildnotes.md")));
    }

    #[test]
    fn test_apply_templates() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("rust.md"),
            "## Build\n\n@run(cargo build)\n\n## Clippy\n\n@run(cargo clippy)\n",
        )
        .unwrap();

        let mut note = BuildNote::parse("template: rust, missing\n\n## Build\n\n@run(make)\n", None);
        let missing = note.apply_templates(temp_dir.path());

        assert_eq!(missing, vec!["missing"]);
        assert_eq!(note.topic_titles(), vec!["Build", "Clippy"]);
        assert_eq!(note.topics[0].tasks().next().unwrap().action, "make");
        assert_eq!(note.topics[1].source_file, Some(temp_dir.path().join("rust.md")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = BuildNote::load(Path::new("/nonexistent/howzit/buildnotes.md"));
        assert!(matches!(result, Err(ConfigError::ReadNote { .. })));
    }
}
