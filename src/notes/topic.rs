//! A single topic of a build note

use crate::directive::{self, Directive, TaskSpec};
use crate::runner::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static TITLE_ARGS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*\(([^()]*)\)\s*$").unwrap());

/// A named argument declared in a topic title: `## Deploy (env:staging)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicArg {
    pub name: String,
    pub default: Option<String>,
}

/// One `##` section of a build note
#[derive(Debug, Clone)]
pub struct Topic {
    /// Title with any argument list removed
    pub title: String,

    /// Raw markdown body
    pub content: String,

    /// Arguments declared in the title, in positional order
    pub arguments: Vec<TopicArg>,

    pub directives: Vec<Directive>,

    /// `@before` blocks
    pub prereqs: Vec<String>,

    /// `@after` blocks
    pub postreqs: Vec<String>,

    /// Note or template file the topic was read from
    pub source_file: Option<PathBuf>,
}

impl Topic {
    /// Build a topic from its header text and body
    pub fn new(header: &str, content: &str, source_file: Option<PathBuf>) -> Self {
        let (title, arguments) = parse_title(header);
        let parsed = directive::parse(content);

        Topic {
            title,
            content: content.trim().to_string(),
            arguments,
            directives: parsed.directives,
            prereqs: parsed.prereqs,
            postreqs: parsed.postreqs,
            source_file,
        }
    }

    /// Every task directive, regardless of conditionals
    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.directives.iter().filter_map(|d| d.task())
    }

    pub fn is_runnable(&self) -> bool {
        self.tasks().next().is_some()
    }

    pub fn has_conditionals(&self) -> bool {
        self.directives.iter().any(|d| d.kind.is_conditional())
    }

    /// Bind title arguments from positional arguments or their defaults
    pub fn bind_arguments(&self, ctx: &mut Context) {
        for (idx, arg) in self.arguments.iter().enumerate() {
            let value = ctx.args.get(idx).cloned().or_else(|| arg.default.clone());
            if let Some(value) = value {
                ctx.set_var(arg.name.clone(), value);
            }
        }
    }
}

/// Split `Title (a:1, b)` into the clean title and its arguments
pub fn parse_title(header: &str) -> (String, Vec<TopicArg>) {
    let header = header.trim();
    let Some(caps) = TITLE_ARGS_RE.captures(header) else {
        return (header.to_string(), Vec::new());
    };

    let arguments = caps[2]
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| match a.split_once(':') {
            Some((name, default)) => TopicArg {
                name: name.trim().to_string(),
                default: Some(default.trim().to_string()),
            },
            None => TopicArg {
                name: a.to_string(),
                default: None,
            },
        })
        .collect();

    (caps[1].trim().to_string(), arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_without_arguments() {
        let (title, args) = parse_title("Build Project");
        assert_eq!(title, "Build Project");
        assert!(args.is_empty());
    }

    #[test]
    fn test_parse_title_with_arguments() {
        let (title, args) = parse_title("Deploy (env:staging, region)");
        assert_eq!(title, "Deploy");
        assert_eq!(
            args,
            vec![
                TopicArg {
                    name: "env".to_string(),
                    default: Some("staging".to_string())
                },
                TopicArg {
                    name: "region".to_string(),
                    default: None
                },
            ]
        );
    }

    #[test]
    fn test_bind_arguments() {
        let topic = Topic::new("Deploy (env:staging, region, zone:a)", "", None);
        let mut ctx = Context::new().with_args(vec!["production".to_string()]);
        topic.bind_arguments(&mut ctx);

        assert_eq!(ctx.get_var("env"), Some(&"production".to_string()));
        assert_eq!(ctx.get_var("region"), None);
        assert_eq!(ctx.get_var("zone"), Some(&"a".to_string()));
    }

    #[test]
    fn test_topic_tasks_and_requirements() {
        let body = "@before\nHave creds\n@end\n@if x\n@run(one)\n@end\n```run\necho two\n```";
        let topic = Topic::new("Release", body, None);

        assert!(topic.is_runnable());
        assert!(topic.has_conditionals());
        assert_eq!(topic.tasks().count(), 2);
        assert_eq!(topic.prereqs, vec!["Have creds"]);
    }

    #[test]
    fn test_plain_topic() {
        let topic = Topic::new("Notes", "Just text.\n", None);
        assert!(!topic.is_runnable());
        assert!(!topic.has_conditionals());
        assert_eq!(topic.content, "Just text.");
    }
}
