//! Directive extraction from topic bodies
//!
//! Each line is classified once into a [`Line`] and fed to a small state
//! machine that tracks fenced blocks, `@before`/`@after` blocks and the stack
//! of open conditionals.

use crate::directive::{Directive, DirectiveKind, TaskSpec, TaskType};
use crate::ui::LogLevel;
use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*```\s*(\S*?)([!?]*)(?:\s+(.*?))?\s*$").unwrap());
static TASK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]\s+)?@(include|run|copy|open|url)([!?]{0,2})\(").unwrap());
static CONDITION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@(if|unless|elsif)\s+(.+?)\s*$").unwrap());
static ELSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@else\s*$").unwrap());
static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@end\s*$").unwrap());
static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@(before|after)\s*$").unwrap());
static LOG_LEVEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@log_level\(\s*([^)]*?)\s*\)\s*$").unwrap());
static SET_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@set_var\((.*)\)\s*$").unwrap());
static VAR_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
static INCLUDE_ARGS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*\[(.*)\]\s*$").unwrap());

/// Result of parsing one topic body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBody {
    pub directives: Vec<Directive>,
    pub prereqs: Vec<String>,
    pub postreqs: Vec<String>,
}

/// Parse a topic body into directives plus prerequisite/postrequisite text
pub fn parse(body: &str) -> ParsedBody {
    let (prereqs, postreqs) = extract_requirements(body);
    ParsedBody {
        directives: parse_directives(body),
        prereqs,
        postreqs,
    }
}

/// Classification of a single source line
#[derive(Debug, PartialEq)]
enum Line<'a> {
    /// Opening or closing code fence; `lang` is empty for a bare fence
    Fence {
        lang: &'a str,
        markers: &'a str,
        title: &'a str,
    },
    Open {
        negated: bool,
        condition: &'a str,
    },
    Elsif(&'a str),
    Else,
    End,
    Requirement,
    Task {
        name: &'a str,
        markers: &'a str,
        action: &'a str,
        title: &'a str,
    },
    LogLevel(&'a str),
    SetVar(&'a str),
    Text,
}

fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = FENCE_RE.captures(line) {
        return Line::Fence {
            lang: caps.get(1).map_or("", |m| m.as_str()),
            markers: caps.get(2).map_or("", |m| m.as_str()),
            title: caps.get(3).map_or("", |m| m.as_str()),
        };
    }

    if let Some(caps) = TASK_RE.captures(line) {
        let whole = caps.get(0).map_or(0, |m| m.end());
        if let Some(close) = find_closing_paren(line, whole) {
            return Line::Task {
                name: caps.get(1).map_or("", |m| m.as_str()),
                markers: caps.get(2).map_or("", |m| m.as_str()),
                action: line[whole..close].trim(),
                title: line[close + 1..].trim(),
            };
        }
        return Line::Text;
    }

    if let Some(caps) = CONDITION_RE.captures(line) {
        let condition = caps.get(2).map_or("", |m| m.as_str());
        return match caps.get(1).map_or("", |m| m.as_str()) {
            "if" => Line::Open {
                negated: false,
                condition,
            },
            "unless" => Line::Open {
                negated: true,
                condition,
            },
            _ => Line::Elsif(condition),
        };
    }

    if ELSE_RE.is_match(line) {
        return Line::Else;
    }
    if END_RE.is_match(line) {
        return Line::End;
    }
    if REQUIREMENT_RE.is_match(line) {
        return Line::Requirement;
    }
    if let Some(caps) = LOG_LEVEL_RE.captures(line) {
        return Line::LogLevel(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = SET_VAR_RE.captures(line) {
        return Line::SetVar(caps.get(1).map_or("", |m| m.as_str()));
    }

    Line::Text
}

/// Index of the `)` closing a paren opened just before `start`
///
/// Nested parens and quoted text are skipped.
fn find_closing_paren(line: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in line[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(q) if q == c => quote = None,
                None => quote = Some(c),
                _ => {}
            },
            '(' if quote.is_none() => depth += 1,
            ')' if quote.is_none() => {
                if depth == 0 {
                    return Some(start + offset);
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    // An unbalanced quote (e.g. an apostrophe) shouldn't hide the closer
    if quote.is_some() {
        return line.rfind(')').filter(|&i| i >= start);
    }
    None
}

/// `?` asks with a default of yes, `!` asks with a default of no
fn optional_flags(markers: &str) -> (bool, bool) {
    (!markers.is_empty(), !markers.contains('!'))
}

enum ScanState {
    Text,
    /// Inside a ```run block
    RunBlock {
        line_number: usize,
        markers: String,
        title: String,
        body: Vec<String>,
    },
    /// Inside any other fenced code block
    Fence,
    /// Inside `@before`/`@after` .. `@end`
    Requirement,
}

/// Scan a topic body into an ordered directive list
pub fn parse_directives(body: &str) -> Vec<Directive> {
    let mut directives: Vec<Directive> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut state = ScanState::Text;

    for (idx, raw) in body.lines().enumerate() {
        let line_number = idx + 1;
        let line = classify(raw);

        state = match state {
            ScanState::RunBlock {
                line_number: start,
                markers,
                title,
                mut body,
            } => {
                if matches!(line, Line::Fence { lang: "", markers: "", title: "" }) {
                    directives.push(Directive::new(
                        DirectiveKind::Task(block_task(&markers, &title, body.join("\n"))),
                        start,
                        stack.clone(),
                    ));
                    ScanState::Text
                } else {
                    body.push(raw.to_string());
                    ScanState::RunBlock {
                        line_number: start,
                        markers,
                        title,
                        body,
                    }
                }
            }
            ScanState::Fence => match line {
                Line::Fence { lang: "", .. } => ScanState::Text,
                _ => ScanState::Fence,
            },
            ScanState::Requirement => match line {
                Line::End => ScanState::Text,
                _ => ScanState::Requirement,
            },
            ScanState::Text => scan_line(line, line_number, &mut directives, &mut stack),
        };
    }

    if let ScanState::RunBlock { line_number, .. } = state {
        tracing::debug!(line_number, "unterminated run block dropped");
    }
    if !stack.is_empty() {
        tracing::debug!(open = stack.len(), "conditionals left open at end of topic");
    }

    directives
}

fn scan_line(
    line: Line<'_>,
    line_number: usize,
    directives: &mut Vec<Directive>,
    stack: &mut Vec<usize>,
) -> ScanState {
    match line {
        Line::Fence {
            lang: "run",
            markers,
            title,
        } => {
            return ScanState::RunBlock {
                line_number,
                markers: markers.to_string(),
                title: title.to_string(),
                body: Vec::new(),
            }
        }
        Line::Fence { .. } => return ScanState::Fence,
        Line::Requirement => return ScanState::Requirement,
        Line::Open { negated, condition } => {
            let kind = if negated {
                DirectiveKind::Unless(condition.to_string())
            } else {
                DirectiveKind::If(condition.to_string())
            };
            directives.push(Directive::new(kind, line_number, stack.clone()));
            stack.push(directives.len() - 1);
        }
        Line::Elsif(_) | Line::Else => {
            if stack.is_empty() {
                tracing::debug!(line_number, "branch without an open conditional ignored");
                return ScanState::Text;
            }
            let kind = match line {
                Line::Elsif(condition) => DirectiveKind::Elsif(condition.to_string()),
                _ => DirectiveKind::Else,
            };
            let path = stack[..stack.len() - 1].to_vec();
            directives.push(Directive::new(kind, line_number, path));
            if let Some(top) = stack.last_mut() {
                *top = directives.len() - 1;
            }
        }
        Line::End => {
            if stack.pop().is_some() {
                directives.push(Directive::new(DirectiveKind::End, line_number, stack.clone()));
            } else {
                tracing::debug!(line_number, "unmatched @end ignored");
            }
        }
        Line::Task {
            name,
            markers,
            action,
            title,
        } => {
            if let Some(spec) = line_task(name, markers, action, title) {
                directives.push(Directive::new(DirectiveKind::Task(spec), line_number, stack.clone()));
            }
        }
        Line::LogLevel(level) => match level.parse::<LogLevel>() {
            Ok(level) => directives.push(Directive::new(
                DirectiveKind::LogLevel(level),
                line_number,
                stack.clone(),
            )),
            Err(e) => tracing::debug!(line_number, "ignoring @log_level: {}", e),
        },
        Line::SetVar(inner) => {
            if let Some((name, value)) = split_set_var(inner) {
                directives.push(Directive::new(
                    DirectiveKind::SetVar { name, value },
                    line_number,
                    stack.clone(),
                ));
            } else {
                tracing::debug!(line_number, "invalid @set_var dropped");
            }
        }
        Line::Text => {}
    }
    ScanState::Text
}

fn split_set_var(inner: &str) -> Option<(String, String)> {
    let (name, value) = inner.split_once(',')?;
    let name = name.trim();
    if !VAR_NAME_RE.is_match(name) {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

fn block_task(markers: &str, title: &str, body: String) -> TaskSpec {
    let (optional, default_answer) = optional_flags(markers);
    TaskSpec {
        task_type: TaskType::Block,
        title: if title.is_empty() {
            "Block".to_string()
        } else {
            title.to_string()
        },
        action: body,
        arguments: Vec::new(),
        optional,
        default_answer,
    }
}

fn line_task(name: &str, markers: &str, action: &str, title: &str) -> Option<TaskSpec> {
    let task_type = TaskType::from_directive_name(name)?;
    let (optional, default_answer) = optional_flags(markers);

    let (action, arguments) = if task_type == TaskType::Include {
        split_include_arguments(action)
    } else {
        (action.to_string(), Vec::new())
    };

    let title = if title.is_empty() {
        action.clone()
    } else {
        title.to_string()
    };

    Some(TaskSpec {
        task_type,
        title,
        action,
        arguments,
        optional,
        default_answer,
    })
}

/// Split `Topic Name [a, b]` into the topic name and its arguments
pub fn split_include_arguments(action: &str) -> (String, Vec<String>) {
    match INCLUDE_ARGS_RE.captures(action) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let args = caps
                .get(2)
                .map_or("", |m| m.as_str())
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            (name, args)
        }
        None => (action.trim().to_string(), Vec::new()),
    }
}

/// Collect `@before` and `@after` block text from the raw body
pub fn extract_requirements(body: &str) -> (Vec<String>, Vec<String>) {
    let mut prereqs = Vec::new();
    let mut postreqs = Vec::new();
    let mut current: Option<(bool, Vec<&str>)> = None;

    for line in body.lines() {
        match current.take() {
            Some((is_before, lines)) => {
                if END_RE.is_match(line) {
                    let text = lines.join("\n").trim().to_string();
                    if !text.is_empty() {
                        if is_before {
                            prereqs.push(text);
                        } else {
                            postreqs.push(text);
                        }
                    }
                } else {
                    let mut lines = lines;
                    lines.push(line);
                    current = Some((is_before, lines));
                }
            }
            None => {
                if REQUIREMENT_RE.is_match(line) {
                    current = Some((line.trim() == "@before", Vec::new()));
                }
            }
        }
    }

    (prereqs, postreqs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(directives: &[Directive]) -> Vec<&'static str> {
        directives
            .iter()
            .map(|d| match d.kind {
                DirectiveKind::If(_) => "if",
                DirectiveKind::Unless(_) => "unless",
                DirectiveKind::Elsif(_) => "elsif",
                DirectiveKind::Else => "else",
                DirectiveKind::End => "end",
                DirectiveKind::Task(_) => "task",
                DirectiveKind::LogLevel(_) => "log_level",
                DirectiveKind::SetVar { .. } => "set_var",
            })
            .collect()
    }

    #[test]
    fn test_classify_task_with_nested_parens() {
        let line = classify("@run(echo $(date) && ls) List files");
        assert_eq!(
            line,
            Line::Task {
                name: "run",
                markers: "",
                action: "echo $(date) && ls",
                title: "List files",
            }
        );
    }

    #[test]
    fn test_classify_escaped_directive_is_text() {
        assert_eq!(classify(r"\@run(ls)"), Line::Text);
        assert_eq!(classify("Use @run(ls) inline"), Line::Text);
    }

    #[test]
    fn test_run_task_defaults() {
        let directives = parse_directives("@run(make test)");
        let spec = directives[0].task().unwrap();
        assert_eq!(spec.task_type, TaskType::Run);
        assert_eq!(spec.title, "make test");
        assert_eq!(spec.action, "make test");
        assert!(!spec.optional);
    }

    #[test]
    fn test_optional_markers() {
        let directives = parse_directives("@run?(ls) Maybe\n@copy!(secret) Careful");
        let first = directives[0].task().unwrap();
        assert!(first.optional);
        assert!(first.default_answer);

        let second = directives[1].task().unwrap();
        assert_eq!(second.task_type, TaskType::Copy);
        assert!(second.optional);
        assert!(!second.default_answer);
    }

    #[test]
    fn test_fenced_run_block() {
        let body = "Intro\n```run? Setup\n#!/bin/bash\necho hi\n```\nOutro";
        let directives = parse_directives(body);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].line_number, 2);

        let spec = directives[0].task().unwrap();
        assert_eq!(spec.task_type, TaskType::Block);
        assert_eq!(spec.title, "Setup");
        assert_eq!(spec.action, "#!/bin/bash\necho hi");
        assert!(spec.optional);
    }

    #[test]
    fn test_directives_in_other_fences_are_ignored() {
        let body = "```bash\n@run(ls)\n```\n@run(pwd)";
        let directives = parse_directives(body);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].task().unwrap().action, "pwd");
    }

    #[test]
    fn test_conditional_paths() {
        let body = "@if a\n@run(one)\n@if b\n@run(two)\n@end\n@run(three)\n@end\n@run(four)";
        let directives = parse_directives(body);
        assert_eq!(
            kinds(&directives),
            vec!["if", "task", "if", "task", "end", "task", "end", "task"]
        );
        assert_eq!(directives[0].conditional_path, Vec::<usize>::new());
        assert_eq!(directives[1].conditional_path, vec![0]);
        assert_eq!(directives[2].conditional_path, vec![0]);
        assert_eq!(directives[3].conditional_path, vec![0, 2]);
        assert_eq!(directives[5].conditional_path, vec![0]);
        assert_eq!(directives[7].conditional_path, Vec::<usize>::new());
    }

    #[test]
    fn test_else_branch_is_gated_by_branch_node() {
        let body = "@if a\n@run(one)\n@elsif b\n@run(two)\n@else\n@run(three)\n@end";
        let directives = parse_directives(body);
        assert_eq!(
            kinds(&directives),
            vec!["if", "task", "elsif", "task", "else", "task", "end"]
        );
        assert_eq!(directives[1].conditional_path, vec![0]);
        assert_eq!(directives[2].conditional_path, Vec::<usize>::new());
        assert_eq!(directives[3].conditional_path, vec![2]);
        assert_eq!(directives[5].conditional_path, vec![4]);
    }

    #[test]
    fn test_unmatched_end_is_ignored() {
        let directives = parse_directives("@end\n@run(ls)");
        assert_eq!(kinds(&directives), vec!["task"]);
        assert!(directives[0].conditional_path.is_empty());
    }

    #[test]
    fn test_set_var_name_validation() {
        let body = "@set_var(GOOD_name-1, value)\n@set_var(bad name, value)\n@set_var(NOCOMMA)";
        let directives = parse_directives(body);
        assert_eq!(directives.len(), 1);
        assert_eq!(
            directives[0].kind,
            DirectiveKind::SetVar {
                name: "GOOD_name-1".to_string(),
                value: "value".to_string()
            }
        );
    }

    #[test]
    fn test_set_var_keeps_commas_in_value() {
        let directives = parse_directives(r#"@set_var(MESSAGE, "Hello, world")"#);
        assert_eq!(
            directives[0].kind,
            DirectiveKind::SetVar {
                name: "MESSAGE".to_string(),
                value: r#""Hello, world""#.to_string()
            }
        );
    }

    #[test]
    fn test_log_level_directive() {
        let directives = parse_directives("@log_level(debug)\n@log_level(loud)");
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].kind, DirectiveKind::LogLevel(LogLevel::Debug));
    }

    #[test]
    fn test_include_arguments() {
        let directives = parse_directives("@include(Deploy App [staging, eu-west])");
        let spec = directives[0].task().unwrap();
        assert_eq!(spec.task_type, TaskType::Include);
        assert_eq!(spec.action, "Deploy App");
        assert_eq!(spec.title, "Deploy App");
        assert_eq!(spec.arguments, vec!["staging", "eu-west"]);
    }

    #[test]
    fn test_requirements_extracted_and_not_scanned() {
        let body = "@before\nInstall deps first\n@run(ignored)\n@end\n@run(ls)\n@after\nClean up\n@end";
        let parsed = parse(body);
        assert_eq!(parsed.prereqs, vec!["Install deps first\n@run(ignored)"]);
        assert_eq!(parsed.postreqs, vec!["Clean up"]);
        assert_eq!(parsed.directives.len(), 1);
        assert_eq!(parsed.directives[0].task().unwrap().action, "ls");
    }

    #[test]
    fn test_requirement_inside_conditional_keeps_stack() {
        let body = "@if x\n@before\nNote\n@end\n@run(ls)\n@end";
        let directives = parse_directives(body);
        assert_eq!(kinds(&directives), vec!["if", "task", "end"]);
        assert_eq!(directives[1].conditional_path, vec![0]);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let body = "@if ${A} == 1\n@run(one)\n@else\n@set_var(B, 2)\n@end\n```run\necho\n```";
        assert_eq!(parse(body), parse(body));
    }
}
