//! Directive model
//!
//! A topic body is parsed once into a flat, ordered list of [`Directive`]s.
//! Nesting is not stored as a tree: every directive carries the indices of
//! the conditional nodes that enclose it (its conditional path). Evaluation
//! state lives in the runner, keyed by directive index, so the same parsed
//! list can be run any number of times.

pub mod parse;

pub use parse::*;

use crate::ui::LogLevel;
use std::fmt;

/// Kinds of runnable task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Fenced ```run block executed as a script
    Block,
    /// `@run(...)` shell command
    Run,
    /// `@copy(...)` text for the clipboard
    Copy,
    /// `@open(...)` / `@url(...)` target for the platform opener
    Open,
    /// `@include(...)` another topic
    Include,
}

impl TaskType {
    pub fn from_directive_name(name: &str) -> Option<Self> {
        match name {
            "run" => Some(TaskType::Run),
            "copy" => Some(TaskType::Copy),
            "open" | "url" => Some(TaskType::Open),
            "include" => Some(TaskType::Include),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Block => "block",
            TaskType::Run => "run",
            TaskType::Copy => "copy",
            TaskType::Open => "open",
            TaskType::Include => "include",
        };
        f.write_str(name)
    }
}

/// A task as written in the note, before variable substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub task_type: TaskType,
    pub title: String,
    /// Command, script body, clipboard text, open target or topic name
    pub action: String,
    /// Positional arguments passed to an included topic
    pub arguments: Vec<String>,
    /// Ask before running
    pub optional: bool,
    /// Answer assumed when the confirmation is accepted without input
    pub default_answer: bool,
}

/// What a directive does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    If(String),
    Unless(String),
    Elsif(String),
    Else,
    End,
    Task(TaskSpec),
    LogLevel(LogLevel),
    SetVar { name: String, value: String },
}

impl DirectiveKind {
    /// Conditional markers (`@if` .. `@end`)
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            DirectiveKind::If(_)
                | DirectiveKind::Unless(_)
                | DirectiveKind::Elsif(_)
                | DirectiveKind::Else
                | DirectiveKind::End
        )
    }

    /// Opens a new conditional chain
    pub fn opens_chain(&self) -> bool {
        matches!(self, DirectiveKind::If(_) | DirectiveKind::Unless(_))
    }

    /// Tasks, log level changes and variable assignments
    pub fn is_actionable(&self) -> bool {
        !self.is_conditional()
    }
}

/// One parsed unit of a topic body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// 1-based source line within the topic body
    pub line_number: usize,
    /// Indices of the enclosing conditional nodes, outermost first
    pub conditional_path: Vec<usize>,
}

impl Directive {
    pub fn new(kind: DirectiveKind, line_number: usize, conditional_path: Vec<usize>) -> Self {
        Directive {
            kind,
            line_number,
            conditional_path,
        }
    }

    /// Raw condition text for `@if`, `@unless` and `@elsif`
    pub fn condition(&self) -> Option<&str> {
        match &self.kind {
            DirectiveKind::If(c) | DirectiveKind::Unless(c) | DirectiveKind::Elsif(c) => Some(c),
            _ => None,
        }
    }

    pub fn task(&self) -> Option<&TaskSpec> {
        match &self.kind {
            DirectiveKind::Task(spec) => Some(spec),
            _ => None,
        }
    }
}
