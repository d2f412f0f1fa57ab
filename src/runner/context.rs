//! Execution context for topic runs
//!
//! The context is threaded through condition evaluation, substitution and
//! task execution. It owns the variable store, the positional arguments,
//! note metadata, the current log level and the run log.

use crate::ui::{self, LogLevel, Prompter};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Options that change how a sequence is executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run tasks from the directory of the note that defined them
    pub stack: bool,
    /// Keep going after a failed task
    pub force: bool,
}

/// One executed task, recorded for the end-of-run report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEntry {
    pub task_title: String,
    pub topic_title: String,
    pub success: bool,
    pub exit_status: Option<i32>,
}

/// Execution context that tracks state during a run
pub struct Context {
    /// Directory commands run in unless stack mode says otherwise
    pub working_dir: PathBuf,

    /// Build notes file the topics came from
    pub note_path: Option<PathBuf>,

    /// Template directory; stack mode never changes into it
    pub template_dir: Option<PathBuf>,

    /// Directory holding the per-language helper libraries
    pub support_dir: Option<PathBuf>,

    /// Named variables
    pub vars: HashMap<String, String>,

    /// Positional arguments (`$1`, `$2`, ...)
    pub args: Vec<String>,

    /// Note metadata, keys lower-cased
    pub metadata: HashMap<String, String>,

    /// Interpreter for `run` tasks (e.g., ["sh", "-c"])
    pub interpreter: Vec<String>,

    /// Console threshold
    pub log_level: LogLevel,

    pub options: RunOptions,

    /// Topics currently being run (for detecting include recursion)
    pub topic_stack: Vec<String>,

    /// Every executed task, in order
    pub run_log: Vec<RunLogEntry>,

    prompter: Prompter,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            note_path: None,
            template_dir: None,
            support_dir: None,
            vars: HashMap::new(),
            args: Vec::new(),
            metadata: HashMap::new(),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            log_level: LogLevel::Info,
            options: RunOptions::default(),
            topic_stack: Vec::new(),
            run_log: Vec::new(),
            prompter: ui::default_prompter(),
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the build notes path
    pub fn with_note_path(mut self, path: PathBuf) -> Self {
        self.note_path = Some(path);
        self
    }

    pub fn with_template_dir(mut self, dir: PathBuf) -> Self {
        self.template_dir = Some(dir);
        self
    }

    pub fn with_support_dir(mut self, dir: PathBuf) -> Self {
        self.support_dir = Some(dir);
        self
    }

    /// Set variables
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Set positional arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the confirmation callback
    pub fn with_prompter(mut self, prompter: Prompter) -> Self {
        self.prompter = prompter;
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Get a variable value
    pub fn get_var(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// Ask a yes/no question through the configured prompter
    pub fn confirm(&mut self, question: &str, default: bool) -> bool {
        (self.prompter)(question, default)
    }

    /// Push a topic onto the execution stack
    pub fn push_topic(&mut self, title: String) {
        self.topic_stack.push(title);
    }

    /// Pop a topic from the execution stack
    pub fn pop_topic(&mut self) -> Option<String> {
        self.topic_stack.pop()
    }

    /// Check if a topic is already running (detect include recursion)
    pub fn is_topic_in_stack(&self, title: &str) -> bool {
        self.topic_stack.iter().any(|t| t == title)
    }

    /// Record an executed task
    pub fn record(&mut self, entry: RunLogEntry) {
        self.run_log.push(entry);
    }

    /// Log at an explicit level
    pub fn log(&self, level: LogLevel, message: &str) {
        ui::log_line(level, self.log_level, message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Print warning message
    pub fn print_warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Print debug message
    pub fn print_debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Print task start message
    pub fn print_task_start(&self, title: &str) {
        self.print_info(&format!("Running {}", title));
    }

    /// Print task skip message
    pub fn print_task_skip(&self, title: &str, reason: &str) {
        self.print_debug(&format!("Skipping '{}': {}", title, reason));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.log_level, LogLevel::Info);
        assert_eq!(ctx.interpreter, vec!["sh", "-c"]);
        assert!(ctx.vars.is_empty());
        assert!(ctx.topic_stack.is_empty());
        assert_eq!(ctx.options, RunOptions::default());
    }

    #[test]
    fn test_context_with_vars() {
        let mut vars = HashMap::new();
        vars.insert("key".to_string(), "value".to_string());

        let ctx = Context::new().with_vars(vars);
        assert_eq!(ctx.get_var("key"), Some(&"value".to_string()));
    }

    #[test]
    fn test_context_set_var() {
        let mut ctx = Context::new();
        ctx.set_var("test".to_string(), "value".to_string());
        assert_eq!(ctx.get_var("test"), Some(&"value".to_string()));
    }

    #[test]
    fn test_topic_stack() {
        let mut ctx = Context::new();

        assert!(!ctx.is_topic_in_stack("Build"));

        ctx.push_topic("Build".to_string());
        assert!(ctx.is_topic_in_stack("Build"));

        ctx.push_topic("Test".to_string());
        assert!(ctx.is_topic_in_stack("Test"));

        assert_eq!(ctx.pop_topic(), Some("Test".to_string()));
        assert!(!ctx.is_topic_in_stack("Test"));
        assert!(ctx.is_topic_in_stack("Build"));
    }

    #[test]
    fn test_prompter_is_used() {
        let mut ctx = Context::new().with_prompter(Box::new(|question: &str, _: bool| question.contains("yes")));
        assert!(ctx.confirm("say yes", false));
        assert!(!ctx.confirm("say no", true));
    }

    #[test]
    fn test_record_run_log() {
        let mut ctx = Context::new();
        ctx.record(RunLogEntry {
            task_title: "ls".to_string(),
            topic_title: "Files".to_string(),
            success: true,
            exit_status: Some(0),
        });
        assert_eq!(ctx.run_log.len(), 1);
        assert!(ctx.run_log[0].success);
    }
}
