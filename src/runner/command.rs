//! Command execution
//!
//! This module handles spawning shell commands and scripts. Every spawn
//! blocks until the child exits.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};

/// Environment variable mirroring the effective log level for children
pub const LOG_LEVEL_ENV: &str = "HOWZIT_LOG_LEVEL";

/// Build a command that runs `exec_str` through the context's interpreter
pub fn shell_command(exec_str: &str, ctx: &Context) -> StdCommand {
    let mut command = StdCommand::new(&ctx.interpreter[0]);

    // Add interpreter args (e.g., "-c" for sh/bash)
    if ctx.interpreter.len() > 1 {
        command.args(&ctx.interpreter[1..]);
    }
    command.arg(exec_str);
    command
}

/// Export the context's variables and log level to a child
pub fn apply_environment(command: &mut StdCommand, ctx: &Context) {
    for (key, value) in &ctx.vars {
        if !key.is_empty() && !key.contains('=') {
            command.env(key, value);
        }
    }
    command.env(LOG_LEVEL_ENV, ctx.log_level.as_str());
}

/// Run a prepared command with inherited stdio and return its exit code
///
/// Only a failure to start is an error; a nonzero exit is returned as-is.
/// `None` means the child was terminated by a signal.
pub fn run_command(mut command: StdCommand, label: &str, dir: &Path) -> ExecutionResult<Option<i32>> {
    command.current_dir(dir);
    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command.status().map_err(|e| ExecutionError::Spawn {
        command: label.to_string(),
        error: e.to_string(),
    })?;

    Ok(status.code())
}

/// Run a shell command and capture its stdout (for command substitution)
pub fn capture_command(exec_str: &str, ctx: &Context) -> ExecutionResult<String> {
    let mut command = shell_command(exec_str, ctx);
    apply_environment(&mut command, ctx);
    command.current_dir(&ctx.working_dir);
    command.stdin(Stdio::null());
    command.stderr(Stdio::inherit());

    let output = command.output().map_err(|e| ExecutionError::Spawn {
        command: exec_str.to_string(),
        error: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(ExecutionError::CommandFailed(output.status.code()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Whether the git work tree in `dir` has unstaged changes
///
/// A missing git binary, or any failure other than a "differences found"
/// exit, counts as clean.
pub fn git_dirty(dir: &Path) -> bool {
    if which::which("git").is_err() {
        return false;
    }

    let status = StdCommand::new("git")
        .args(["diff", "--quiet"])
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    matches!(status.map(|s| s.code()), Ok(Some(1)))
}
