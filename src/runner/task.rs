//! Task execution types and logic
//!
//! A [`Task`] is the runtime form of a task directive: the [`TaskSpec`] from
//! the note plus the topic it belongs to and the log level in effect where it
//! appeared.

use crate::directive::{TaskSpec, TaskType};
use crate::error::{ExecutionError, ExecutionResult};
use crate::notes::Topic;
use crate::runner::script::{inject_helper, Hashbang};
use crate::runner::{
    apply_environment, interpolate_list, run_command, shell_command, substitute, Context, Runner, ScriptComm,
    COMM_FILE_ENV, SUPPORT_DIR_ENV,
};
use crate::ui::LogLevel;
use crate::utils;
use std::io::Write;
use std::mem;
use std::path::PathBuf;
use std::process::Command as StdCommand;

/// Runtime task representation
#[derive(Debug, Clone)]
pub struct Task {
    pub task_type: TaskType,

    /// Title as written; placeholders are substituted at run time
    pub title: String,

    pub action: String,

    /// Arguments for an included topic
    pub arguments: Vec<String>,

    pub optional: bool,
    pub default_answer: bool,

    /// Log level set by a preceding `@log_level` directive
    pub log_level: Option<LogLevel>,

    /// Note or template the owning topic came from
    pub source_file: Option<PathBuf>,

    pub topic_title: String,
}

/// Result of executing one task
///
/// Include tasks aggregate the counts of the tasks they ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub success: bool,
    pub exit_status: Option<i32>,
    pub total: usize,
    pub errors: usize,
    /// Lines to show once the run finishes
    pub output: Vec<String>,
}

impl TaskOutcome {
    fn single(success: bool, exit_status: Option<i32>) -> Self {
        TaskOutcome {
            success,
            exit_status,
            total: 1,
            errors: usize::from(!success),
            output: Vec::new(),
        }
    }
}

impl Task {
    pub fn from_spec(spec: &TaskSpec, topic: &Topic, log_level: Option<LogLevel>) -> Self {
        Task {
            task_type: spec.task_type,
            title: spec.title.clone(),
            action: spec.action.clone(),
            arguments: spec.arguments.clone(),
            optional: spec.optional,
            default_answer: spec.default_answer,
            log_level,
            source_file: topic.source_file.clone(),
            topic_title: topic.title.clone(),
        }
    }

    /// Title with placeholders substituted
    pub fn display_title(&self, ctx: &Context) -> String {
        substitute(&self.title, ctx)
    }

    /// Execute the task
    ///
    /// A task-level log level applies only while the task runs and is
    /// restored afterwards whatever the result.
    pub fn execute(&self, ctx: &mut Context, runner: &Runner) -> ExecutionResult<TaskOutcome> {
        let previous = ctx.log_level;
        if let Some(level) = self.log_level {
            ctx.log_level = level;
        }

        let result = match self.task_type {
            TaskType::Run => self.execute_run(ctx),
            TaskType::Block => self.execute_block(ctx),
            TaskType::Copy => Ok(self.execute_copy(ctx)),
            TaskType::Open => Ok(self.execute_open(ctx)),
            TaskType::Include => self.execute_include(ctx, runner),
        };

        ctx.log_level = previous;
        result
    }

    fn execute_run(&self, ctx: &mut Context) -> ExecutionResult<TaskOutcome> {
        let title = self.display_title(ctx);
        ctx.print_task_start(&title);

        let exec_str = substitute(&self.action, ctx);
        ctx.print_debug(&format!("$ {}", exec_str));

        let command = shell_command(&exec_str, ctx);
        self.spawn_with_comm(command, &exec_str, ctx)
    }

    fn execute_block(&self, ctx: &mut Context) -> ExecutionResult<TaskOutcome> {
        let title = self.display_title(ctx);
        ctx.print_task_start(&title);

        let body = substitute(&self.action, ctx);
        let script = inject_helper(&body, ctx.support_dir.as_deref());

        let mut file = tempfile::Builder::new()
            .prefix("howzit_script_")
            .tempfile()
            .map_err(|e| ExecutionError::Script(e.to_string()))?;
        file.write_all(script.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ExecutionError::Script(e.to_string()))?;
        let path = file.into_temp_path();

        #[cfg(unix)]
        {
            use std::fs::{self, Permissions};
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, Permissions::from_mode(0o755))
                .map_err(|e| ExecutionError::Script(e.to_string()))?;
        }

        // Launch through the interpreter so the file is never exec'd directly
        let mut command = match Hashbang::parse(&script) {
            Some(hashbang) => {
                let mut command = StdCommand::new(&hashbang.program);
                command.args(&hashbang.args);
                command
            }
            None => StdCommand::new("sh"),
        };
        command.arg(&*path);
        if let Some(dir) = &ctx.support_dir {
            command.env(SUPPORT_DIR_ENV, dir);
        }

        let outcome = self.spawn_with_comm(command, &title, ctx);

        if let Err(e) = path.close() {
            tracing::debug!("could not remove script file: {}", e);
        }
        outcome
    }

    fn execute_copy(&self, ctx: &mut Context) -> TaskOutcome {
        let title = self.display_title(ctx);
        let text = substitute(&self.action, ctx);

        match utils::copy_to_clipboard(&text) {
            Ok(()) => ctx.print_info(&format!("Copied '{}' to clipboard", title)),
            Err(e) => ctx.print_warn(&format!("Could not copy '{}' to clipboard: {}", title, e)),
        }
        TaskOutcome::single(true, None)
    }

    fn execute_open(&self, ctx: &mut Context) -> TaskOutcome {
        let target = substitute(&self.action, ctx);

        ctx.print_info(&format!("Opening {}", target));
        if let Err(e) = utils::open_target(&target) {
            ctx.print_warn(&format!("Could not open {}: {}", target, e));
        }
        TaskOutcome::single(true, None)
    }

    fn execute_include(&self, ctx: &mut Context, runner: &Runner) -> ExecutionResult<TaskOutcome> {
        let name = substitute(&self.action, ctx);
        let topic = runner
            .note()
            .find_topic(&name)
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::TopicNotFound(name.clone()))?;

        ctx.print_info(&format!("Including {}", topic.title));

        let args = interpolate_list(&self.arguments, ctx);
        let saved = if args.is_empty() {
            None
        } else {
            Some(mem::replace(&mut ctx.args, args))
        };

        let report = runner.run_topic(topic, ctx, true);

        if let Some(saved) = saved {
            ctx.args = saved;
        }
        let report = report?;

        Ok(TaskOutcome {
            success: report.errors == 0 && !report.terminated,
            exit_status: None,
            total: report.total,
            errors: report.errors,
            output: report.output,
        })
    }

    /// Run a prepared command with a fresh comm file, then apply what the
    /// command reported
    fn spawn_with_comm(&self, mut command: StdCommand, label: &str, ctx: &mut Context) -> ExecutionResult<TaskOutcome> {
        let comm = ScriptComm::create().map_err(|e| ExecutionError::Script(e.to_string()))?;
        command.env(COMM_FILE_ENV, comm.path());
        apply_environment(&mut command, ctx);

        let dir = self.working_dir(ctx);
        let result = run_command(command, label, &dir);
        comm.finish().apply(ctx);

        let code = result?;
        Ok(TaskOutcome::single(code == Some(0), code))
    }

    /// Directory the task runs in
    ///
    /// In stack mode a task runs next to the note that defined it (or the
    /// main note, for topics not read from a file), unless that note is a
    /// template.
    pub fn working_dir(&self, ctx: &Context) -> PathBuf {
        if !ctx.options.stack {
            return ctx.working_dir.clone();
        }

        let Some(source) = self.source_file.as_ref().or(ctx.note_path.as_ref()) else {
            return ctx.working_dir.clone();
        };
        if let Some(template_dir) = &ctx.template_dir {
            if source.starts_with(template_dir) {
                return ctx.working_dir.clone();
            }
        }

        match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => ctx.working_dir.clone(),
        }
    }
}
