//! Main CLI application

use crate::config::{find_note_from, find_notes_from, Settings};
use crate::error::ExecutionError;
use crate::notes::{BuildNote, Topic};
use crate::runner::{Context, RunOptions, Runner};
use crate::ui::{self, LogLevel};
use anyhow::{Context as _, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Options gathered from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub file: Option<PathBuf>,
    /// Topic search term; words are joined with spaces
    pub topic: Option<String>,
    /// Arguments after `--`
    pub args: Vec<String>,
    pub run: bool,
    pub list: bool,
    pub list_runnable: bool,
    pub force: bool,
    pub stack: bool,
    /// `--yes` / `--no`
    pub answer: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub completions: Option<Shell>,
}

impl CliOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let topic = matches
            .get_many::<String>("topic")
            .map(|words| words.cloned().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.trim().is_empty());

        let answer = if matches.get_flag("yes") {
            Some(true)
        } else if matches.get_flag("no") {
            Some(false)
        } else {
            None
        };

        let log_level = if matches.get_flag("quiet") {
            Some(LogLevel::Error)
        } else if matches.get_flag("verbose") {
            Some(LogLevel::Debug)
        } else {
            matches.get_one::<LogLevel>("log_level").copied()
        };

        CliOptions {
            file: matches.get_one::<PathBuf>("file").cloned(),
            topic,
            args: matches
                .get_many::<String>("args")
                .map(|a| a.cloned().collect())
                .unwrap_or_default(),
            run: matches.get_flag("run"),
            list: matches.get_flag("list"),
            list_runnable: matches.get_flag("list_runnable"),
            force: matches.get_flag("force"),
            stack: matches.get_flag("stack"),
            answer,
            log_level,
            completions: matches.get_one::<Shell>("completions").copied(),
        }
    }
}

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    settings: Settings,
}

impl App {
    /// Create a new app from the user's settings
    pub fn new() -> Result<Self> {
        let settings = Settings::load().context("Failed to load settings")?;
        Ok(Self::with_settings(settings))
    }

    pub fn with_settings(settings: Settings) -> Self {
        App {
            command: build_command(),
            settings,
        }
    }

    /// Run the application with the process arguments
    ///
    /// Returns `Ok(false)` when a run finished with errors.
    pub fn run(self) -> Result<bool> {
        let matches = self.command.clone().get_matches();
        self.run_with(CliOptions::from_matches(&matches))
    }

    pub fn run_with(mut self, opts: CliOptions) -> Result<bool> {
        if let Some(shell) = opts.completions {
            clap_complete::generate(shell, &mut self.command, "howzit", &mut io::stdout());
            return Ok(true);
        }

        let log_level = opts
            .log_level
            .or(self.settings.log_level)
            .unwrap_or_default();
        let stack = opts.stack || self.settings.stack;
        let cwd = env::current_dir().context("Failed to get current directory")?;

        let paths = self.note_paths(&opts, stack, &cwd)?;
        let mut note = BuildNote::load_stack(&paths).context("Failed to load build notes")?;

        let template_dir = self.settings.template_dir();
        if let Some(dir) = &template_dir {
            for missing in note.apply_templates(dir) {
                ui::log_line(
                    LogLevel::Warn,
                    log_level,
                    &format!("Template not found: {}", dir.join(format!("{}.md", missing)).display()),
                );
            }
        }

        if opts.list || opts.list_runnable || opts.topic.is_none() {
            let topics = if opts.list_runnable {
                note.runnable_topics()
            } else {
                note.topics.iter().collect()
            };
            print_topic_list(&topics);
            return Ok(true);
        }

        let term = opts.topic.as_deref().unwrap_or_default();
        let matches = note.find_topic(term);
        let topic = *matches
            .first()
            .ok_or_else(|| ExecutionError::TopicNotFound(term.to_string()))?;
        if matches.len() > 1 {
            tracing::debug!(count = matches.len(), "several topics match '{}', using the first", term);
        }

        if !opts.run {
            print_topic(topic);
            return Ok(true);
        }

        let mut ctx = Context::new()
            .with_working_dir(cwd)
            .with_args(opts.args.clone())
            .with_metadata(note.metadata.clone())
            .with_log_level(log_level)
            .with_options(RunOptions {
                stack,
                force: opts.force || self.settings.force,
            })
            .with_prompter(ui::terminal_prompter(
                opts.answer.or(self.settings.forced_answer()),
            ));

        if let Some(path) = paths.first() {
            ctx = ctx.with_note_path(path.clone());
        }
        if let Some(dir) = template_dir {
            ctx = ctx.with_template_dir(dir);
        }
        if let Some(dir) = self.settings.support_dir() {
            ctx = ctx.with_support_dir(dir);
        }
        if let Some(interpreter) = &self.settings.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        let runner = Runner::new(&note);
        let report = runner
            .run_topic(topic, &mut ctx, false)
            .with_context(|| format!("Failed to run '{}'", topic.title))?;

        ui::print_run_log(&ctx.run_log);
        for line in &report.output {
            println!("{}", ui::paint_summary(line));
        }

        Ok(report.succeeded())
    }

    /// Note files to load, nearest first
    fn note_paths(&self, opts: &CliOptions, stack: bool, cwd: &Path) -> Result<Vec<PathBuf>> {
        if let Some(file) = opts.file.as_ref().or(self.settings.note_file.as_ref()) {
            return Ok(vec![file.clone()]);
        }

        if stack {
            let paths = find_notes_from(cwd);
            if paths.is_empty() {
                // Reuse the single-file lookup for its error message
                find_note_from(cwd)?;
            }
            return Ok(paths);
        }

        Ok(vec![find_note_from(cwd)?])
    }
}

fn print_topic_list(topics: &[&Topic]) {
    for topic in topics {
        if topic.arguments.is_empty() {
            println!("- {}", topic.title);
        } else {
            let args: Vec<&str> = topic.arguments.iter().map(|a| a.name.as_str()).collect();
            println!("- {} ({})", topic.title, args.join(", "));
        }
    }
}

fn print_topic(topic: &Topic) {
    println!("## {}", topic.title);
    println!();
    ui::print_block(&topic.content);
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("howzit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read and run the topics of a project's build notes")
        .arg(
            Arg::new("topic")
                .value_name("TOPIC")
                .num_args(0..)
                .help("Topic to show or run (partial titles match)"),
        )
        .arg(
            Arg::new("args")
                .value_name("ARGS")
                .num_args(0..)
                .last(true)
                .help("Positional arguments for the topic ($1, $2, ...)"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to a build notes file"),
        )
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .help("Run the topic's tasks instead of printing it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('L')
                .long("list")
                .help("List all topics")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list_runnable")
                .short('T')
                .long("list-runnable")
                .help("List topics that have tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .help("Keep running after a task fails")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .help("Answer yes to every prompt")
                .action(ArgAction::SetTrue)
                .conflicts_with("no"),
        )
        .arg(
            Arg::new("no")
                .short('n')
                .long("no")
                .help("Answer no to every prompt")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stack")
                .long("stack")
                .help("Merge notes from parent directories and run tasks beside their note")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(value_parser!(LogLevel))
                .help("Console log level: debug, info, warn or error"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print debug output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script"),
        )
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<bool> {
    App::new()?.run()
}
