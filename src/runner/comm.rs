//! Script communication side channel
//!
//! Every `run` and `block` task gets a fresh temp file whose path is exported
//! as `HOWZIT_COMM_FILE`. The task may append lines of the form
//!
//! ```text
//! LOG:<level>:<message>
//! VAR:<NAME>=<value>
//! ```
//!
//! After the task exits the file is read, applied to the context and removed.

use crate::runner::Context;
use crate::ui::LogLevel;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempPath;

/// Environment variable carrying the comm file path
pub const COMM_FILE_ENV: &str = "HOWZIT_COMM_FILE";

/// Environment variable carrying the helper library directory
pub const SUPPORT_DIR_ENV: &str = "HOWZIT_SUPPORT_DIR";

static LOG_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^LOG:([a-z]+):(.*)$").unwrap());
static VAR_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^VAR:([A-Z0-9_]+)=(.*)$").unwrap());

/// A log message reported by a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommLog {
    pub level: LogLevel,
    pub message: String,
}

/// Everything a task reported through its comm file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommReport {
    pub logs: Vec<CommLog>,
    /// Last write per name wins; names are kept exactly as written
    pub vars: HashMap<String, String>,
}

impl CommReport {
    /// Parse comm file contents; unrecognized lines are ignored
    pub fn parse(contents: &str) -> Self {
        let mut report = CommReport::default();

        for line in contents.lines() {
            let line = line.trim_end_matches('\r');

            if let Some(caps) = LOG_LINE_RE.captures(line) {
                match caps[1].parse::<LogLevel>() {
                    Ok(level) => report.logs.push(CommLog {
                        level,
                        message: caps[2].to_string(),
                    }),
                    Err(e) => tracing::debug!("ignoring comm log line: {}", e),
                }
            } else if let Some(caps) = VAR_LINE_RE.captures(line) {
                report.vars.insert(caps[1].to_string(), caps[2].to_string());
            } else if !line.trim().is_empty() {
                tracing::debug!(line, "ignoring unrecognized comm line");
            }
        }

        report
    }

    /// Route logs to the console and merge variables into the context
    pub fn apply(self, ctx: &mut Context) {
        for log in &self.logs {
            ctx.log(log.level, &log.message);
        }
        for (name, value) in self.vars {
            ctx.set_var(name, value);
        }
    }
}

/// One task's comm file; removed when consumed or dropped
pub struct ScriptComm {
    path: TempPath,
}

impl ScriptComm {
    /// Create an empty comm file
    pub fn create() -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("howzit_comm_")
            .suffix(".txt")
            .tempfile()?;
        Ok(ScriptComm {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and delete the file
    ///
    /// A missing or unreadable file yields an empty report; the file is
    /// removed either way.
    pub fn finish(self) -> CommReport {
        let report = match fs::read_to_string(&self.path) {
            Ok(contents) => CommReport::parse(&contents),
            Err(e) => {
                tracing::debug!("could not read comm file: {}", e);
                CommReport::default()
            }
        };

        if let Err(e) = self.path.close() {
            tracing::debug!("could not remove comm file: {}", e);
        }
        report
    }
}
