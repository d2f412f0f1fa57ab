//! Console output with level gating

use crate::runner::RunLogEntry;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Console log levels, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Write a message to stderr if `level` passes `threshold`
pub fn log_line(level: LogLevel, threshold: LogLevel, message: &str) {
    if level < threshold {
        return;
    }

    let prefix = match level {
        LogLevel::Debug => "[DEBUG]".dimmed(),
        LogLevel::Info => "[INFO]".cyan(),
        LogLevel::Warn => "[WARN]".yellow(),
        LogLevel::Error => "[ERROR]".red().bold(),
    };
    eprintln!("{} {}", prefix, message);
}

/// Print a block of free text (prerequisites, topic content) to stdout
pub fn print_block(text: &str) {
    println!("{}", text.trim_end());
}

/// Print one line per task recorded in the run log
pub fn print_run_log(entries: &[RunLogEntry]) {
    if entries.is_empty() {
        return;
    }

    for entry in entries {
        if entry.success {
            println!("{} {} ({})", "✓".green(), entry.task_title, entry.topic_title.dimmed());
        } else {
            let status = entry
                .exit_status
                .map(|code| format!("exit {}", code))
                .unwrap_or_else(|| "no exit status".to_string());
            println!(
                "{} {} ({}) {}",
                "✗".red(),
                entry.task_title,
                entry.topic_title.dimmed(),
                status.red()
            );
        }
    }
}

/// Colorize a run summary line by its leading marker
pub fn paint_summary(line: &str) -> String {
    if line.starts_with('✓') {
        line.green().to_string()
    } else if line.starts_with('✗') {
        line.red().to_string()
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(" warn ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_yaml() {
        let level: LogLevel = serde_yaml::from_str("error").unwrap();
        assert_eq!(level, LogLevel::Error);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
