//! Error types for Howzit

use std::path::PathBuf;
use thiserror::Error;

/// Settings, note discovery and note reading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No build notes found (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read build notes '{path}': {error}")]
    ReadNote { path: PathBuf, error: String },

    #[error("Failed to read settings '{path}': {error}")]
    Settings { path: PathBuf, error: String },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to start '{command}': {error}")]
    Spawn { command: String, error: String },

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Topic '{0}' includes itself")]
    RecursiveInclude(String),

    #[error("Prerequisites for '{0}' were not met")]
    PrerequisiteDeclined(String),

    #[error("Script error: {0}")]
    Script(String),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Errors that end the whole task sequence regardless of continue-on-error
pub fn is_fatal_reference(err: &ExecutionError) -> bool {
    matches!(
        err,
        ExecutionError::TopicNotFound(_) | ExecutionError::RecursiveInclude(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_reference_errors() {
        assert!(is_fatal_reference(&ExecutionError::TopicNotFound("x".into())));
        assert!(is_fatal_reference(&ExecutionError::RecursiveInclude("x".into())));
        assert!(!is_fatal_reference(&ExecutionError::CommandFailed(Some(1))));
    }

    #[test]
    fn test_error_messages() {
        let err = ExecutionError::TopicNotFound("Deploy".to_string());
        assert_eq!(err.to_string(), "Topic not found: Deploy");

        let err = ConfigError::NotFound("a, b".to_string());
        assert_eq!(err.to_string(), "No build notes found (searched: a, b)");
    }
}
