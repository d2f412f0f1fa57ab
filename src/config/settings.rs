//! User settings
//!
//! Settings live in `howzit.yaml` inside the config directory. Every field
//! is optional; command line flags override whatever is set here.

use crate::error::{ConfigError, ConfigResult};
use crate::ui::LogLevel;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "HOWZIT_CONFIG_DIR";

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "howzit.yaml";

/// Answer used for every confirmation when set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAnswer {
    Yes,
    No,
}

/// Top-level settings structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Console log threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Merge notes from parent directories and run tasks beside their note
    #[serde(default)]
    pub stack: bool,

    /// Keep running after a failed task
    #[serde(default)]
    pub force: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_answer: Option<DefaultAnswer>,

    /// Directory holding `<name>.md` templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_folder: Option<PathBuf>,

    /// Directory holding the script helper libraries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_folder: Option<PathBuf>,

    /// Explicit notes file, bypassing discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_file: Option<PathBuf>,

    /// Interpreter for `run` tasks (e.g., ["bash", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from the config directory
    pub fn load() -> ConfigResult<Self> {
        match config_dir() {
            Some(dir) => Self::load_from(&dir.join(SETTINGS_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Settings {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })
            }
        };

        let settings = Self::parse(&contents).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values the YAML schema can't express
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(interpreter) = &self.interpreter {
            if interpreter.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(ConfigError::Invalid("interpreter must name a program".to_string()));
            }
        }
        Ok(())
    }

    /// Parse settings from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Forced confirmation answer, if one is configured
    pub fn forced_answer(&self) -> Option<bool> {
        self.default_answer.map(|a| a == DefaultAnswer::Yes)
    }

    /// Template directory: the configured folder or `<config dir>/templates`
    pub fn template_dir(&self) -> Option<PathBuf> {
        self.template_folder
            .clone()
            .or_else(|| config_dir().map(|d| d.join("templates")))
    }

    /// Helper library directory: the configured folder or `<config dir>/support`
    pub fn support_dir(&self) -> Option<PathBuf> {
        self.support_folder
            .clone()
            .or_else(|| config_dir().map(|d| d.join("support")))
    }
}

/// The config directory, honoring `HOWZIT_CONFIG_DIR`
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("", "", "howzit").map(|dirs| dirs.config_dir().to_path_buf())
}
