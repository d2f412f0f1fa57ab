//! Script preparation for fenced `run` blocks
//!
//! The hashbang decides both how the script is launched and which helper
//! library (if installed in the support directory) gets loaded into it.

use crate::runner::SUPPORT_DIR_ENV;
use std::path::Path;

/// Languages with helper libraries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    Sh,
    Bash,
    Zsh,
    Fish,
    Ruby,
    Python,
    Perl,
    Node,
}

impl ScriptLanguage {
    fn from_interpreter(name: &str) -> Option<Self> {
        let base = name.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
        match base {
            "sh" | "dash" | "ash" => Some(ScriptLanguage::Sh),
            "bash" => Some(ScriptLanguage::Bash),
            "zsh" => Some(ScriptLanguage::Zsh),
            "fish" => Some(ScriptLanguage::Fish),
            "ruby" => Some(ScriptLanguage::Ruby),
            "python" => Some(ScriptLanguage::Python),
            "perl" => Some(ScriptLanguage::Perl),
            "node" | "nodejs" => Some(ScriptLanguage::Node),
            _ => None,
        }
    }

    /// Helper file name inside the support directory
    pub fn helper_file(&self) -> &'static str {
        match self {
            ScriptLanguage::Sh | ScriptLanguage::Bash | ScriptLanguage::Zsh => "howzit.sh",
            ScriptLanguage::Fish => "howzit.fish",
            ScriptLanguage::Ruby => "howzit.rb",
            ScriptLanguage::Python => "howzit.py",
            ScriptLanguage::Perl => "howzit.pl",
            ScriptLanguage::Node => "howzit.js",
        }
    }

    /// Line that loads the helper library
    ///
    /// Shell families use `.` since POSIX sh has no `source`.
    pub fn load_line(&self) -> String {
        let file = self.helper_file();
        match self {
            ScriptLanguage::Sh | ScriptLanguage::Bash | ScriptLanguage::Zsh => {
                format!(". \"${}/{}\"", SUPPORT_DIR_ENV, file)
            }
            ScriptLanguage::Fish => format!("source ${}/{}", SUPPORT_DIR_ENV, file),
            ScriptLanguage::Ruby => format!("require File.join(ENV['{}'], '{}')", SUPPORT_DIR_ENV, file),
            ScriptLanguage::Python => format!(
                "import os, sys; sys.path.insert(0, os.environ['{}']); from howzit import *",
                SUPPORT_DIR_ENV
            ),
            ScriptLanguage::Perl => format!("require \"$ENV{{{}}}/{}\";", SUPPORT_DIR_ENV, file),
            ScriptLanguage::Node => format!(
                "const howzit = require(require('path').join(process.env.{}, '{}'));",
                SUPPORT_DIR_ENV, file
            ),
        }
    }
}

/// Parsed `#!` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashbang {
    pub program: String,
    pub args: Vec<String>,
}

impl Hashbang {
    /// Read the hashbang from the first line of a script
    pub fn parse(script: &str) -> Option<Self> {
        let first = script.lines().next()?.trim();
        let rest = first.strip_prefix("#!")?;
        let mut words = rest.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Hashbang {
            program,
            args: words.collect(),
        })
    }

    /// The interpreter name, looking through `/usr/bin/env`
    pub fn interpreter(&self) -> &str {
        let base = file_name(&self.program);
        if base == "env" {
            self.args
                .iter()
                .find(|a| !a.starts_with('-'))
                .map(|a| file_name(a))
                .unwrap_or(base)
        } else {
            base
        }
    }

    pub fn language(&self) -> Option<ScriptLanguage> {
        ScriptLanguage::from_interpreter(self.interpreter())
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Insert the helper load line after the hashbang when the helper exists
pub fn inject_helper(script: &str, support_dir: Option<&Path>) -> String {
    let Some(language) = Hashbang::parse(script).and_then(|h| h.language()) else {
        return script.to_string();
    };
    let Some(dir) = support_dir else {
        return script.to_string();
    };
    if !dir.join(language.helper_file()).is_file() {
        return script.to_string();
    }

    let (first, rest) = script.split_once('\n').unwrap_or((script, ""));
    format!("{}\n{}\n{}", first, language.load_line(), rest)
}
