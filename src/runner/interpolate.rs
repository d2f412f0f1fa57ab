//! Variable substitution for action and title text
//!
//! Supports:
//! - `${name}` - named variable, then environment variable
//! - `${name:default}` - literal default when the name is unset
//! - `$1`..`$N` - positional arguments
//! - `$@` / `$*` - all positional arguments, shell-quoted and joined
//!
//! Placeholders that cannot be resolved are left untouched so the shell can
//! still expand them.

use crate::runner::Context;
use crate::utils::shell_join;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::env;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_-]+)(?::([^}]*))?\}|\$(\d+)|\$([@*])").unwrap()
});

/// Substitute placeholders using the context's variables and arguments
pub fn substitute(s: &str, ctx: &Context) -> String {
    interpolate(s, &ctx.vars, &ctx.args)
}

/// Substitute placeholders in a single pass
pub fn interpolate(s: &str, vars: &HashMap<String, String>, args: &[String]) -> String {
    PLACEHOLDER_RE
        .replace_all(s, |caps: &Captures| {
            let original = caps[0].to_string();

            if let Some(name) = caps.get(1) {
                let name = name.as_str();
                let value = if name.chars().all(|c| c.is_ascii_digit()) {
                    positional(args, name)
                } else {
                    vars.get(name).cloned().or_else(|| env::var(name).ok())
                };
                return value
                    .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
                    .unwrap_or(original);
            }

            if let Some(index) = caps.get(3) {
                return positional(args, index.as_str()).unwrap_or(original);
            }

            if args.is_empty() {
                original
            } else {
                shell_join(args)
            }
        })
        .into_owned()
}

fn positional(args: &[String], index: &str) -> Option<String> {
    let n: usize = index.parse().ok()?;
    n.checked_sub(1).and_then(|i| args.get(i)).cloned()
}

/// Interpolate a list of strings
pub fn interpolate_list(list: &[String], ctx: &Context) -> Vec<String> {
    list.iter().map(|s| substitute(s, ctx)).collect()
}
