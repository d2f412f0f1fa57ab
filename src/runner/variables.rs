//! `@set_var` value resolution

use crate::runner::{capture_command, substitute, Context};
use once_cell::sync::Lazy;
use regex::Regex;

static BACKTICK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^`(.*)`$").unwrap());
static SUBSHELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\$\((.*)\)$").unwrap());

/// Resolve the raw value of `@set_var(name, value)`
///
/// A value wrapped in backticks or `$( )` is run as a command and its
/// trimmed stdout becomes the value; a failing command yields an empty
/// string. Anything else loses one layer of matching quotes and then has
/// placeholders substituted.
pub fn resolve_assignment(name: &str, raw: &str, ctx: &Context) -> String {
    let raw = raw.trim();

    if let Some(command) = command_substitution(raw) {
        let command = substitute(command, ctx);
        return match capture_command(&command, ctx) {
            Ok(output) => output,
            Err(e) => {
                ctx.print_warn(&format!("@set_var({}) command failed: {}", name, e));
                String::new()
            }
        };
    }

    substitute(strip_matching_quotes(raw), ctx)
}

fn command_substitution(raw: &str) -> Option<&str> {
    BACKTICK_RE
        .captures(raw)
        .or_else(|| SUBSHELL_RE.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Remove one layer of matching single or double quotes
pub fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
