//! Condition evaluation for `@if`, `@unless` and `@elsif`
//!
//! A condition is a single test, optionally negated with `not ` or `!`:
//!
//! - special predicates: `file exists <path>`, `dir exists <path>`,
//!   `topic exists <name>`, `git dirty`, `git clean`, `cwd`
//! - regex match: `<value> =~ /<pattern>/` (case-insensitive)
//! - comparison: `<value> OP <value>` with `==`, `!=`, `>`, `>=`, `<`, `<=`
//! - string tests: `*=` (contains), `^=` (starts with), `$=` (ends with)
//! - anything else: true when the value resolves to a non-empty string
//!
//! Evaluation never fails; malformed input evaluates to false.

use crate::notes::BuildNote;
use crate::runner::{git_dirty, substitute, Context};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::env;

static FILE_EXISTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^file\s+exists\s+(.+)$").unwrap());
static DIR_EXISTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^dir(?:ectory)?\s+exists\s+(.+)$").unwrap());
static TOPIC_EXISTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^topic\s+exists\s+(.+)$").unwrap());
static GIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^git\s+(dirty|clean)$").unwrap());
static CWD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:working\s+directory|cwd)$").unwrap());
static MATCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*=~\s*/(.*)/$").unwrap());
static COMPARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*(==|!=|>=|<=|>|<)\s*(.+)$").unwrap());
static STRING_OP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*(\*=|\^=|\$=)\s*(.+)$").unwrap());
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());
static POSITIONAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$(\d+)$").unwrap());
static BRACED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\{([^}:]+)(?::([^}]*))?\}$").unwrap());

/// Something that can decide a condition string
pub trait Evaluate {
    fn evaluate(&self, condition: &str, ctx: &Context) -> bool;
}

/// The standard evaluator; `topic exists` consults the note when one is set
#[derive(Default)]
pub struct ConditionEvaluator<'a> {
    note: Option<&'a BuildNote>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new() -> Self {
        ConditionEvaluator { note: None }
    }

    pub fn with_note(note: &'a BuildNote) -> Self {
        ConditionEvaluator { note: Some(note) }
    }
}

impl Evaluate for ConditionEvaluator<'_> {
    fn evaluate(&self, condition: &str, ctx: &Context) -> bool {
        evaluate_condition(condition, ctx, self.note)
    }
}

/// Evaluate a condition string
pub fn evaluate_condition(condition: &str, ctx: &Context, note: Option<&BuildNote>) -> bool {
    let (negated, inner) = strip_negation(condition.trim());
    let inner = inner.trim();
    // A negation with nothing to negate is a missing operand
    if inner.is_empty() {
        return false;
    }
    let result = evaluate_positive(inner, ctx, note);
    if negated {
        !result
    } else {
        result
    }
}

fn strip_negation(condition: &str) -> (bool, &str) {
    if let Some(prefix) = condition.get(..4) {
        if prefix.eq_ignore_ascii_case("not ") {
            return (true, &condition[4..]);
        }
    }
    if let Some(rest) = condition.strip_prefix('!') {
        if !rest.starts_with('=') {
            return (true, rest);
        }
    }
    (false, condition)
}

fn evaluate_positive(condition: &str, ctx: &Context, note: Option<&BuildNote>) -> bool {
    if condition.is_empty() {
        return false;
    }

    if let Some(result) = evaluate_special(condition, ctx, note) {
        return result;
    }

    if let Some(caps) = MATCH_RE.captures(condition) {
        let Some(value) = resolve_value(&caps[1], ctx) else {
            return false;
        };
        return RegexBuilder::new(&caps[2])
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(&value))
            .unwrap_or(false);
    }

    if let Some(caps) = COMPARE_RE.captures(condition) {
        let left = resolve_operand(&caps[1], ctx);
        let right = resolve_operand(&caps[3], ctx);
        return compare(left.as_deref(), &caps[2], right.as_deref());
    }

    if let Some(caps) = STRING_OP_RE.captures(condition) {
        let (Some(left), Some(right)) = (resolve_value(&caps[1], ctx), resolve_value(&caps[3], ctx)) else {
            return false;
        };
        return match &caps[2] {
            "*=" => left.contains(&right),
            "^=" => left.starts_with(&right),
            _ => left.ends_with(&right),
        };
    }

    resolve_value(condition, ctx).map_or(false, |v| !v.is_empty())
}

fn evaluate_special(condition: &str, ctx: &Context, note: Option<&BuildNote>) -> Option<bool> {
    if let Some(caps) = FILE_EXISTS_RE.captures(condition) {
        return Some(ctx.working_dir.join(literal_argument(&caps[1], ctx)).is_file());
    }
    if let Some(caps) = DIR_EXISTS_RE.captures(condition) {
        return Some(ctx.working_dir.join(literal_argument(&caps[1], ctx)).is_dir());
    }
    if let Some(caps) = TOPIC_EXISTS_RE.captures(condition) {
        let name = literal_argument(&caps[1], ctx);
        return Some(note.map_or(false, |n| !n.find_topic(&name).is_empty()));
    }
    if let Some(caps) = GIT_RE.captures(condition) {
        let dirty = git_dirty(&ctx.working_dir);
        return Some(if caps[1].eq_ignore_ascii_case("dirty") {
            dirty
        } else {
            !dirty
        });
    }
    if CWD_RE.is_match(condition) {
        return Some(true);
    }
    None
}

/// Substitute placeholders and strip one layer of quotes
fn literal_argument(arg: &str, ctx: &Context) -> String {
    let substituted = substitute(arg.trim(), ctx);
    strip_quotes(&substituted).unwrap_or(substituted.as_str()).to_string()
}

fn strip_quotes(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return Some(&token[1..token.len() - 1]);
        }
    }
    None
}

pub fn is_numeric(value: &str) -> bool {
    NUMERIC_RE.is_match(value.trim())
}

/// Resolve a comparison operand, keeping unresolved numeric literals
fn resolve_operand(token: &str, ctx: &Context) -> Option<String> {
    resolve_value(token, ctx).or_else(|| {
        let token = token.trim();
        is_numeric(token).then(|| token.to_string())
    })
}

fn compare(left: Option<&str>, op: &str, right: Option<&str>) -> bool {
    if let (Some(l), Some(r)) = (left, right) {
        if is_numeric(l) && is_numeric(r) {
            if let (Ok(l), Ok(r)) = (l.trim().parse::<f64>(), r.trim().parse::<f64>()) {
                return match op {
                    "==" => l == r,
                    "!=" => l != r,
                    ">" => l > r,
                    ">=" => l >= r,
                    "<" => l < r,
                    _ => l <= r,
                };
            }
        }
    }

    // Ordering is only defined for numbers
    match op {
        "==" => left == right,
        "!=" => left != right,
        _ => false,
    }
}

/// Resolve a bare token to a value
///
/// Order: quoted literal (with placeholders expanded), `$N`,
/// `${name[:default]}`, named variable, metadata, environment. `None` when
/// nothing matches.
pub fn resolve_value(token: &str, ctx: &Context) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Some(inner) = strip_quotes(token) {
        return Some(substitute(inner, ctx));
    }

    if let Some(caps) = POSITIONAL_RE.captures(token) {
        return positional(&caps[1], ctx);
    }

    if let Some(caps) = BRACED_RE.captures(token) {
        let name = caps[1].trim();
        let value = if name.chars().all(|c| c.is_ascii_digit()) {
            positional(name, ctx)
        } else {
            lookup_name(name, ctx)
        };
        return value.or_else(|| caps.get(2).map(|d| d.as_str().to_string()));
    }

    lookup_name(token, ctx)
}

fn positional(index: &str, ctx: &Context) -> Option<String> {
    let n: usize = index.parse().ok()?;
    n.checked_sub(1).and_then(|i| ctx.args.get(i)).cloned()
}

fn lookup_name(name: &str, ctx: &Context) -> Option<String> {
    if let Some(value) = ctx.vars.get(name) {
        return Some(value.clone());
    }

    let lower = name.to_lowercase();
    if let Some(value) = ctx.metadata.get(name).or_else(|| ctx.metadata.get(&lower)) {
        return Some(value.clone());
    }

    if let Ok(value) = env::var(name).or_else(|_| env::var(name.to_uppercase())) {
        return Some(value);
    }

    if CWD_RE.is_match(name) {
        return Some(ctx.working_dir.display().to_string());
    }

    None
}
