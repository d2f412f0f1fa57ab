//! Yes/no confirmation prompts

use std::io::{self, BufRead, IsTerminal, Write};

/// Confirmation callback: `(question, default) -> answer`
pub type Prompter = Box<dyn FnMut(&str, bool) -> bool>;

/// Prompter that always answers with the question's default
pub fn default_prompter() -> Prompter {
    Box::new(|_question: &str, default: bool| default)
}

/// Prompter that reads answers from the terminal
///
/// A forced answer (`--yes`/`--no`) short-circuits every question. When stdin
/// is not a terminal the default is used.
pub fn terminal_prompter(forced: Option<bool>) -> Prompter {
    Box::new(move |question: &str, default: bool| {
        if let Some(answer) = forced {
            return answer;
        }
        if !io::stdin().is_terminal() {
            return default;
        }
        ask(question, default).unwrap_or(default)
    })
}

fn ask(question: &str, default: bool) -> io::Result<bool> {
    let options = if default { "[Y/n]" } else { "[y/N]" };
    let mut stderr = io::stderr();
    write!(stderr, "{} {} ", question, options)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(parse_answer(&line, default))
}

/// Interpret a typed answer; anything unrecognized keeps the default
pub fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}
