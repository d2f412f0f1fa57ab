//! Shell word quoting

/// Quote a single word for a POSIX shell
pub fn shell_escape(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }

    let safe = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%'));
    if safe {
        return word.to_string();
    }

    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Join words into a single shell-safe string
pub fn shell_join(words: &[String]) -> String {
    words
        .iter()
        .map(|w| shell_escape(w))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain_word() {
        assert_eq!(shell_escape("build"), "build");
        assert_eq!(shell_escape("path/to/file.txt"), "path/to/file.txt");
    }

    #[test]
    fn test_escape_spaces_and_quotes() {
        assert_eq!(shell_escape("hello world"), "'hello world'");
        assert_eq!(shell_escape("it's"), r"'it'\''s'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn test_join() {
        let words = vec!["one".to_string(), "two words".to_string()];
        assert_eq!(shell_join(&words), "one 'two words'");
    }
}
