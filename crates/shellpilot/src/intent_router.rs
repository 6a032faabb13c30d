//! Intent Router - maps one input line to what the REPL should do
//!
//! Checked in order: built-in words, `alias`/`debug` prefixes, `!` direct
//! commands, `?` questions. Everything else is a natural language request.

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Blank line
    Empty,
    /// `quit` / `exit`
    Exit,
    /// `clear` / `cls`
    Clear,
    /// `help` / `--help`
    Help,
    /// `history`
    History,
    /// `alias ...` with everything after the keyword
    Alias(String),
    /// `debug <problem>`
    Debug(String),
    /// `!command`
    Direct(String),
    /// `?question` or `question?`
    Question(String),
    /// Anything else goes to translation
    Translate(String),
}

/// Route one line of input
pub fn route_intent(input: &str) -> Intent {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Intent::Empty;
    }

    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" => return Intent::Exit,
        "clear" | "cls" => return Intent::Clear,
        "help" | "--help" | "-h" => return Intent::Help,
        "history" => return Intent::History,
        _ => {}
    }

    if let Some(rest) = keyword_args(trimmed, "alias") {
        return Intent::Alias(rest.to_string());
    }
    if let Some(rest) = keyword_args(trimmed, "debug") {
        if !rest.is_empty() {
            return Intent::Debug(rest.to_string());
        }
    }

    if let Some(command) = trimmed.strip_prefix('!') {
        return Intent::Direct(command.trim().to_string());
    }

    if let Some(question) = trimmed.strip_prefix('?') {
        return Intent::Question(question.trim().to_string());
    }
    if let Some(question) = trimmed.strip_suffix('?') {
        return Intent::Question(question.trim().to_string());
    }

    Intent::Translate(trimmed.to_string())
}

/// Arguments after a leading keyword (`alias`, `alias list`), if it matches
fn keyword_args<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    if input == keyword {
        return Some("");
    }
    input
        .strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(str::trim)
}
