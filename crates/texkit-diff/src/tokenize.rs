//! LaTeX-aware tokenization for inline diffs.
//!
//! Tokens are commands, single non-letter escapes, brackets, word runs,
//! horizontal whitespace runs, comments, newlines and punctuation runs.
//! Tokenization is lossless: concatenating the tokens yields the input.

use std::sync::LazyLock;

use regex::Regex;

/// Alternatives are tried in order; the first that matches at a position wins.
static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\\[a-zA-Z]+\*?",
        r"|\\[^a-zA-Z]",
        r"|[{}\[\]]",
        r"|\w+",
        r"|[ \t]+",
        r"|%[^\n]*\n?",
        r"|\n",
        r"|[^\w\s\\{}\[\]%]+",
        r"|(?s:.)",
    ))
    .expect("valid token regex")
});

/// Commands whose braced argument is kept together as one token.
///
/// Diffing `\textbf{a b}` against `\textbf{a c}` then marks the whole
/// command as changed instead of producing `\textbf{a \odiff{b}...}`.
pub const FORMATTING_COMMANDS: &[&str] = &[
    "textbf", "textit", "texttt", "textsc", "textrm", "textsf", "emph", "underline", "textsl",
    "textmd", "textup", "bf", "it", "tt", "sc", "rm", "sf", "sl", "md", "up", "tiny",
    "scriptsize", "footnotesize", "small", "normalsize", "large", "Large", "LARGE", "huge",
    "Huge", "textcolor", "color", "colorbox", "label", "ref", "cite", "citep", "citet",
];

/// Split `text` into diff tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<&str> {
    RE_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

fn is_formatting_command(token: &str) -> bool {
    token
        .strip_prefix('\\')
        .map(|name| name.strip_suffix('*').unwrap_or(name))
        .is_some_and(|name| FORMATTING_COMMANDS.contains(&name))
}

/// Merge each formatting command with its immediately following braced
/// argument into one token.
///
/// A command not directly followed by `{`, or whose brace is never closed,
/// stays a token of its own.
#[must_use]
pub fn group_commands(tokens: &[&str]) -> Vec<String> {
    let mut grouped = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        if is_formatting_command(token) && tokens.get(i + 1) == Some(&"{") {
            if let Some(end) = matching_brace(tokens, i + 1) {
                grouped.push(tokens[i..=end].concat());
                i = end + 1;
                continue;
            }
        }
        grouped.push(token.to_string());
        i += 1;
    }

    grouped
}

/// Index of the `}` token closing the `{` token at `open`.
fn matching_brace(tokens: &[&str], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match *token {
            "{" => depth += 1,
            "}" => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Tokenize and group in one step.
#[must_use]
pub fn diff_tokens(text: &str) -> Vec<String> {
    group_commands(&tokenize(text))
}
