//! LaTeX rendering of document diffs.

use std::fs;
use std::path::Path;

use texkit_core::encoding::read_text;

use crate::error::{DiffError, Result};
use crate::matcher::{SequenceMatcher, Tag};
use crate::tokenize::diff_tokens;

/// Macro definitions written at the top of every diff document.
pub const DIFF_HEADER: &str = concat!(
    "% LaTeX Diff Macros - Add these at the top of your document\n",
    "% \\usepackage{xcolor}\n",
    "% \\usepackage{soul}\n",
    "% \\usepackage{ulem}\n",
    "\\newcommand{\\odiff}[1]{\\textcolor{red}{\\sout{#1}}} % Old text: red + strikethrough\n",
    "\\newcommand{\\ndiff}[1]{\\textcolor{green!60!black}{#1}} % New text: green\n",
    "\\newcommand{\\old}[1]{\\textcolor{red}{#1}} % Removed lines: red\n",
    "\\newcommand{\\new}[1]{\\textcolor{green!60!black}{#1}} % Added lines: green\n",
    "\n",
);

/// One piece of a token-level comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Equal(String),
    Removed(String),
    Added(String),
}

/// A rendered diff document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffDocument {
    /// Header followed by the marked-up body
    pub content: String,
    /// Lines walked: equal, removed and added lines, plus one per replaced pair
    pub lines_processed: usize,
}

/// Comments, labels and references are taken from the new side unmarked.
fn is_verbatim(segment: &[String]) -> bool {
    segment.first().is_some_and(|first| {
        first.starts_with('%') || first.starts_with(r"\label") || first.starts_with(r"\ref")
    })
}

/// Mark up the token-level differences between two lines.
///
/// Deleted runs become `\odiff{...}` and inserted runs `\ndiff{...}`. A
/// single leading space of an inserted run stays outside the macro.
#[must_use]
pub fn diff_lines(old: &str, new: &str) -> String {
    let old_tokens = diff_tokens(old);
    let new_tokens = diff_tokens(new);
    let matcher = SequenceMatcher::new(&old_tokens, &new_tokens);
    let mut out = String::with_capacity(old.len() + new.len());

    for op in matcher.opcodes() {
        let old_segment = &old_tokens[op.a];
        let new_segment = &new_tokens[op.b];

        if op.tag == Tag::Equal {
            out.push_str(&old_segment.concat());
            continue;
        }
        if is_verbatim(old_segment) {
            if matches!(op.tag, Tag::Replace | Tag::Insert) {
                out.push_str(&new_segment.concat());
            }
            continue;
        }

        match op.tag {
            Tag::Delete => {
                out.push_str(&format!(r"\odiff{{{}}}", old_segment.concat()));
            }
            Tag::Replace => {
                let old_text = old_segment.concat();
                match new_segment.split_first() {
                    Some((first, rest)) if first == " " => {
                        out.push_str(&format!(r"\odiff{{{old_text}}} \ndiff{{{}}}", rest.concat()));
                    }
                    _ => {
                        out.push_str(&format!(
                            r"\odiff{{{old_text}}}\ndiff{{{}}}",
                            new_segment.concat()
                        ));
                    }
                }
            }
            Tag::Insert => match new_segment.split_first() {
                Some((first, rest)) if first == " " => {
                    out.push_str(&format!(r" \ndiff{{{}}}", rest.concat()));
                }
                _ => out.push_str(&format!(r"\ndiff{{{}}}", new_segment.concat())),
            },
            Tag::Equal => {}
        }
    }

    out
}

/// Token-level changes between two lines, for display.
#[must_use]
pub fn line_changes(old: &str, new: &str) -> Vec<Change> {
    let old_tokens = diff_tokens(old);
    let new_tokens = diff_tokens(new);
    let matcher = SequenceMatcher::new(&old_tokens, &new_tokens);
    let mut changes = Vec::new();

    for op in matcher.opcodes() {
        let removed = old_tokens[op.a].concat();
        let added = new_tokens[op.b].concat();
        match op.tag {
            Tag::Equal => changes.push(Change::Equal(removed)),
            Tag::Delete => changes.push(Change::Removed(removed)),
            Tag::Insert => changes.push(Change::Added(added)),
            Tag::Replace => {
                changes.push(Change::Removed(removed));
                changes.push(Change::Added(added));
            }
        }
    }

    changes
}

/// Compare two documents line by line, refining replaced lines by token.
///
/// Unchanged lines are copied. Removed blocks are wrapped in `\old{...}` and
/// added blocks in `\new{...}`, one line per source line. Replaced blocks are
/// paired line by line and each pair goes through [`diff_lines`]; a side that
/// runs out of lines contributes empty lines.
#[must_use]
pub fn diff_documents(old: &str, new: &str) -> DiffDocument {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let matcher = SequenceMatcher::new(&old_lines, &new_lines);

    let mut content = String::from(DIFF_HEADER);
    let mut lines_processed = 0usize;

    for op in matcher.opcodes() {
        let old_block = &old_lines[op.a];
        let new_block = &new_lines[op.b];
        match op.tag {
            Tag::Equal => {
                for line in old_block {
                    content.push_str(line);
                    content.push('\n');
                }
                lines_processed += old_block.len();
            }
            Tag::Delete => {
                push_block(&mut content, "old", old_block);
                lines_processed += old_block.len();
            }
            Tag::Insert => {
                push_block(&mut content, "new", new_block);
                lines_processed += new_block.len();
            }
            Tag::Replace => {
                let pairs = old_block.len().max(new_block.len());
                for k in 0..pairs {
                    let old_line = old_block.get(k).copied().unwrap_or("");
                    let new_line = new_block.get(k).copied().unwrap_or("");
                    content.push_str(&diff_lines(old_line, new_line));
                    content.push('\n');
                }
                lines_processed += pairs;
            }
        }
    }

    log::debug!("Diffed {lines_processed} lines");
    DiffDocument {
        content,
        lines_processed,
    }
}

fn push_block(content: &mut String, macro_name: &str, lines: &[&str]) {
    content.push('\\');
    content.push_str(macro_name);
    content.push('{');
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    content.push_str("}\n");
}

/// Diff two files and write the result to `output`.
///
/// # Errors
///
/// Returns an error if an input cannot be read or the output cannot be
/// written. Nothing is written when an input fails.
pub fn diff_files(old_path: &Path, new_path: &Path, output: &Path) -> Result<DiffDocument> {
    log::info!(
        "Comparing {} with {}",
        old_path.display(),
        new_path.display()
    );
    let old = read_text(old_path)?;
    let new = read_text(new_path)?;

    let document = diff_documents(&old, &new);
    fs::write(output, &document.content).map_err(|e| DiffError::write_error(output, e))?;
    log::info!(
        "Wrote diff to {} ({} lines processed)",
        output.display(),
        document.lines_processed
    );
    Ok(document)
}
