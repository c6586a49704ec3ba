//! # texkit-diff
//!
//! Inline diffs of two versions of a LaTeX document, rendered as LaTeX.
//!
//! Lines are aligned first. Unchanged lines are copied, removed and added
//! blocks are wrapped whole, and lines that changed are compared token by
//! token so only the edited words are marked.
//!
//! ## Markup
//!
//! | Macro | Marks |
//! |-------|-------|
//! | `\odiff{...}` | Removed tokens (red, struck out) |
//! | `\ndiff{...}` | Added tokens (green) |
//! | `\old{...}` | Removed lines |
//! | `\new{...}` | Added lines |
//!
//! The definitions are written at the top of the output as [`DIFF_HEADER`];
//! the document needs `xcolor` and `ulem` loaded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let doc = texkit_diff::diff_files(
//!     Path::new("draft-v1.tex"),
//!     Path::new("draft-v2.tex"),
//!     Path::new("changes.tex"),
//! )?;
//! println!("{} lines processed", doc.lines_processed);
//! # Ok::<(), texkit_diff::DiffError>(())
//! ```
//!
//! ## Limitations
//!
//! Formatting commands, `\label`, `\ref` and `\cite` are compared together
//! with their braced argument. Changes inside labels, references and
//! comments are taken over from the new version without markup.

pub mod error;
pub mod matcher;
pub mod render;
pub mod tokenize;

pub use error::{DiffError, Result};
pub use matcher::{Match, Opcode, SequenceMatcher, Tag};
pub use render::{
    diff_documents, diff_files, diff_lines, line_changes, Change, DiffDocument, DIFF_HEADER,
};
pub use tokenize::{diff_tokens, group_commands, tokenize, FORMATTING_COMMANDS};
