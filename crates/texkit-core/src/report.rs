//! Structured results of an assembly run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::captions::CaptionInfo;
use crate::labels::{DuplicateLabel, Label, LabelType, Reference};

/// A recoverable problem absorbed during processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An include target (or the main file) does not exist
    FileNotFound {
        name: String,
        included_from: Option<PathBuf>,
    },
    /// A file was reached a second time and not expanded again
    CircularInclusion { path: PathBuf },
    /// A file exists but could not be read or decoded
    ReadFailure { path: PathBuf, reason: String },
    /// A bibliography database named by the document is missing or unreadable
    BibliographyNotFound { path: PathBuf },
    /// A cited key has no bibliography record
    CitationNotFound { key: String },
    /// A bib field was skipped
    MalformedBibEntry { key: String, fragment: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound {
                name,
                included_from: Some(from),
            } => write!(f, "File not found: {name} (included from {})", from.display()),
            Self::FileNotFound { name, .. } => write!(f, "File not found: {name}"),
            Self::CircularInclusion { path } => {
                write!(f, "Circular inclusion: {}", path.display())
            }
            Self::ReadFailure { path, reason } => {
                write!(f, "Error reading {}: {reason}", path.display())
            }
            Self::BibliographyNotFound { path } => {
                write!(f, "Bibliography file not found: {}", path.display())
            }
            Self::CitationNotFound { key } => write!(f, "Citation not found: {key}"),
            Self::MalformedBibEntry { key, fragment } => {
                write!(f, "Skipped malformed field in '{key}': {fragment}")
            }
        }
    }
}

/// Which bibliography mechanism the document used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BibliographyMode {
    #[default]
    None,
    /// `\bibliography{...}` with optional `\bibliographystyle{...}`
    Traditional,
    /// `\addbibresource{...}` plus `\printbibliography`
    Biblatex,
}

/// Counts and validation results for one assembled document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    pub files_processed: usize,
    pub citations_found: usize,
    pub labels_found: usize,
    pub references_found: usize,
    pub bibliography_mode: BibliographyMode,
    pub labels_by_type: BTreeMap<LabelType, Vec<String>>,
    pub undefined_references: Vec<Reference>,
    pub unused_labels: Vec<Label>,
    pub duplicate_labels: Vec<DuplicateLabel>,
    pub missing_captions: Vec<CaptionInfo>,
    /// Cited keys without a bibliography record, in cited order
    pub missing_citations: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProcessingReport {
    /// True when no label, reference or citation problem was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.undefined_references.is_empty()
            && self.duplicate_labels.is_empty()
            && self.missing_captions.is_empty()
            && self.missing_citations.is_empty()
    }
}
