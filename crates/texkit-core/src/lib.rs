//! # texkit-core
//!
//! Single-file assembly of multi-file LaTeX documents.
//!
//! Given a main `.tex` file this crate inlines every `\input` / `\include`,
//! replaces the bibliography command with an APA-formatted `thebibliography`
//! block holding only the cited entries, and checks label, reference and
//! caption consistency along the way.
//!
//! ## Supported Commands
//!
//! | Command | Handling |
//! |---------|----------|
//! | `\input{}`, `\include{}` | Recursive inlining, cycle and depth guarded |
//! | `\bibliography{}`, `\bibliographystyle{}` | Replaced by `thebibliography` |
//! | `\addbibresource{}`, `\printbibliography[title=...]` | Replaced by `\refname` + `thebibliography` |
//! | `\cite`, `\citep`, `\citet`, `\parencite`, `\textcite`, `\autocite` | Cited keys, first-appearance order |
//! | `\label{}` | Typed from the surrounding environment |
//! | `\ref`, `\eqref`, `\autoref`, `\cref`, `\Cref` | Reference records |
//! | `\caption{}` | Associated with the following label |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use texkit_core::DocumentAssembler;
//! use std::path::Path;
//!
//! let assembler = DocumentAssembler::new("paper/main.tex");
//! let report = assembler.process_to(Path::new("onefile.tex"))?;
//!
//! println!("Files processed: {}", report.files_processed);
//! for reference in &report.undefined_references {
//!     println!("Undefined: {reference}");
//! }
//! # Ok::<(), texkit_core::TexkitError>(())
//! ```
//!
//! ## Error Model
//!
//! Only inclusion nesting deeper than [`AssemblerOptions::max_depth`] fails a
//! run. Missing files, circular includes, unreadable files, unknown citation
//! keys and malformed bib fields leave a comment marker or placeholder in the
//! output and a [`Diagnostic`] in the [`ProcessingReport`].
//!
//! ## Limitations
//!
//! Scanning is pattern based. Custom macros wrapping these commands,
//! conditionals and verbatim blocks are not understood, and label typing is a
//! nearest-preceding-environment heuristic.

pub mod apa;
pub mod assembler;
pub mod bibtex;
pub mod captions;
pub mod citations;
pub mod encoding;
pub mod error;
pub mod include;
pub mod labels;
pub mod report;
mod scan;

pub use assembler::{AssemblerOptions, Assembly, DocumentAssembler};
pub use bibtex::{BibEntry, BibParser, Bibliography, EntryType};
pub use captions::{CaptionAssociator, CaptionInfo};
pub use citations::extract_cited_keys;
pub use error::{Result, TexkitError};
pub use include::InclusionResolver;
pub use labels::{DuplicateLabel, Label, LabelIndex, LabelTracker, LabelType, RefKind, Reference};
pub use report::{BibliographyMode, Diagnostic, ProcessingReport};
