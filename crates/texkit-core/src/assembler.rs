//! Single-file document assembly.
//!
//! A run has three passes over one owned text buffer:
//!
//! 1. inclusion expansion from the main file,
//! 2. label, reference and caption extraction,
//! 3. bibliography inlining.
//!
//! Pass 3 is a small dispatch. When the document has both `\addbibresource`
//! and `\printbibliography` it is treated as BibLaTeX; otherwise a
//! `\bibliography{...}` command selects the traditional path; with neither
//! the text passes through untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::apa::{format_bibitem, missing_bibitem};
use crate::bibtex::{BibParser, Bibliography};
use crate::captions::{CaptionAssociator, CaptionInfo, DEFAULT_CAPTION_WINDOW};
use crate::citations::extract_cited_keys;
use crate::error::{Result, TexkitError};
use crate::include::{InclusionResolver, DEFAULT_MAX_DEPTH};
use crate::labels::{LabelIndex, LabelTracker, DEFAULT_CONTEXT_WINDOW, DEFAULT_TYPE_LOOKBACK};
use crate::report::{BibliographyMode, Diagnostic, ProcessingReport};

static RE_BIBLIOGRAPHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\bibliography\s*\{([^}]+)\}").expect("valid bibliography regex")
});
static RE_BIBLIOGRAPHY_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\bibliographystyle\s*\{[^}]+\}\s*").expect("valid bibliographystyle regex")
});
static RE_ADD_BIB_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\addbibresource\s*(?:\[[^\]]*\])?\s*\{([^}]+)\}[ \t]*\n?")
        .expect("valid addbibresource regex")
});
static RE_PRINT_BIBLIOGRAPHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\printbibliography(?:[ \t]*\[([^\]]*)\])?").expect("valid printbibliography regex")
});
static RE_TITLE_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|,)\s*title\s*=\s*(\{[^}]*\}|[^,]+)").expect("valid title option regex")
});

const BIB_EXTENSION: &str = ".bib";

/// Tuning knobs for an assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerOptions {
    /// Deepest allowed inclusion nesting
    pub max_depth: usize,
    /// Bytes of context kept around each label
    pub context_window: usize,
    /// Bytes searched backwards to type a label
    pub type_lookback: usize,
    /// Bytes searched around a caption
    pub caption_window: usize,
    /// Heading used when `\printbibliography` has no `title=`
    pub default_bibliography_title: String,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            context_window: DEFAULT_CONTEXT_WINDOW,
            type_lookback: DEFAULT_TYPE_LOOKBACK,
            caption_window: DEFAULT_CAPTION_WINDOW,
            default_bibliography_title: "References".to_string(),
        }
    }
}

/// Output of one run: the assembled text plus everything learned about it.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Assembled document, or filtered `.bib` records in bibliography-only mode
    pub content: String,
    pub report: ProcessingReport,
    pub labels: LabelIndex,
    pub captions: BTreeMap<String, CaptionInfo>,
    /// Cited keys in first-appearance order
    pub cited_keys: Vec<String>,
}

/// Assembles a multi-file LaTeX tree into one document.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    main_file: PathBuf,
    base_dir: PathBuf,
    options: AssemblerOptions,
}

impl DocumentAssembler {
    /// Assembler rooted at the directory containing `main_file`.
    pub fn new(main_file: impl Into<PathBuf>) -> Self {
        let main_file = main_file.into();
        let base_dir = main_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            main_file,
            base_dir,
            options: AssemblerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: AssemblerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn main_file(&self) -> &Path {
        &self.main_file
    }

    #[must_use]
    pub const fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Run all passes and return the assembled document.
    ///
    /// # Errors
    ///
    /// Fails only when inclusion nesting exceeds the depth limit.
    pub fn process(&self) -> Result<Assembly> {
        let mut run = self.analyze()?;

        let content = std::mem::take(&mut run.content);
        let content = match run.mode {
            BibliographyMode::None => {
                log::debug!("No bibliography command found");
                content
            }
            BibliographyMode::Traditional => self.inline_traditional(content, &mut run),
            BibliographyMode::Biblatex => self.inline_biblatex(content, &mut run),
        };
        run.content = content;

        Ok(run.finish())
    }

    /// Run all passes and write the result to `output`.
    ///
    /// Nothing is written when the run fails.
    ///
    /// # Errors
    ///
    /// Returns the depth error from [`process`](Self::process) or a
    /// [`TexkitError::WriteError`].
    pub fn process_to(&self, output: &Path) -> Result<ProcessingReport> {
        let assembly = self.process()?;
        std::fs::write(output, &assembly.content)
            .map_err(|e| TexkitError::write_error(output, e))?;
        log::info!("Successfully created {}", output.display());
        Ok(assembly.report)
    }

    /// The verbatim `.bib` records of every cited key, in cited order.
    ///
    /// The document itself is analyzed as in [`process`](Self::process) but
    /// not rewritten; `content` holds the records separated by blank lines.
    ///
    /// # Errors
    ///
    /// Fails only when inclusion nesting exceeds the depth limit.
    pub fn bibliography_only(&self) -> Result<Assembly> {
        let mut run = self.analyze()?;

        let names = match run.mode {
            BibliographyMode::None => Vec::new(),
            BibliographyMode::Traditional => traditional_resources(&run.content),
            BibliographyMode::Biblatex => biblatex_resources(&run.content),
        };

        let mut records = Vec::new();
        if let Some(bibliography) = self.load_bibliographies(&names, &mut run.diagnostics) {
            let mut missing = Vec::new();
            for key in &run.cited_keys {
                match bibliography.get(key) {
                    Some(entry) => records.push(entry.raw().to_string()),
                    None => missing.push(key.clone()),
                }
            }
            for key in &missing {
                run.note_missing(key);
            }
        }

        run.content = if records.is_empty() {
            String::new()
        } else {
            format!("{}\n", records.join("\n\n"))
        };
        Ok(run.finish())
    }

    fn analyze(&self) -> Result<Run> {
        log::info!("Processing {}", self.main_file.display());

        let mut resolver =
            InclusionResolver::new(&self.base_dir).with_max_depth(self.options.max_depth);
        let content = resolver.resolve(&self.main_file, 0)?;
        let (opened, diagnostics) = resolver.into_parts();

        let tracker = LabelTracker {
            context_window: self.options.context_window,
            type_lookback: self.options.type_lookback,
        };
        let labels = tracker.extract(&content);
        let captions = CaptionAssociator {
            window: self.options.caption_window,
        }
        .associate(&content, &labels);

        let mode = detect_mode(&content);
        log::debug!("Bibliography mode: {mode:?}");

        Ok(Run {
            cited_keys: extract_cited_keys(&content),
            content,
            files_processed: opened.len(),
            labels,
            captions,
            mode,
            missing: Vec::new(),
            diagnostics,
        })
    }

    fn inline_traditional(&self, content: String, run: &mut Run) -> String {
        let names = traditional_resources(&content);
        let Some(bibliography) = self.load_bibliographies(&names, &mut run.diagnostics) else {
            return content;
        };

        let block = run.bibliography_block(&bibliography);
        let content = RE_BIBLIOGRAPHY_STYLE.replace_all(&content, "");
        RE_BIBLIOGRAPHY
            .replace_all(&content, NoExpand(&block))
            .into_owned()
    }

    fn inline_biblatex(&self, content: String, run: &mut Run) -> String {
        let names = biblatex_resources(&content);
        let Some(bibliography) = self.load_bibliographies(&names, &mut run.diagnostics) else {
            return content;
        };

        let title = RE_PRINT_BIBLIOGRAPHY
            .captures(&content)
            .and_then(|cap| cap.get(1))
            .and_then(|options| bibliography_title(options.as_str()))
            .unwrap_or_else(|| self.options.default_bibliography_title.clone());
        let replacement = format!(
            "\\renewcommand{{\\refname}}{{{title}}}\n{}",
            run.bibliography_block(&bibliography)
        );

        let content = RE_ADD_BIB_RESOURCE.replace_all(&content, "");
        RE_PRINT_BIBLIOGRAPHY
            .replace_all(&content, NoExpand(&replacement))
            .into_owned()
    }

    /// Parse and merge the named databases; `None` if none could be read.
    fn load_bibliographies(
        &self,
        names: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Bibliography> {
        let mut merged: Option<Bibliography> = None;

        for name in names {
            let path = self.base_dir.join(with_bib_extension(name));
            if !path.exists() {
                log::warn!("Bibliography file not found: {}", path.display());
                diagnostics.push(Diagnostic::BibliographyNotFound { path });
                continue;
            }
            match BibParser::parse_file(&path) {
                Ok(bibliography) => {
                    for skipped in bibliography.skipped_fields() {
                        log::warn!(
                            "Skipped malformed field in '{}': {}",
                            skipped.key,
                            skipped.fragment
                        );
                        diagnostics.push(Diagnostic::MalformedBibEntry {
                            key: skipped.key.clone(),
                            fragment: skipped.fragment.clone(),
                        });
                    }
                    merged.get_or_insert_with(Bibliography::new).extend(bibliography);
                }
                Err(err) => {
                    log::warn!("{err}");
                    diagnostics.push(Diagnostic::ReadFailure {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        merged
    }
}

/// Mutable state of one run, owned by the assembler call.
struct Run {
    content: String,
    files_processed: usize,
    labels: LabelIndex,
    captions: BTreeMap<String, CaptionInfo>,
    cited_keys: Vec<String>,
    mode: BibliographyMode,
    missing: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Run {
    fn note_missing(&mut self, key: &str) {
        log::warn!("Citation key '{key}' not found in bibliography");
        self.missing.push(key.to_string());
        self.diagnostics.push(Diagnostic::CitationNotFound {
            key: key.to_string(),
        });
    }

    /// `thebibliography` environment with one item per cited key.
    fn bibliography_block(&mut self, bibliography: &Bibliography) -> String {
        let keys = self.cited_keys.clone();
        let items: Vec<String> = keys
            .iter()
            .map(|key| match bibliography.get(key) {
                Some(entry) => format_bibitem(key, entry),
                None => {
                    self.note_missing(key);
                    missing_bibitem(key)
                }
            })
            .collect();
        format!(
            "\\begin{{thebibliography}}{{99}}\n{}\n\\end{{thebibliography}}",
            items.join("\n\n")
        )
    }

    fn finish(self) -> Assembly {
        let labels = self.labels;
        let report = ProcessingReport {
            files_processed: self.files_processed,
            citations_found: self.cited_keys.len(),
            labels_found: labels.labels().len(),
            references_found: labels.references().len(),
            bibliography_mode: self.mode,
            labels_by_type: labels.labels_by_type(),
            undefined_references: labels.undefined_references().into_iter().cloned().collect(),
            unused_labels: labels.unused_labels().into_iter().cloned().collect(),
            duplicate_labels: labels.duplicate_labels(),
            missing_captions: self
                .captions
                .values()
                .filter(|info| !info.has_caption)
                .cloned()
                .collect(),
            missing_citations: self.missing,
            diagnostics: self.diagnostics,
        };
        log::info!(
            "Processed {} files, {} citations, {} labels, {} references",
            report.files_processed,
            report.citations_found,
            report.labels_found,
            report.references_found
        );

        Assembly {
            content: self.content,
            report,
            labels,
            captions: self.captions,
            cited_keys: self.cited_keys,
        }
    }
}

fn detect_mode(content: &str) -> BibliographyMode {
    if RE_ADD_BIB_RESOURCE.is_match(content) && RE_PRINT_BIBLIOGRAPHY.is_match(content) {
        BibliographyMode::Biblatex
    } else if RE_BIBLIOGRAPHY.is_match(content) {
        BibliographyMode::Traditional
    } else {
        BibliographyMode::None
    }
}

/// Database names from the first `\bibliography{a,b}`.
fn traditional_resources(content: &str) -> Vec<String> {
    RE_BIBLIOGRAPHY
        .captures(content)
        .map(|cap| split_names(&cap[1]))
        .unwrap_or_default()
}

/// Database names from every `\addbibresource{...}`.
fn biblatex_resources(content: &str) -> Vec<String> {
    RE_ADD_BIB_RESOURCE
        .captures_iter(content)
        .flat_map(|cap| split_names(&cap[1]))
        .collect()
}

fn split_names(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn with_bib_extension(name: &str) -> String {
    if name.ends_with(BIB_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{BIB_EXTENSION}")
    }
}

/// `title=` value from `\printbibliography` options, braces stripped.
fn bibliography_title(options: &str) -> Option<String> {
    let value = RE_TITLE_OPTION.captures(options)?.get(1)?.as_str().trim();
    let value = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(value)
        .trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(detect_mode("plain"), BibliographyMode::None);
        assert_eq!(
            detect_mode(r"\bibliographystyle{apa}\bibliography{refs}"),
            BibliographyMode::Traditional
        );
        assert_eq!(
            detect_mode("\\addbibresource{r.bib}\n\\printbibliography"),
            BibliographyMode::Biblatex
        );
        // both markers are needed for BibLaTeX
        assert_eq!(
            detect_mode("\\addbibresource{r.bib}\n\\bibliography{r}"),
            BibliographyMode::Traditional
        );
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(traditional_resources(r"\bibliography{a, b.bib}"), vec!["a", "b.bib"]);
        assert_eq!(
            biblatex_resources("\\addbibresource{x.bib}\n\\addbibresource[location=local]{y.bib}\n"),
            vec!["x.bib", "y.bib"]
        );
        assert_eq!(with_bib_extension("refs"), "refs.bib");
        assert_eq!(with_bib_extension("refs.bib"), "refs.bib");
    }

    #[test]
    fn test_bibliography_title() {
        assert_eq!(bibliography_title("title=Results").as_deref(), Some("Results"));
        assert_eq!(
            bibliography_title("heading=bibintoc, title={Further Reading}").as_deref(),
            Some("Further Reading")
        );
        assert_eq!(bibliography_title("heading=none"), None);
        assert_eq!(bibliography_title("subtitle=x"), None);
    }

    #[test]
    fn test_default_options() {
        let options = AssemblerOptions::default();
        assert_eq!(options.max_depth, 50);
        assert_eq!(options.context_window, 200);
        assert_eq!(options.type_lookback, 500);
        assert_eq!(options.caption_window, 500);
        assert_eq!(options.default_bibliography_title, "References");
    }
}
