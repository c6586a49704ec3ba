//! Label and reference tracking.
//!
//! Every `\label{...}` is recorded with its offset, a context window and an
//! inferred [`LabelType`]. The type comes from the closest float environment
//! or sectioning command that starts in the text just before the label; if
//! none is found, the label's naming prefix (`fig:`, `tab:`, ...) decides.
//!
//! The inference is a heuristic. A label nested inside several environments
//! takes the type of whichever `\begin` is textually closest, which is not
//! always the enclosing float.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::scan::{window_after, window_before};

static RE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\label\{([^}]+)\}").expect("valid label regex"));
static RE_TYPED_ENV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\begin\{(figure|table|longtable|supertabular|equation|align|gather|multline|listing|lstlisting)\*?\}",
    )
    .expect("valid environment regex")
});
static RE_SECTIONING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(subsubsection|subsection|section)\{").expect("valid sectioning regex")
});
static RE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(eq)?ref\{([^}]+)\}").expect("valid ref regex"));
static RE_CLEVER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(autoref|cref|Cref)\{([^}]+)\}").expect("valid autoref regex"));

/// Bytes of context kept on each side of a label.
pub const DEFAULT_CONTEXT_WINDOW: usize = 200;
/// Bytes searched backwards from a label for its environment.
pub const DEFAULT_TYPE_LOOKBACK: usize = 500;

/// What a label points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    Figure,
    Table,
    Equation,
    Listing,
    Section,
    Subsection,
    Subsubsection,
    Unknown,
}

impl LabelType {
    /// Canonical type of an environment or sectioning command name.
    #[must_use]
    pub fn from_environment(name: &str) -> Option<Self> {
        let ty = match name {
            "figure" => Self::Figure,
            "table" | "longtable" | "supertabular" => Self::Table,
            "equation" | "align" | "gather" | "multline" => Self::Equation,
            "listing" | "lstlisting" => Self::Listing,
            "section" => Self::Section,
            "subsection" => Self::Subsection,
            "subsubsection" => Self::Subsubsection,
            _ => return None,
        };
        Some(ty)
    }

    /// Type implied by a conventional label prefix.
    #[must_use]
    pub fn from_prefix(label: &str) -> Self {
        const PREFIXES: [(&str, LabelType); 5] = [
            ("fig:", LabelType::Figure),
            ("tab:", LabelType::Table),
            ("sec:", LabelType::Section),
            ("eq:", LabelType::Equation),
            ("lst:", LabelType::Listing),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| label.starts_with(prefix))
            .map_or(Self::Unknown, |&(_, ty)| ty)
    }

    /// Floats that are expected to carry a caption
    #[must_use]
    pub const fn expects_caption(self) -> bool {
        matches!(self, Self::Figure | Self::Table | Self::Listing)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Figure => "figure",
            Self::Table => "table",
            Self::Equation => "equation",
            Self::Listing => "listing",
            Self::Section => "section",
            Self::Subsection => "subsection",
            Self::Subsubsection => "subsubsection",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LabelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `\label{...}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    #[serde(rename = "type")]
    pub label_type: LabelType,
    /// Trimmed text around the label; advisory only, no semantic boundary
    pub context: String,
    /// Byte offset of `\label` in the assembled document
    pub offset: usize,
}

/// Reference command flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefKind {
    #[serde(rename = "ref")]
    Ref,
    #[serde(rename = "eqref")]
    EqRef,
    #[serde(rename = "autoref")]
    AutoRef,
    #[serde(rename = "cref")]
    CRef,
    #[serde(rename = "Cref")]
    CapitalCRef,
}

impl RefKind {
    /// Command name without the backslash
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Ref => "ref",
            Self::EqRef => "eqref",
            Self::AutoRef => "autoref",
            Self::CRef => "cref",
            Self::CapitalCRef => "Cref",
        }
    }

    fn from_command(name: &str) -> Option<Self> {
        match name {
            "ref" => Some(Self::Ref),
            "eqref" => Some(Self::EqRef),
            "autoref" => Some(Self::AutoRef),
            "cref" => Some(Self::CRef),
            "Cref" => Some(Self::CapitalCRef),
            _ => None,
        }
    }

    /// cleveref commands accept comma-separated label lists
    const fn accepts_list(self) -> bool {
        matches!(self, Self::CRef | Self::CapitalCRef)
    }
}

/// One reference to a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub target: String,
    pub kind: RefKind,
    pub offset: usize,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\{}{{{}}}", self.kind.command(), self.target)
    }
}

/// A label defined more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateLabel {
    pub name: String,
    pub occurrences: Vec<Label>,
}

/// Infer a label's type from the text preceding `offset`.
///
/// The closest environment-begin or sectioning command within `lookback`
/// bytes wins; otherwise the label name's prefix is used.
#[must_use]
pub fn infer_label_type(content: &str, offset: usize, name: &str, lookback: usize) -> LabelType {
    let (_, preceding) = window_before(content, offset, lookback);

    let closest_env = RE_TYPED_ENV
        .captures_iter(preceding)
        .filter_map(|cap| Some((cap.get(0)?.start(), cap.get(1)?.as_str())))
        .last();
    let closest_section = RE_SECTIONING
        .captures_iter(preceding)
        .filter_map(|cap| Some((cap.get(0)?.start(), cap.get(1)?.as_str())))
        .last();

    let closest = match (closest_env, closest_section) {
        (Some(env), Some(sec)) => Some(if env.0 >= sec.0 { env } else { sec }),
        (env, sec) => env.or(sec),
    };

    closest
        .and_then(|(_, name)| LabelType::from_environment(name))
        .unwrap_or_else(|| LabelType::from_prefix(name))
}

/// Scans a document for labels and references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTracker {
    pub context_window: usize,
    pub type_lookback: usize,
}

impl Default for LabelTracker {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            type_lookback: DEFAULT_TYPE_LOOKBACK,
        }
    }
}

impl LabelTracker {
    /// Collect every label and reference in `content`.
    #[must_use]
    pub fn extract(&self, content: &str) -> LabelIndex {
        let mut index = LabelIndex::default();

        for cap in RE_LABEL.captures_iter(content) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let offset = whole.start();
            let (_, before) = window_before(content, offset, self.context_window);
            let after = window_after(content, offset, self.context_window);
            let label = Label {
                name: name.as_str().to_string(),
                label_type: infer_label_type(content, offset, name.as_str(), self.type_lookback),
                context: format!("{before}{after}").trim().to_string(),
                offset,
            };

            index
                .labels
                .entry(label.name.clone())
                .or_insert_with(|| label.clone());
            index
                .occurrences
                .entry(label.name.clone())
                .or_default()
                .push(label);
        }

        for cap in RE_REF.captures_iter(content) {
            let kind = if cap.get(1).is_some() {
                RefKind::EqRef
            } else {
                RefKind::Ref
            };
            push_references(&mut index.references, &cap, kind);
        }
        for cap in RE_CLEVER_REF.captures_iter(content) {
            if let Some(kind) = RefKind::from_command(&cap[1]) {
                push_references(&mut index.references, &cap, kind);
            }
        }
        index.references.sort_by_key(|r| r.offset);

        index
    }
}

fn push_references(out: &mut Vec<Reference>, cap: &regex::Captures<'_>, kind: RefKind) {
    let (Some(whole), Some(arg)) = (cap.get(0), cap.get(2)) else {
        return;
    };
    let offset = whole.start();
    if kind.accepts_list() {
        out.extend(
            arg.as_str()
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|target| Reference {
                    target: target.to_string(),
                    kind,
                    offset,
                }),
        );
    } else {
        out.push(Reference {
            target: arg.as_str().to_string(),
            kind,
            offset,
        });
    }
}

/// Labels and references of one document, with consistency queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelIndex {
    labels: BTreeMap<String, Label>,
    occurrences: BTreeMap<String, Vec<Label>>,
    references: Vec<Reference>,
}

impl LabelIndex {
    /// First occurrence of each label, by name
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, Label> {
        &self.labels
    }

    #[must_use]
    pub fn label(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    /// Every occurrence of `name`, in document order
    #[must_use]
    pub fn occurrences(&self, name: &str) -> &[Label] {
        self.occurrences.get(name).map_or(&[], Vec::as_slice)
    }

    /// All references in document order
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// References whose target is not a defined label.
    #[must_use]
    pub fn undefined_references(&self) -> Vec<&Reference> {
        self.references
            .iter()
            .filter(|r| !self.labels.contains_key(&r.target))
            .collect()
    }

    /// Labels nothing refers to, by name.
    #[must_use]
    pub fn unused_labels(&self) -> Vec<&Label> {
        self.labels
            .values()
            .filter(|l| !self.references.iter().any(|r| r.target == l.name))
            .collect()
    }

    /// Labels defined more than once, with every occurrence.
    #[must_use]
    pub fn duplicate_labels(&self) -> Vec<DuplicateLabel> {
        self.occurrences
            .iter()
            .filter(|(_, occ)| occ.len() > 1)
            .map(|(name, occ)| DuplicateLabel {
                name: name.clone(),
                occurrences: occ.clone(),
            })
            .collect()
    }

    /// Label names grouped by type, each group sorted.
    #[must_use]
    pub fn labels_by_type(&self) -> BTreeMap<LabelType, Vec<String>> {
        let mut groups: BTreeMap<LabelType, Vec<String>> = BTreeMap::new();
        for label in self.labels.values() {
            groups
                .entry(label.label_type)
                .or_default()
                .push(label.name.clone());
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> LabelIndex {
        LabelTracker::default().extract(content)
    }

    #[test]
    fn test_label_in_figure() {
        let content = r"\begin{figure}
\centering
\caption{Cats}
\label{fig:x}
\end{figure}";
        let index = extract(content);
        let label = index.label("fig:x").unwrap();
        assert_eq!(label.label_type, LabelType::Figure);
        assert_eq!(label.offset, content.find(r"\label").unwrap());
        assert!(label.context.contains(r"\caption{Cats}"));
    }

    #[test]
    fn test_environment_synonyms() {
        let content = r"\begin{longtable}{ll}\label{a}\end{longtable}
\begin{align*}x\label{b}\end{align*}
\begin{lstlisting}\label{c}\end{lstlisting}";
        let index = extract(content);
        assert_eq!(index.label("a").unwrap().label_type, LabelType::Table);
        assert_eq!(index.label("b").unwrap().label_type, LabelType::Equation);
        assert_eq!(index.label("c").unwrap().label_type, LabelType::Listing);
    }

    #[test]
    fn test_closest_preceding_wins() {
        let content = r"\section{Intro}\label{s}
\begin{table}\label{t}\end{table}
\subsection{More}\label{ss}";
        let index = extract(content);
        assert_eq!(index.label("s").unwrap().label_type, LabelType::Section);
        assert_eq!(index.label("t").unwrap().label_type, LabelType::Table);
        assert_eq!(index.label("ss").unwrap().label_type, LabelType::Subsection);
    }

    #[test]
    fn test_starred_section_not_a_sectioning_command() {
        let content = r"\begin{figure}\end{figure}\section*{Notes}\label{n} \section*{X}\label{sec:x}";
        let index = extract(content);
        // the figure is still the closest recognised command
        assert_eq!(index.label("n").unwrap().label_type, LabelType::Figure);
        assert_eq!(index.label("sec:x").unwrap().label_type, LabelType::Figure);

        let bare = extract(r"\section*{Notes}\label{n}");
        assert_eq!(bare.label("n").unwrap().label_type, LabelType::Unknown);
    }

    #[test]
    fn test_prefix_fallback_outside_lookback() {
        let padding = "x".repeat(600);
        let content = format!("\\begin{{figure}}{padding}\\label{{eq:far}} \\label{{plain}}");
        let index = extract(&content);
        assert_eq!(index.label("eq:far").unwrap().label_type, LabelType::Equation);
        assert_eq!(index.label("plain").unwrap().label_type, LabelType::Unknown);
    }

    #[test]
    fn test_reference_kinds_not_deduplicated() {
        let content = r"\ref{a} \eqref{b} \autoref{a} \cref{a,c} \Cref{d} \ref{a}";
        let index = extract(content);
        let kinds: Vec<(&str, RefKind)> = index
            .references()
            .iter()
            .map(|r| (r.target.as_str(), r.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a", RefKind::Ref),
                ("b", RefKind::EqRef),
                ("a", RefKind::AutoRef),
                ("a", RefKind::CRef),
                ("c", RefKind::CRef),
                ("d", RefKind::CapitalCRef),
                ("a", RefKind::Ref),
            ]
        );
    }

    #[test]
    fn test_consistency_queries() {
        let content = r"\section{A}\label{sec:a}
\section{B}\label{sec:b}
See \ref{sec:a} and \ref{sec:missing}.";
        let index = extract(content);

        let undefined: Vec<&str> = index
            .undefined_references()
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(undefined, vec!["sec:missing"]);

        let unused: Vec<&str> = index.unused_labels().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(unused, vec!["sec:b"]);
        assert_eq!(index.undefined_references()[0].to_string(), r"\ref{sec:missing}");
    }

    #[test]
    fn test_duplicates_keep_first_and_track_all() {
        let content = r"\begin{figure}\label{dup}\end{figure}
\begin{equation}\label{dup}\end{equation}";
        let index = extract(content);

        assert_eq!(index.labels().len(), 1);
        assert_eq!(index.label("dup").unwrap().label_type, LabelType::Figure);

        let dups = index.duplicate_labels();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].name, "dup");
        let types: Vec<LabelType> = dups[0].occurrences.iter().map(|l| l.label_type).collect();
        assert_eq!(types, vec![LabelType::Figure, LabelType::Equation]);
        assert!(dups[0].occurrences[0].offset < dups[0].occurrences[1].offset);
    }

    #[test]
    fn test_labels_by_type() {
        let content = r"\label{fig:b} \label{fig:a} \label{tab:x}";
        let groups = extract(content).labels_by_type();
        assert_eq!(groups[&LabelType::Figure], vec!["fig:a", "fig:b"]);
        assert_eq!(groups[&LabelType::Table], vec!["tab:x"]);
    }
}
