//! Caption to label association for floats.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::labels::{LabelIndex, LabelType};
use crate::scan::{braced_argument, collapse_whitespace, window_after, window_before};

static RE_CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\caption\*?\s*(?:\[[^\]]*\])?\s*\{").expect("valid caption regex")
});
static RE_FLOAT_BEGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{(figure|table|longtable|listing|lstlisting)\*?\}")
        .expect("valid float regex")
});
static RE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\label\{([^}]+)\}").expect("valid label regex"));

/// Bytes searched around a caption for its float and its label.
pub const DEFAULT_CAPTION_WINDOW: usize = 500;

/// Caption state of one float label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionInfo {
    pub label: String,
    /// Caption text with whitespace collapsed
    pub caption: Option<String>,
    pub caption_type: LabelType,
    pub has_caption: bool,
    pub caption_offset: Option<usize>,
    pub label_offset: Option<usize>,
}

/// Pairs `\caption{...}` commands with the label that follows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionAssociator {
    pub window: usize,
}

impl Default for CaptionAssociator {
    fn default() -> Self {
        Self {
            window: DEFAULT_CAPTION_WINDOW,
        }
    }
}

impl CaptionAssociator {
    /// Caption information keyed by label name.
    ///
    /// A caption is attached to the first `\label` within the window after
    /// its opening brace, so a label inside the caption text counts. The
    /// caption type is the last figure, table or listing environment begun
    /// within the window before it, or `Unknown` when there is none. Float
    /// labels from `index` that end up without a caption are reported with
    /// `has_caption == false`.
    #[must_use]
    pub fn associate(&self, content: &str, index: &LabelIndex) -> BTreeMap<String, CaptionInfo> {
        let mut captions = BTreeMap::new();

        for m in RE_CAPTION.find_iter(content) {
            let open = m.end() - 1;
            let Some((text, _)) = braced_argument(content, open) else {
                log::debug!("Unbalanced caption argument at offset {}", m.start());
                continue;
            };

            let (_, before) = window_before(content, m.start(), self.window);
            let float = RE_FLOAT_BEGIN
                .captures_iter(before)
                .last()
                .and_then(|cap| LabelType::from_environment(cap.get(1)?.as_str()))
                .unwrap_or(LabelType::Unknown);

            // from the opening brace so `\caption{...\label{x}}` links x
            let after = window_after(content, open, self.window);
            let Some(label) = RE_LABEL.captures(after) else {
                log::debug!("No label within {} bytes of caption at {}", self.window, m.start());
                continue;
            };
            let (Some(whole), Some(name)) = (label.get(0), label.get(1)) else {
                continue;
            };

            captions.insert(
                name.as_str().to_string(),
                CaptionInfo {
                    label: name.as_str().to_string(),
                    caption: Some(collapse_whitespace(text)),
                    caption_type: float,
                    has_caption: true,
                    caption_offset: Some(m.start()),
                    label_offset: Some(open + whole.start()),
                },
            );
        }

        for (name, label) in index.labels() {
            if label.label_type.expects_caption() && !captions.contains_key(name) {
                captions.insert(
                    name.clone(),
                    CaptionInfo {
                        label: name.clone(),
                        caption: None,
                        caption_type: label.label_type,
                        has_caption: false,
                        caption_offset: None,
                        label_offset: Some(label.offset),
                    },
                );
            }
        }

        captions
    }

    /// Float labels without a caption, by name.
    #[must_use]
    pub fn missing_captions(&self, content: &str, index: &LabelIndex) -> Vec<String> {
        self.associate(content, index)
            .into_values()
            .filter(|info| !info.has_caption)
            .map(|info| info.label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelTracker;

    fn associate(content: &str) -> BTreeMap<String, CaptionInfo> {
        let index = LabelTracker::default().extract(content);
        CaptionAssociator::default().associate(content, &index)
    }

    #[test]
    fn test_caption_before_label() {
        let content = r"\begin{figure}
\includegraphics{cat}
\caption{A  cat,
  sitting}
\label{fig:cat}
\end{figure}";
        let captions = associate(content);
        let info = &captions["fig:cat"];
        assert!(info.has_caption);
        assert_eq!(info.caption.as_deref(), Some("A cat, sitting"));
        assert_eq!(info.caption_type, LabelType::Figure);
        assert_eq!(info.label_offset, content.find(r"\label"));
        assert_eq!(info.caption_offset, content.find(r"\caption"));
    }

    #[test]
    fn test_nested_braces_and_short_title() {
        let content = r"\begin{table}\caption[Short]{Results for \textbf{all} runs}\label{tab:r}\end{table}";
        let captions = associate(content);
        assert_eq!(
            captions["tab:r"].caption.as_deref(),
            Some(r"Results for \textbf{all} runs")
        );
        assert_eq!(captions["tab:r"].caption_type, LabelType::Table);
    }

    #[test]
    fn test_float_without_caption() {
        let content = r"\begin{figure}\label{fig:bare}\end{figure}
\section{S}\label{sec:s}";
        let captions = associate(content);
        let info = &captions["fig:bare"];
        assert!(!info.has_caption);
        assert!(info.caption.is_none());
        assert!(!captions.contains_key("sec:s"));

        let index = LabelTracker::default().extract(content);
        assert_eq!(
            CaptionAssociator::default().missing_captions(content, &index),
            vec!["fig:bare"]
        );
    }

    #[test]
    fn test_caption_outside_float_has_unknown_type() {
        let content = r"\caption{Loose}\label{fig:loose}";
        let captions = associate(content);
        let info = &captions["fig:loose"];
        assert!(info.has_caption);
        assert_eq!(info.caption.as_deref(), Some("Loose"));
        assert_eq!(info.caption_type, LabelType::Unknown);
    }

    #[test]
    fn test_float_begun_outside_window_has_unknown_type() {
        let gap = "x".repeat(600);
        let content = format!("\\begin{{table}}{gap}\\caption{{Wide}}\\label{{tab:wide}}\\end{{table}}");
        let captions = associate(&content);
        let info = &captions["tab:wide"];
        assert!(info.has_caption);
        assert_eq!(info.caption_type, LabelType::Unknown);
    }

    #[test]
    fn test_label_inside_caption() {
        let content = r"\begin{figure}\caption{Cats\label{fig:a}}\end{figure}
\begin{figure}\caption{Dogs}\label{fig:b}\end{figure}";
        let captions = associate(content);

        let cats = &captions["fig:a"];
        assert!(cats.has_caption);
        assert_eq!(cats.caption.as_deref(), Some(r"Cats\label{fig:a}"));
        assert_eq!(cats.label_offset, content.find(r"\label{fig:a}"));

        let dogs = &captions["fig:b"];
        assert!(dogs.has_caption);
        assert_eq!(dogs.caption.as_deref(), Some("Dogs"));
        assert_eq!(dogs.label_offset, content.find(r"\label{fig:b}"));
    }

    #[test]
    fn test_label_too_far_after_caption() {
        let gap = " ".repeat(600);
        let content = format!("\\begin{{figure}}\\caption{{Far}}{gap}\\label{{fig:far}}\\end{{figure}}");
        let captions = associate(&content);
        assert!(!captions["fig:far"].has_caption);
    }
}
