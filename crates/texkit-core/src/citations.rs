//! Citation key extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

// \cite, \citep, \citet and the biblatex \parencite/\textcite/\autocite,
// optionally starred, with up to two [note] arguments.
static RE_CITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\(?:cite[pt]?|parencite|textcite|autocite)\*?\s*(?:\[[^\]]*\]\s*){0,2}\{([^}]+)\}",
    )
    .expect("valid cite regex")
});

/// Cited keys in order of first appearance, without duplicates.
///
/// ```
/// use texkit_core::extract_cited_keys;
///
/// let keys = extract_cited_keys(r"\cite{Smith2020} \cite{Jones2019}\cite{Smith2020}");
/// assert_eq!(keys, vec!["Smith2020", "Jones2019"]);
/// ```
#[must_use]
pub fn extract_cited_keys(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for cap in RE_CITE.captures_iter(content) {
        for key in cap[1].split(',').map(str::trim) {
            if !key.is_empty() && seen.insert(key.to_string()) {
                keys.push(key.to_string());
            }
        }
    }

    keys
}
