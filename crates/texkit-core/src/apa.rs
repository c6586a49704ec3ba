//! APA-style `\bibitem` rendering.
//!
//! Output shape:
//!
//! ```text
//! \bibitem[<short label>]{<key>} <APA authors> (<year>). <type-specific body> \url{https://doi.org/<doi>}.
//! ```
//!
//! The short label is what natbib shows in author-year citations:
//! `Smith(2020)`, `Smith and Doe(2020)`, `Smith et. al.(2020)`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::bibtex::{BibEntry, EntryType};

static RE_AUTHOR_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+and\s+").expect("valid author separator regex"));
// A brace group without nested braces, optionally owned by a preceding command.
static RE_PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\[a-zA-Z]+\s*)?\{([^{}]*)\}").expect("valid protected-title regex")
});

/// Last name of a single author: text before the first comma, or the final token.
fn last_name(author: &str) -> &str {
    match author.split_once(',') {
        Some((last, _)) => last.trim(),
        None => author.split_whitespace().last().unwrap_or(""),
    }
}

/// Short author/year label used inside `\bibitem[...]`.
///
/// Returns an empty string when there is no author.
#[must_use]
pub fn format_authors_short(author: &str, year: &str) -> String {
    if author.trim().is_empty() {
        return String::new();
    }

    let last_names: Vec<&str> = author.split(" and ").map(|a| last_name(a.trim())).collect();

    match last_names.as_slice() {
        [only] => format!("{only}({year})"),
        [first, second] => format!("{first} and {second}({year})"),
        [first, ..] => format!("{first} et. al.({year})"),
        [] => String::new(),
    }
}

/// `I. I.` initials from whitespace-separated given names.
fn initials(given: &str) -> Vec<String> {
    given
        .split_whitespace()
        .filter_map(|name| name.chars().next())
        .filter(|c| c.is_alphabetic())
        .map(|c| format!("{}.", c.to_uppercase()))
        .collect()
}

/// `Last, First Middle` or `First Middle Last` to `Last, F. M.`
fn format_single_author(author: &str) -> String {
    let (last, initials) = if let Some((last, given)) = author.split_once(',') {
        (last.trim(), initials(given))
    } else {
        let names: Vec<&str> = author.split_whitespace().collect();
        match names.split_last() {
            Some((last, given)) if !given.is_empty() => (*last, initials(&given.join(" "))),
            _ => return author.to_string(),
        }
    };

    if initials.is_empty() {
        last.to_string()
    } else {
        format!("{last}, {}", initials.join(" "))
    }
}

/// Full APA author list: `Last, I. I.` joined with `\&` before the final name.
#[must_use]
pub fn format_authors_apa(author: &str) -> String {
    let formatted: Vec<String> = RE_AUTHOR_SEPARATOR
        .split(author.trim())
        .map(|a| format_single_author(a.trim()))
        .collect();

    match formatted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} \\& {second}"),
        [init @ .., last] => format!("{}, \\& {last}", init.join(", ")),
    }
}

/// Strip one level of BibTeX case-protection braces.
///
/// `{DNA} sequencing` becomes `DNA sequencing`; groups owned by a command
/// (`\emph{x}`) and groups containing nested braces are left alone.
#[must_use]
pub fn strip_title_braces(title: &str) -> String {
    RE_PROTECTED
        .replace_all(title, |caps: &Captures| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                caps[2].to_string()
            }
        })
        .into_owned()
}

/// `https://doi.org/<doi>` with BibTeX-escaped underscores undone.
#[must_use]
pub fn doi_url(doi: &str) -> String {
    let cleaned = doi.replace(r"{\_}", "_").replace(r"{\\_}", "_");
    format!("https://doi.org/{cleaned}")
}

/// Placeholder item for a cited key that has no bibliography record.
#[must_use]
pub fn missing_bibitem(key: &str) -> String {
    format!("\\bibitem{{{key}}} % Citation not found: {key}")
}

/// Render one entry as an APA `\bibitem`.
#[must_use]
pub fn format_bibitem(key: &str, entry: &BibEntry) -> String {
    let author = entry.get("author").unwrap_or("");
    let year = entry.get("year").unwrap_or("");
    let title = entry.get("title").map(strip_title_braces).unwrap_or_default();

    let mut out = if author.is_empty() {
        format!("\\bibitem{{{key}}}")
    } else {
        format!(
            "\\bibitem[{}]{{{key}}} {} ",
            format_authors_short(author, year),
            format_authors_apa(author)
        )
    };
    if !year.is_empty() {
        out.push_str(&format!("({year}). "));
    }

    match entry.entry_type() {
        EntryType::Article => write_article(&mut out, &title, entry),
        EntryType::Book => write_book(&mut out, &title, entry),
        EntryType::InProceedings | EntryType::Conference | EntryType::InCollection => {
            write_in_proceedings(&mut out, &title, entry);
        }
        EntryType::TechReport => write_tech_report(&mut out, &title, entry),
        EntryType::PhdThesis => write_thesis(&mut out, &title, entry, "Doctoral dissertation"),
        EntryType::MastersThesis => write_thesis(&mut out, &title, entry, "Master's thesis"),
        EntryType::Misc | EntryType::Other(_) => write_generic(&mut out, &title, entry),
    }

    if let Some(doi) = entry.get("doi") {
        out.push_str(&format!(" \\url{{{}}}.", doi_url(doi)));
    }

    out
}

// Author (Year). Title. \textit{Journal}, Volume(Number), pages.
fn write_article(out: &mut String, title: &str, entry: &BibEntry) {
    if !title.is_empty() {
        out.push_str(&format!("{title}. "));
    }
    if let Some(journal) = entry.get("journal") {
        out.push_str(&format!(" \\textit{{{journal}}}"));
        if let Some(volume) = entry.get("volume") {
            out.push_str(&format!(", {volume}"));
            if let Some(number) = entry.get("number") {
                out.push_str(&format!("({number})"));
            }
        }
        if let Some(pages) = entry.get("pages") {
            out.push_str(&format!(", {pages}"));
        }
        out.push('.');
    }
}

fn write_book(out: &mut String, title: &str, entry: &BibEntry) {
    if !title.is_empty() {
        out.push_str(&format!("\\textit{{{title}}}. "));
    }
    if let Some(publisher) = entry.get("publisher") {
        out.push_str(&format!(" {publisher}"));
        if let Some(address) = entry.get("address") {
            out.push_str(&format!(": {address}"));
        }
        out.push('.');
    }
}

fn write_in_proceedings(out: &mut String, title: &str, entry: &BibEntry) {
    if !title.is_empty() {
        out.push_str(&format!("{title}. "));
    }
    if let Some(booktitle) = entry.get("booktitle") {
        out.push_str(&format!("In \\textit{{{booktitle}}}"));
        if let Some(pages) = entry.get("pages") {
            out.push_str(&format!(" (pp. {pages})"));
        }
        out.push('.');
    }
}

fn write_tech_report(out: &mut String, title: &str, entry: &BibEntry) {
    if !title.is_empty() {
        out.push_str(&format!("{title}."));
    }
    out.push_str(" Technical Report");
    if let Some(institution) = entry.get("institution") {
        out.push_str(&format!(", {institution}"));
    }
    out.push('.');
}

fn write_thesis(out: &mut String, title: &str, entry: &BibEntry, kind: &str) {
    if !title.is_empty() {
        out.push_str(&format!("\\textit{{{title}}} "));
    }
    match entry.get("school") {
        Some(school) => out.push_str(&format!("[{kind}, {school}].")),
        None => out.push_str(&format!("[{kind}].")),
    }
}

fn write_generic(out: &mut String, title: &str, entry: &BibEntry) {
    if !title.is_empty() {
        out.push_str(&format!("{title}."));
    }
    if let Some(how) = entry.get("howpublished") {
        out.push_str(&format!(" {how}."));
    }
}
