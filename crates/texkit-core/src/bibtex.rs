//! BibTeX database parsing.
//!
//! Entries are located with a multi-line pattern that runs from `@type{key,`
//! to the first closing brace sitting on its own line. That anchors entries
//! whose fields span several lines without balancing braces at the entry
//! level. Inside an entry, fields are read by an explicit scanner that counts
//! brace depth, so values such as `Sj{\"{o}}din` survive intact.
//!
//! ```
//! use texkit_core::bibtex::{BibParser, EntryType};
//!
//! let bib = BibParser::parse("@article{A,\n  author = {Smith, John},\n  year = {2020}\n}\n");
//! let entry = bib.get("A").unwrap();
//! assert_eq!(entry.entry_type(), &EntryType::Article);
//! assert_eq!(entry.get("author"), Some("Smith, John"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::encoding::read_text;
use crate::error::Result;
use crate::scan::{braced_argument, collapse_whitespace};

static RE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)@(\w+)\s*\{\s*([^,\s]+)\s*,\s*(.*?)\n\s*\}").expect("valid bib entry regex")
});

/// Name of the synthetic field holding the lowercased `@type`.
pub const ENTRY_TYPE_FIELD: &str = "entry_type";

/// Kind of a bibliography record, from its `@type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Article,
    Book,
    InProceedings,
    Conference,
    InCollection,
    TechReport,
    PhdThesis,
    MastersThesis,
    Misc,
    /// Any other `@type`, lowercased
    Other(String),
}

impl EntryType {
    /// Classify a raw `@type` name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "article" => Self::Article,
            "book" => Self::Book,
            "inproceedings" => Self::InProceedings,
            "conference" => Self::Conference,
            "incollection" => Self::InCollection,
            "techreport" => Self::TechReport,
            "phdthesis" => Self::PhdThesis,
            "mastersthesis" => Self::MastersThesis,
            "misc" => Self::Misc,
            other => Self::Other(other.to_string()),
        }
    }

    /// Lowercased `@type` name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Article => "article",
            Self::Book => "book",
            Self::InProceedings => "inproceedings",
            Self::Conference => "conference",
            Self::InCollection => "incollection",
            Self::TechReport => "techreport",
            Self::PhdThesis => "phdthesis",
            Self::MastersThesis => "mastersthesis",
            Self::Misc => "misc",
            Self::Other(name) => name,
        }
    }

    /// Non-record blocks (`@string`, `@preamble`, `@comment`)
    fn is_directive(name: &str) -> bool {
        matches!(
            name.to_ascii_lowercase().as_str(),
            "string" | "preamble" | "comment"
        )
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed bibliography record. Immutable after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BibEntry {
    key: String,
    entry_type: EntryType,
    fields: HashMap<String, String>,
    #[serde(skip)]
    raw: String,
}

impl BibEntry {
    /// Build an entry from already-parsed fields.
    ///
    /// Field names are lowercased and the synthetic `entry_type` field is
    /// added. The verbatim source is left empty.
    #[must_use]
    pub fn new<I, K, V>(key: impl Into<String>, entry_type: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entry_type = EntryType::from_name(entry_type);
        let mut map: HashMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
            .collect();
        map.insert(ENTRY_TYPE_FIELD.to_string(), entry_type.as_str().to_string());
        Self {
            key: key.into(),
            entry_type,
            fields: map,
            raw: String::new(),
        }
    }

    /// Citation key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub const fn entry_type(&self) -> &EntryType {
        &self.entry_type
    }

    /// Field value by lowercase name. Empty values read as absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// All fields, including the synthetic `entry_type`
    #[inline]
    #[must_use]
    pub const fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Verbatim source text of the record as it appeared in the `.bib` file
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A field the scanner had to skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    /// Key of the entry containing the field
    pub key: String,
    /// Start of the offending text, for reporting
    pub fragment: String,
}

/// Parsed `.bib` database preserving file order.
///
/// A key seen twice keeps its first position and takes the later value.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: Vec<BibEntry>,
    index: HashMap<String, usize>,
    skipped: Vec<SkippedField>,
}

impl Bibliography {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any earlier entry with the same key in place.
    pub fn insert(&mut self, entry: BibEntry) {
        if let Some(&i) = self.index.get(entry.key()) {
            self.entries[i] = entry;
        } else {
            self.index.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Merge another database into this one (later values win).
    pub fn extend(&mut self, other: Self) {
        for entry in other.entries {
            self.insert(entry);
        }
        self.skipped.extend(other.skipped);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fields dropped because they could not be read
    #[must_use]
    pub fn skipped_fields(&self) -> &[SkippedField] {
        &self.skipped
    }
}

/// BibTeX parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BibParser;

impl BibParser {
    /// Parse raw `.bib` text into a key-indexed database.
    #[must_use]
    pub fn parse(text: &str) -> Bibliography {
        let mut bibliography = Bibliography::new();

        for cap in RE_ENTRY.captures_iter(text) {
            let type_name = &cap[1];
            if EntryType::is_directive(type_name) {
                continue;
            }
            let key = cap[2].to_string();
            let (fields, skipped) = parse_fields(&cap[3]);

            for fragment in skipped {
                log::debug!("Skipping unreadable field in '{key}': {fragment}");
                bibliography.skipped.push(SkippedField {
                    key: key.clone(),
                    fragment,
                });
            }

            let mut entry = BibEntry::new(key, type_name, fields);
            entry.raw = cap[0].to_string();
            bibliography.insert(entry);
        }

        bibliography
    }

    /// Read and parse a `.bib` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn parse_file(path: &Path) -> Result<Bibliography> {
        let text = read_text(path)?;
        let bibliography = Self::parse(&text);
        log::debug!(
            "Parsed {} entries from {}",
            bibliography.len(),
            path.display()
        );
        Ok(bibliography)
    }
}

const FRAGMENT_LEN: usize = 40;

fn fragment_at(body: &str, start: usize) -> String {
    body[start..].chars().take(FRAGMENT_LEN).collect::<String>().trim().to_string()
}

/// Offset of the next `,` at brace depth zero, or the end of `body`.
fn next_top_level_comma(body: &str, from: usize) -> usize {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Closing quote of a `"..."` value opened at `open`, ignoring quotes in braces.
fn closing_quote(body: &str, open: usize) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'"' if depth == 0 => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Read `name = value` pairs from an entry body.
///
/// Returns the fields in source order and the fragments that were skipped.
fn parse_fields(body: &str) -> (Vec<(String, String)>, Vec<String>) {
    let bytes = body.as_bytes();
    let mut fields = Vec::new();
    let mut skipped = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n' | b',') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b',' {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b',' {
            skipped.push(fragment_at(body, name_start));
            continue;
        }

        let name = body[name_start..i].trim().to_lowercase();
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            skipped.push(fragment_at(body, name_start));
            break;
        }

        let value = match bytes[i] {
            b'{' => match braced_argument(body, i) {
                Some((inner, end)) => {
                    i = end;
                    inner
                }
                None => {
                    skipped.push(fragment_at(body, name_start));
                    break;
                }
            },
            b'"' => match closing_quote(body, i) {
                Some(close) => {
                    let inner = &body[i + 1..close];
                    i = close + 1;
                    inner
                }
                None => {
                    skipped.push(fragment_at(body, name_start));
                    break;
                }
            },
            _ => {
                let end = next_top_level_comma(body, i);
                let inner = &body[i..end];
                i = end;
                inner
            }
        };

        if name.is_empty() || name.contains(char::is_whitespace) {
            skipped.push(fragment_at(body, name_start));
            i = next_top_level_comma(body, i);
            continue;
        }

        fields.push((name, collapse_whitespace(value)));
    }

    (fields, skipped)
}
