//! Property-Based Tests
//!
//! Invariants of the scanners over generated input:
//! - Cited keys are unique and follow first appearance
//! - Undefined references and unused labels follow their definitions
//! - Every duplicate definition is typed by its own surroundings
//! - Include expansion leaves include-free text untouched
//! - Parsers never panic on arbitrary text

use std::collections::HashSet;

use proptest::prelude::*;
use tempfile::TempDir;
use texkit_core::labels::{infer_label_type, DEFAULT_TYPE_LOOKBACK};
use texkit_core::{extract_cited_keys, BibParser, InclusionResolver, LabelTracker, LabelType};

// ============================================================================
// Citation Properties
// ============================================================================

/// Property: the cited-key list has one entry per distinct key, in first-seen order
#[test]
fn proptest_cited_keys_unique_in_order() {
    proptest!(|(keys in prop::collection::vec("[A-Za-z][A-Za-z0-9]{0,6}", 0..20))| {
        let content: String = keys.iter().map(|k| format!("\\cite{{{k}}} ")).collect();
        let extracted = extract_cited_keys(&content);

        let mut seen = HashSet::new();
        let expected: Vec<String> = keys
            .iter()
            .filter(|k| seen.insert(k.as_str()))
            .cloned()
            .collect();
        prop_assert_eq!(extracted, expected);
    });
}

/// Property: citation extraction never panics
#[test]
fn proptest_citations_no_panic() {
    proptest!(|(text in "\\PC{0,300}")| {
        let _ = extract_cited_keys(&text);
    });
}

// ============================================================================
// Label / Reference Properties
// ============================================================================

/// Property: undefined references and unused labels match their definitions
#[test]
fn proptest_reference_consistency() {
    proptest!(|(
        labels in prop::collection::vec("[a-e]", 0..6),
        refs in prop::collection::vec("[a-h]", 0..8),
    )| {
        let mut content = String::new();
        for name in &labels {
            content.push_str(&format!("\\label{{{name}}}\n"));
        }
        for name in &refs {
            content.push_str(&format!("\\ref{{{name}}}\n"));
        }

        let index = LabelTracker::default().extract(&content);

        for reference in index.undefined_references() {
            prop_assert!(!labels.contains(&reference.target));
        }
        for label in index.unused_labels() {
            prop_assert!(!refs.contains(&label.name));
        }
        for name in &refs {
            let undefined = index.undefined_references().iter().any(|r| &r.target == name);
            prop_assert_eq!(undefined, !labels.contains(name));
        }
        for dup in index.duplicate_labels() {
            prop_assert!(labels.iter().filter(|l| **l == dup.name).count() >= 2);
        }
    });
}

/// Property: each definition of a duplicated label is typed from its own context
#[test]
fn proptest_duplicate_occurrences_typed_locally() {
    let blocks = prop::collection::vec(
        (
            prop::sample::select(vec![
                "figure",
                "table",
                "equation",
                "align",
                "lstlisting",
                "section",
                "subsection",
            ]),
            "[a-z ]{0,40}",
        ),
        2..6,
    );
    proptest!(|(blocks in blocks)| {
        let mut content = String::new();
        for (env, filler) in &blocks {
            if env.contains("section") {
                content.push_str(&format!("\\{env}{{T}}{filler}\\label{{dup}}\n"));
            } else {
                content.push_str(&format!(
                    "\\begin{{{env}}}{filler}\\label{{dup}}\\end{{{env}}}\n"
                ));
            }
        }

        let index = LabelTracker::default().extract(&content);
        let duplicates = index.duplicate_labels();
        prop_assert_eq!(duplicates.len(), 1);
        let occurrences = &duplicates[0].occurrences;
        prop_assert_eq!(occurrences.len(), blocks.len());

        for (occurrence, (env, _)) in occurrences.iter().zip(&blocks) {
            let local = infer_label_type(&content, occurrence.offset, "dup", DEFAULT_TYPE_LOOKBACK);
            prop_assert_eq!(occurrence.label_type, local);
            prop_assert_eq!(Some(occurrence.label_type), LabelType::from_environment(env));
        }
        // the first definition is the canonical one
        prop_assert_eq!(index.label("dup").map(|l| l.offset), Some(occurrences[0].offset));
    });
}

/// Property: label extraction handles arbitrary Unicode around a label
#[test]
fn proptest_labels_unicode_context() {
    proptest!(|(text in "[^\\\\{}]{0,400}")| {
        let content = format!("{text}\\label{{x}}{text}");
        let index = LabelTracker::default().extract(&content);
        prop_assert!(index.label("x").is_some());
    });
}

// ============================================================================
// Inclusion Properties
// ============================================================================

/// Property: a document without include commands resolves to itself
#[test]
fn proptest_include_free_text_is_identity() {
    proptest!(ProptestConfig::with_cases(32), |(text in "[a-zA-Z0-9 {}%\n]{0,200}")| {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.tex");
        std::fs::write(&main, &text).unwrap();

        let mut resolver = InclusionResolver::new(dir.path());
        prop_assert_eq!(resolver.resolve(&main, 0).unwrap(), text);
    });
}

// ============================================================================
// Bibliography Properties
// ============================================================================

/// Property: the bib parser never panics
#[test]
fn proptest_bib_parser_no_panic() {
    proptest!(|(text in "\\PC{0,400}")| {
        let _ = BibParser::parse(&text);
        let wrapped = format!("@article{{k,\n{text}\n}}\n");
        let _ = BibParser::parse(&wrapped);
    });
}
