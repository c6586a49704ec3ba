//! Document diffs end to end.

use proptest::prelude::*;
use texkit_diff::{diff_documents, diff_lines, tokenize, SequenceMatcher, Tag, DIFF_HEADER};

fn body(doc: &str) -> &str {
    doc.strip_prefix(DIFF_HEADER).unwrap()
}

#[test]
fn test_identical_documents_copy_through() {
    let text = "\\section{Intro}\nSome text.\n\n% comment\n";
    let doc = diff_documents(text, text);
    assert_eq!(body(&doc.content), text);
    assert_eq!(doc.lines_processed, 4);
}

#[test]
fn test_empty_documents() {
    let doc = diff_documents("", "");
    assert_eq!(doc.content, DIFF_HEADER);
    assert_eq!(doc.lines_processed, 0);
}

#[test]
fn test_whole_document_added() {
    let doc = diff_documents("", "a\nb\n");
    assert_eq!(body(&doc.content), "\\new{a\nb\n}\n");
    assert_eq!(doc.lines_processed, 2);
}

#[test]
fn test_header_defines_all_macros() {
    for name in [r"\odiff", r"\ndiff", r"\old", r"\new"] {
        assert!(DIFF_HEADER.contains(&format!(r"\newcommand{{{name}}}")), "{name}");
    }
}

#[test]
fn test_citation_change_is_atomic() {
    assert_eq!(
        diff_lines(r"as shown \cite{smith2020}.", r"as shown \cite{jones2021}."),
        r"as shown \odiff{\cite{smith2020}}\ndiff{\cite{jones2021}}."
    );
}

#[test]
fn test_comment_taken_from_new_side() {
    assert_eq!(diff_lines("x % old note", "x % new note"), "x % new note");
}

#[test]
fn test_crlf_input() {
    let doc = diff_documents("a\r\nb\r\n", "a\nc\n");
    assert_eq!(body(&doc.content), "a\n\\odiff{b}\\ndiff{c}\n");
}

proptest! {
    #[test]
    fn tokenize_is_lossless(text in "\\PC{0,200}") {
        prop_assert_eq!(tokenize(&text).concat(), text);
    }

    #[test]
    fn opcodes_cover_both_sides(a in "[ab ]{0,40}", b in "[ab ]{0,40}") {
        let (a, b): (Vec<char>, Vec<char>) = (a.chars().collect(), b.chars().collect());
        let ops = SequenceMatcher::new(&a, &b).opcodes();
        let (mut i, mut j) = (0, 0);
        for op in &ops {
            prop_assert_eq!(op.a.start, i);
            prop_assert_eq!(op.b.start, j);
            if op.tag == Tag::Equal {
                prop_assert_eq!(&a[op.a.clone()], &b[op.b.clone()]);
            }
            i = op.a.end;
            j = op.b.end;
        }
        prop_assert_eq!((i, j), (a.len(), b.len()));
    }

    #[test]
    fn identical_lines_are_unmarked(line in "[a-zA-Z ,.]{0,80}") {
        prop_assert_eq!(diff_lines(&line, &line), line);
    }
}
