//! Small text-scanning helpers shared by the parsers.
//!
//! Offsets are byte offsets into UTF-8 text. Windows computed from them are
//! snapped to `char` boundaries before slicing.

/// Largest char boundary `<= idx`.
pub(crate) fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= idx`.
pub(crate) fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Up to `len` bytes of `s` ending at `pos`, with the start offset of the slice.
pub(crate) fn window_before(s: &str, pos: usize, len: usize) -> (usize, &str) {
    let end = floor_char_boundary(s, pos);
    let start = ceil_char_boundary(s, end.saturating_sub(len));
    (start, &s[start..end])
}

/// Up to `len` bytes of `s` starting at `pos`.
pub(crate) fn window_after(s: &str, pos: usize, len: usize) -> &str {
    let start = ceil_char_boundary(s, pos);
    let end = floor_char_boundary(s, start.saturating_add(len));
    &s[start..end]
}

/// Extract a brace-delimited argument starting at `open` (which must be `{`).
///
/// Nested braces are balanced by depth counting; a backslash escapes the
/// following byte so `\{` and `\}` do not change the depth. Returns the
/// inner text and the offset just past the closing brace, or `None` when the
/// braces never balance.
pub(crate) fn braced_argument(s: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[open + 1..i], i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Collapse every whitespace run to a single space and trim the ends.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_respect_char_boundaries() {
        let s = "ééééé";
        let (start, before) = window_before(s, 5, 3);
        assert!(s.is_char_boundary(start));
        assert_eq!(before, "é");
        assert_eq!(window_after(s, 1, 3), "é");
    }

    #[test]
    fn test_braced_argument_nested() {
        let s = r#"{Sj{\"{o}}din, David} rest"#;
        let (inner, end) = braced_argument(s, 0).unwrap();
        assert_eq!(inner, r#"Sj{\"{o}}din, David"#);
        assert_eq!(&s[end..], " rest");
    }

    #[test]
    fn test_braced_argument_escaped_brace() {
        let (inner, _) = braced_argument(r"{a \} b}", 0).unwrap();
        assert_eq!(inner, r"a \} b");
    }

    #[test]
    fn test_braced_argument_unbalanced() {
        assert!(braced_argument("{never closed", 0).is_none());
        assert!(braced_argument("no brace", 0).is_none());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}
