//! Longest-matching-block sequence alignment.
//!
//! This is the Ratcliff/Obershelp style matcher: find the longest common
//! contiguous run, then recurse on the pieces to its left and right. Runs are
//! found through an index of where each element occurs in `b`. For `b` of 200
//! or more items, elements occurring in more than 1% of positions are left out
//! of that index so that very common tokens (spaces, braces) cannot seed a
//! match on their own; they still extend a match found through rarer elements.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

/// Minimum length of `b` before popular elements are dropped from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Kind of an edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// `a[a_range]` relates to `b[b_range]` as described by `tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: Tag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

/// A run `a[a..a + len] == b[b..b + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub a: usize,
    pub b: usize,
    pub len: usize,
}

/// Aligns two sequences of hashable items.
#[derive(Debug)]
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, item) in b.iter().enumerate() {
            b2j.entry(item).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let threshold = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= threshold);
        }

        Self { a, b, b2j }
    }

    /// Longest matching run inside `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Among equally long runs the one starting earliest in `a`, then in `b`,
    /// wins. A zero-length match means there is nothing in common.
    #[must_use]
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            j2len = next;
        }

        // Grow through elements left out of the index.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        Match {
            a: best_i,
            b: best_j,
            len: best_len,
        }
    }

    /// Non-overlapping, non-adjacent matching runs in order, ending with a
    /// zero-length sentinel at `(a.len(), b.len())`.
    #[must_use]
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.len == 0 {
                continue;
            }
            blocks.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.len < ahi && m.b + m.len < bhi {
                queue.push((m.a + m.len, ahi, m.b + m.len, bhi));
            }
        }
        blocks.sort_unstable();

        let mut merged: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.len == block.a && last.b + last.len == block.b => {
                    last.len += block.len;
                }
                _ => merged.push(block),
            }
        }
        merged.push(Match {
            a: la,
            b: lb,
            len: 0,
        });
        merged
    }

    /// Edit script turning `a` into `b`.
    #[must_use]
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);

        for m in self.matching_blocks() {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode {
                    tag,
                    a: i..m.a,
                    b: j..m.b,
                });
            }
            i = m.a + m.len;
            j = m.b + m.len;
            if m.len > 0 {
                ops.push(Opcode {
                    tag: Tag::Equal,
                    a: m.a..i,
                    b: m.b..j,
                });
            }
        }

        ops
    }

    /// Similarity in `[0, 1]`: twice the matched items over the total.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matched: usize = self.matching_blocks().iter().map(|m| m.len).sum();
        2.0 * matched as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn tags(a: &str, b: &str) -> Vec<(Tag, Range<usize>, Range<usize>)> {
        let (a, b) = (chars(a), chars(b));
        SequenceMatcher::new(&a, &b)
            .opcodes()
            .into_iter()
            .map(|op| (op.tag, op.a, op.b))
            .collect()
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        let (a, b) = (chars(" abcd"), chars("abcd abcd"));
        let m = SequenceMatcher::new(&a, &b).find_longest_match(0, 5, 0, 9);
        assert_eq!(m, Match { a: 0, b: 4, len: 5 });
    }

    #[test]
    fn test_opcodes_qabxcd() {
        assert_eq!(
            tags("qabxcd", "abycdf"),
            vec![
                (Tag::Delete, 0..1, 0..0),
                (Tag::Equal, 1..3, 0..2),
                (Tag::Replace, 3..4, 2..3),
                (Tag::Equal, 4..6, 3..5),
                (Tag::Insert, 6..6, 5..6),
            ]
        );
    }

    #[test]
    fn test_matching_blocks_with_sentinel() {
        let (a, b) = (chars("abxcd"), chars("abcd"));
        let blocks = SequenceMatcher::new(&a, &b).matching_blocks();
        assert_eq!(
            blocks,
            vec![
                Match { a: 0, b: 0, len: 2 },
                Match { a: 3, b: 2, len: 2 },
                Match { a: 5, b: 4, len: 0 },
            ]
        );
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(tags("", ""), vec![]);
        assert_eq!(tags("ab", ""), vec![(Tag::Delete, 0..2, 0..0)]);
        assert_eq!(tags("", "ab"), vec![(Tag::Insert, 0..0, 0..2)]);
    }

    #[test]
    fn test_ratio() {
        let (a, b) = (chars("abcd"), chars("bcde"));
        let ratio = SequenceMatcher::new(&a, &b).ratio();
        assert!((ratio - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_popular_elements_still_extend_matches() {
        // 300 spaces make ' ' popular; the run of spaces around "x" still matches
        let a: Vec<char> = format!("x{}y", " ".repeat(300)).chars().collect();
        let b: Vec<char> = format!("x{}z", " ".repeat(300)).chars().collect();
        let ops = SequenceMatcher::new(&a, &b).opcodes();
        assert_eq!(ops[0].tag, Tag::Equal);
        assert_eq!(ops[0].a, 0..301);
        assert_eq!(ops[1].tag, Tag::Replace);
    }
}
