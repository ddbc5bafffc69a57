// File: src/core/punctuation.rs
use crate::core::normalizer::{canonical_apostrophe, APOSTROPHE};

/// Punctuation that ends a word. Apostrophes are handled separately.
pub const BOUNDARY: &str = ".,;:!?()[]{}\\/\"";

/// Punctuation that may absorb an engine-inserted trailing space.
pub const AUTO_SPACE: &str = ".,;:!?\"'";

/// The key that closed a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Space,
    Enter,
    Punctuation(char),
    Other(char),
}

impl Boundary {
    pub fn from_char(c: char) -> Self {
        match canonical_apostrophe(c) {
            ' ' => Boundary::Space,
            '\n' | '\r' => Boundary::Enter,
            p if BOUNDARY.contains(p) || p == APOSTROPHE => Boundary::Punctuation(p),
            other => Boundary::Other(other),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Boundary::Space => ' ',
            Boundary::Enter => '\n',
            Boundary::Punctuation(c) | Boundary::Other(c) => c,
        }
    }

    pub fn absorbs_auto_space(self) -> bool {
        matches!(self, Boundary::Punctuation(c) if AUTO_SPACE.contains(c))
    }
}

pub fn is_boundary_punctuation(c: char) -> bool {
    BOUNDARY.contains(canonical_apostrophe(c))
}

/// Whether `ch` separates words. An apostrophe is part of a word only
/// right after a letter or digit.
pub fn is_word_boundary(ch: char, prev: Option<char>) -> bool {
    let c = canonical_apostrophe(ch);
    if c.is_whitespace() || BOUNDARY.contains(c) {
        return true;
    }
    if c == APOSTROPHE {
        return !prev.map(canonical_apostrophe).is_some_and(|p| p.is_alphanumeric());
    }
    !c.is_alphanumeric()
}

/// Span of the word touching the cursor, as char counts before and after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAtCursor {
    pub word: String,
    pub chars_before: usize,
    pub chars_after: usize,
}

/// Finds the word around the cursor given the text on either side of it.
pub fn word_at_cursor(before: &str, after: &str) -> Option<WordAtCursor> {
    let before: Vec<char> = before.chars().collect();
    let after: Vec<char> = after.chars().collect();

    let mut start = before.len();
    while start > 0 {
        let prev = if start >= 2 { Some(before[start - 2]) } else { None };
        if is_word_boundary(before[start - 1], prev) {
            break;
        }
        start -= 1;
    }
    let mut end = 0;
    while end < after.len() {
        let prev = if end == 0 { before.last().copied() } else { Some(after[end - 1]) };
        if is_word_boundary(after[end], prev) {
            break;
        }
        end += 1;
    }

    let word: String = before[start..].iter().chain(after[..end].iter()).collect();
    if word.trim().is_empty() {
        return None;
    }
    Some(WordAtCursor {
        word,
        chars_before: before.len() - start,
        chars_after: end,
    })
}
