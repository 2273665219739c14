//! Term/boundary matching shared by the reference and concept detectors.
//!
//! A term matches case-insensitively wherever it is bounded by a non-word char
//! or the string edge. CJK ideographs are individually boundary-safe: prose in
//! Chinese has no spaces, so `陈云寒拿起` still yields a full match for `陈云寒`.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::utils::text::{byte_to_char, is_cjk, is_word_char};

/// One bounded occurrence of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub byte_start: usize,
    pub byte_end: usize,
    /// Char offsets.
    pub start: usize,
    pub end: usize,
    /// Text as it appears in the input (original casing).
    pub text: String,
}

/// Compile a case-insensitive literal matcher for `term`.
pub fn compile_term(term: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Failed to compile matcher for term '{}': {}", term, e);
            None
        }
    }
}

/// Whether the span `[start, end)` (bytes) sits on term boundaries.
pub fn is_bounded(text: &str, byte_start: usize, byte_end: usize) -> bool {
    let span = &text[byte_start..byte_end];
    let (Some(first), Some(last)) = (span.chars().next(), span.chars().next_back()) else {
        return false;
    };

    let left_ok = match text[..byte_start].chars().next_back() {
        None => true,
        Some(before) => !is_word_char(before) || is_cjk(before) || is_cjk(first),
    };
    let right_ok = match text[byte_end..].chars().next() {
        None => true,
        Some(after) => !is_word_char(after) || is_cjk(after) || is_cjk(last),
    };
    left_ok && right_ok
}

/// All bounded occurrences of a compiled term, including overlapping ones.
pub fn find_compiled(text: &str, matcher: &Regex) -> Vec<TermMatch> {
    let mut matches = Vec::new();
    let mut pos = 0;
    while pos <= text.len() {
        let Some(m) = matcher.find_at(text, pos) else {
            break;
        };
        if m.start() == m.end() {
            break;
        }
        if is_bounded(text, m.start(), m.end()) {
            matches.push(TermMatch {
                byte_start: m.start(),
                byte_end: m.end(),
                start: byte_to_char(text, m.start()),
                end: byte_to_char(text, m.end()),
                text: m.as_str().to_string(),
            });
        }
        // Advance one char past the match start so overlapping occurrences
        // (e.g. "aa" in "aaa") are still visited.
        pos = m.start()
            + text[m.start()..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
    }
    matches
}

/// All bounded occurrences of `term` in `text`.
pub fn find_term(text: &str, term: &str) -> Vec<TermMatch> {
    if term.is_empty() || text.is_empty() {
        return Vec::new();
    }
    match compile_term(term) {
        Some(matcher) => find_compiled(text, &matcher),
        None => Vec::new(),
    }
}

/// Whether `term` occurs at least once on boundaries.
pub fn contains_term(text: &str, term: &str) -> bool {
    if term.is_empty() || text.is_empty() {
        return false;
    }
    let Some(matcher) = compile_term(term) else {
        return false;
    };
    let mut pos = 0;
    while let Some(m) = matcher.find_at(text, pos) {
        if m.start() == m.end() {
            return false;
        }
        if is_bounded(text, m.start(), m.end()) {
            return true;
        }
        pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        if pos > text.len() {
            break;
        }
    }
    false
}

/// A run of Latin-script word chars, as a byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub byte_start: usize,
    pub byte_end: usize,
}

/// Split `text` into runs of non-CJK word chars.
pub fn latin_words(text: &str) -> Vec<WordSpan> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, c) in text.char_indices() {
        let in_word = is_word_char(c) && !is_cjk(c);
        match (in_word, start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                words.push(WordSpan {
                    byte_start: s,
                    byte_end: idx,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push(WordSpan {
            byte_start: s,
            byte_end: text.len(),
        });
    }
    words
}
