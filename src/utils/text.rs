//! Character-level text helpers shared by the detectors and the extractor.
//!
//! All public offsets in Scrivo are char offsets (Unicode scalar values), which
//! is what an editing surface reports as a cursor position. Regex matching works
//! on byte offsets, so the conversion lives here.

/// Whether `c` is a CJK ideograph (unified, extension A, or compatibility).
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

/// Whether `c` participates in a Latin-style word (letters, digits, underscore).
///
/// CJK ideographs are alphanumeric too, but callers treat them as individually
/// boundary-safe, so they check [`is_cjk`] first.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Sentence-ending punctuation for both Latin and CJK prose.
pub fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '…' | '\n')
}

/// Closing quotes that belong to the sentence they terminate (`。”`).
pub fn is_closing_quote(c: char) -> bool {
    matches!(c, '”' | '’' | '」' | '』' | '"' | '\'' | '）' | ')')
}

/// Number of chars in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Convert a byte offset (which must lie on a char boundary) to a char offset.
pub fn byte_to_char(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

/// Slice `chars[start..end]` into an owned string, clamping both ends.
pub fn slice_chars(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    let start = start.min(end);
    chars[start..end].iter().collect()
}

/// Truncate `s` to at most `max_chars` chars, never splitting a char.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Truncate with a trailing ellipsis when `s` exceeds `max_chars`.
///
/// The ellipsis counts toward the budget, so the output is at most
/// `max_chars` chars long.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if char_len(s) <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// Last `max_chars` chars of `s`.
pub fn tail_chars(s: &str, max_chars: usize) -> String {
    let len = char_len(s);
    s.chars().skip(len.saturating_sub(max_chars)).collect()
}
