//! Exclusion heuristics applied to raw reference candidates.
//!
//! Time and quantity expressions ("这个月第三次", "this month", "two of the
//! guards") drop any candidate they overlap. The false-positive lexicon drops
//! exact matches. Negation ("不是张三", "not the Duke") only lowers confidence;
//! the threshold check does the rest.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::utils::text::{byte_to_char, is_sentence_terminator};
use crate::ScrivoError;

/// Pattern-driven filter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    TimeExpression,
    QuantityExpression,
}

const DEFAULT_TIME_PATTERNS: &[&str] = &[
    r"第[一二三四五六七八九十百两\d]+次",
    r"[一二三四五六七八九十两\d]+次了?",
    r"[再又][一二三四五六七八九十两\d]*次",
    r"[上下这那每]次",
    r"有时|偶尔",
    r"[昨今明前后]天|[昨今明]日",
    r"[早中晚]上|[上下]午",
    r"刚才|现在|马上|立刻|随即",
    r"这个月|本月|上个?月|下个?月",
    r"这个月.{0,4}次",
    r"[一二三四五六七八九十\d]+个?月",
    r"(?i)\b(this|last|next|that) (morning|evening|night|week|month|year|time)\b",
    r"(?i)\b(first|second|third|fourth|fifth|last|next|\d+(st|nd|rd|th)) time\b",
    r"(?i)\b(yesterday|today|tomorrow|tonight)\b",
];

const DEFAULT_QUANTITY_PATTERNS: &[&str] = &[
    r"[一二三四五六七八九十百千万两几\d]+[个只条件张片块]",
    r"[几多]个",
    r"[一二三四五六七八九十两\d]+[人名]",
    r"(?i)\b(\d+|one|two|three|four|five|six|seven|eight|nine|ten|a few|several|some|many|most|all|each|both) of (the )?\w+",
];

const DEFAULT_FALSE_POSITIVES: &[&str] = &[
    "第三次", "第二次", "第一次", "这次", "那次", "上次", "下次", "几次", "多次",
    "有时", "偶尔", "刚才", "现在", "马上", "昨天", "今天", "明天", "早上", "中午",
    "晚上", "下午", "一个", "两个", "三个", "几个", "多个", "一人", "两人", "三人",
    "几人", "多人",
];

/// Multi-char Chinese negation markers. The bare `非` is handled separately.
const CJK_NEGATION_MARKERS: &str = r"不是|没有|不叫|并非|不认识|不知道";

/// An English negation ending the text before a match, followed only by
/// whitespace and an optional article ("not the Duke", "never Mara").
const LATIN_NEGATION: &str =
    r"(?i)\b(not|no|never|isn't|wasn't|aren't|weren't|neither|nor)\s+((the|a|an)\s+)?$";

/// Chars that turn a preceding `非` into part of another word (除非, 是非).
const FEI_PREFIXES: &[char] = &['除', '莫', '无', '是', '并'];

/// Chars that turn a following `非` into an adverb or verb (非常, 非得).
const FEI_COMPOUND_TAILS: &[char] = &['常', '得', '要', '凡', '但', '法', '议'];

/// Contrast words that flip a preceding negation ("不是张三，而是李四").
const CONTRAST_WORDS: &[&str] = &[
    "而是", "但是", "不过", "然而", "可是", "but", "rather", "instead",
];

/// Max chars between a Chinese negation marker and the match it negates.
const NEGATION_MAX_GAP: usize = 3;

#[derive(Debug, Clone)]
struct PatternFilter {
    source: String,
    /// `None` when the pattern failed to compile (disabled).
    regex: Option<Regex>,
}

/// A time or quantity expression located in the text (char offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionSpan {
    pub start: usize,
    pub end: usize,
    pub kind: FilterKind,
}

/// Active/disabled counts for one filter family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub active: usize,
    pub disabled: usize,
}

/// The full exclusion filter set owned by a reference detector.
#[derive(Debug, Clone)]
pub struct ExclusionFilters {
    time: Vec<PatternFilter>,
    quantity: Vec<PatternFilter>,
    false_positives: HashSet<String>,
    cjk_negation: Option<Regex>,
    latin_negation: Option<Regex>,
}

impl Default for ExclusionFilters {
    fn default() -> Self {
        let mut filters = Self {
            time: Vec::new(),
            quantity: Vec::new(),
            false_positives: DEFAULT_FALSE_POSITIVES
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            cjk_negation: Regex::new(CJK_NEGATION_MARKERS).ok(),
            latin_negation: Regex::new(LATIN_NEGATION).ok(),
        };
        for pattern in DEFAULT_TIME_PATTERNS {
            let _ = filters.add_pattern(FilterKind::TimeExpression, pattern);
        }
        for pattern in DEFAULT_QUANTITY_PATTERNS {
            let _ = filters.add_pattern(FilterKind::QuantityExpression, pattern);
        }
        filters
    }
}

impl ExclusionFilters {
    /// Register a custom pattern.
    ///
    /// A malformed pattern is kept as a disabled filter (visible in the counts)
    /// and reported as an error; the remaining filters keep working.
    pub fn add_pattern(&mut self, kind: FilterKind, pattern: &str) -> Result<(), ScrivoError> {
        let (regex, result) = match Regex::new(pattern) {
            Ok(re) => (Some(re), Ok(())),
            Err(e) => {
                warn!(
                    "Disabling {:?} filter '{}': pattern failed to compile: {}",
                    kind, pattern, e
                );
                (
                    None,
                    Err(ScrivoError::Pattern {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    }),
                )
            }
        };
        let filter = PatternFilter {
            source: pattern.to_string(),
            regex,
        };
        match kind {
            FilterKind::TimeExpression => self.time.push(filter),
            FilterKind::QuantityExpression => self.quantity.push(filter),
        }
        result
    }

    /// Add a term to the false-positive lexicon.
    pub fn add_false_positive(&mut self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        let inserted = self.false_positives.insert(term.to_lowercase());
        if inserted {
            info!("Added false positive filter: {}", term);
        }
        inserted
    }

    /// Remove a term from the false-positive lexicon.
    pub fn remove_false_positive(&mut self, term: &str) -> bool {
        let removed = self.false_positives.remove(&term.trim().to_lowercase());
        if removed {
            info!("Removed false positive filter: {}", term);
        }
        removed
    }

    pub fn is_false_positive(&self, matched_text: &str) -> bool {
        self.false_positives.contains(&matched_text.to_lowercase())
    }

    pub fn false_positive_count(&self) -> usize {
        self.false_positives.len()
    }

    pub fn counts(&self, kind: FilterKind) -> FilterCounts {
        let filters = match kind {
            FilterKind::TimeExpression => &self.time,
            FilterKind::QuantityExpression => &self.quantity,
        };
        let active = filters.iter().filter(|f| f.regex.is_some()).count();
        FilterCounts {
            active,
            disabled: filters.len() - active,
        }
    }

    /// Sources of the disabled patterns, for diagnostics.
    pub fn disabled_patterns(&self) -> Vec<String> {
        self.time
            .iter()
            .chain(self.quantity.iter())
            .filter(|f| f.regex.is_none())
            .map(|f| f.source.clone())
            .collect()
    }

    /// Every time/quantity expression in `text`.
    pub fn expression_spans(&self, text: &str) -> Vec<ExpressionSpan> {
        let families = [
            (FilterKind::TimeExpression, &self.time),
            (FilterKind::QuantityExpression, &self.quantity),
        ];
        let mut spans = Vec::new();
        for (kind, filters) in families {
            for regex in filters.iter().filter_map(|f| f.regex.as_ref()) {
                for m in regex.find_iter(text) {
                    if m.start() == m.end() {
                        continue;
                    }
                    spans.push(ExpressionSpan {
                        start: byte_to_char(text, m.start()),
                        end: byte_to_char(text, m.end()),
                        kind,
                    });
                }
            }
        }
        spans
    }

    /// Whether the match starting at char `start` is negated by a marker
    /// just before it.
    ///
    /// Chinese markers may sit up to a few chars away within the same clause.
    /// A bare `非` must touch the match. English markers must directly precede
    /// the noun phrase, so punctuation or quotes in between cancel them.
    pub fn is_negated(&self, chars: &[char], start: usize, lookback: usize) -> bool {
        let start = start.min(chars.len());
        let window_start = start.saturating_sub(lookback);
        let before: String = chars[window_start..start].iter().collect();

        if self
            .latin_negation
            .as_ref()
            .is_some_and(|re| re.is_match(&before))
        {
            return true;
        }
        if is_bare_fei(chars, start) {
            return true;
        }
        let Some(negation) = &self.cjk_negation else {
            return false;
        };
        negation.find_iter(&before).any(|m| {
            let between = &before[m.end()..];
            if between.chars().count() > NEGATION_MAX_GAP {
                return false;
            }
            if between
                .chars()
                .any(|c| is_sentence_terminator(c) || is_clause_break(c))
            {
                return false;
            }
            let lowered = between.to_lowercase();
            !CONTRAST_WORDS.iter().any(|w| lowered.contains(w))
        })
    }
}

/// `非` immediately before `start`, not part of a compound such as 非常 or 除非.
fn is_bare_fei(chars: &[char], start: usize) -> bool {
    if start == 0 || chars[start - 1] != '非' {
        return false;
    }
    if start >= 2 && FEI_PREFIXES.contains(&chars[start - 2]) {
        return false;
    }
    !chars
        .get(start)
        .is_some_and(|c| FEI_COMPOUND_TAILS.contains(c))
}

fn is_clause_break(c: char) -> bool {
    matches!(c, '，' | ',' | '、' | '；' | ';' | '：' | ':')
}
