//! Bounded context extraction around a trigger position.
//!
//! The before-window is the primary source (weight 1.0); the after-window
//! contributes at reduced weight. Windows snap to sentence boundaries when one
//! lies within `boundary_margin` chars of the raw bound.

use std::collections::HashMap;

use tracing::debug;

use crate::config::ExtractionConfig;
use crate::models::{
    CollectionMethod, ContextSegment, ContextType, DetectedReference, ExtractedContext, RagQuery,
};
use crate::utils::text::{
    is_closing_quote, is_cjk, is_sentence_terminator, is_word_char, slice_chars,
    truncate_with_ellipsis,
};

/// Token weight for the after-cursor window.
const AFTER_TOKEN_WEIGHT: f32 = 0.5;

const DIALOGUE_MARKERS: &[char] = &['“', '”', '「', '」', '『', '』', '"', '：', ':'];
const ACTION_CHARS: &[&str] = &["走", "跑", "跳", "飞", "打", "击", "攻", "防", "躲", "闪"];
const ACTION_WORDS: &[&str] = &[
    "ran", "jumped", "struck", "fled", "attacked", "dodged", "swung", "leapt", "charged", "hit",
];
const DESCRIPTION_CHARS: &[&str] = &[
    "美丽", "壮观", "巨大", "微小", "明亮", "黑暗", "温暖", "寒冷",
];
const DESCRIPTION_WORDS: &[&str] = &[
    "beautiful", "vast", "huge", "tiny", "bright", "dark", "warm", "cold", "pale", "quiet",
];

const CJK_STOP_WORDS: &[&str] = &[
    "一个", "没有", "自己", "就是", "还是", "为了", "如果", "已经", "因为", "只是", "当然",
    "比如", "或者", "虽然", "但是", "然后", "所以", "而且", "不过", "什么", "怎么", "哪里",
    "时候", "现在", "这样", "那样", "这里", "那里", "这么", "那么", "如此", "怎样",
];
/// Function chars that make a CJK bigram meaningless on their own.
const CJK_FUNCTION_CHARS: &[char] = &[
    '的', '了', '在', '是', '我', '有', '和', '就', '不', '都', '一', '也', '很', '到', '要',
    '你', '他', '她', '它', '们', '着', '这', '那', '里', '又', '把', '被', '给', '之', '与',
    '而', '吗', '呢', '吧', '啊', '地', '得',
];
const LATIN_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "had", "has",
    "have", "he", "her", "his", "in", "into", "is", "it", "its", "of", "on", "or", "she",
    "that", "the", "their", "them", "then", "there", "they", "this", "to", "was", "were",
    "with", "you", "not", "no", "so", "we", "him", "me", "my", "our", "up", "out",
];

/// Char bounds of the two extraction windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindows {
    pub before_start: usize,
    pub cursor: usize,
    pub after_end: usize,
}

#[derive(Debug, Clone)]
struct Token {
    key: String,
    display: String,
    weight: f32,
    position: usize,
}

#[derive(Debug, Clone)]
struct RankedKeyword {
    display: String,
    score: f32,
    first: usize,
}

pub struct ContextExtractor {
    config: ExtractionConfig,
}

impl ContextExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Sentence-aligned window bounds, or `None` for invalid input.
    pub fn windows(&self, text: &str, cursor: i64) -> Option<ContextWindows> {
        let chars: Vec<char> = text.chars().collect();
        self.windows_for(&chars, cursor)
    }

    fn windows_for(&self, chars: &[char], cursor: i64) -> Option<ContextWindows> {
        if chars.is_empty() || cursor < 0 {
            return None;
        }
        let cursor = usize::try_from(cursor).ok()?;
        if cursor > chars.len() {
            return None;
        }
        let margin = self.config.boundary_margin;

        let raw_start = cursor.saturating_sub(self.config.primary_window_size);
        let before_start = if raw_start == 0 {
            0
        } else {
            align_to_sentence(
                chars,
                raw_start,
                raw_start.saturating_sub(margin),
                raw_start.saturating_add(margin).min(cursor),
                true,
            )
        };

        let raw_end = cursor
            .saturating_add(self.config.secondary_window_size)
            .min(chars.len());
        let after_end = if raw_end == chars.len() {
            raw_end
        } else {
            align_to_sentence(
                chars,
                raw_end,
                raw_end.saturating_sub(margin).max(cursor),
                raw_end.saturating_add(margin).min(chars.len()),
                false,
            )
        };

        Some(ContextWindows {
            before_start,
            cursor,
            after_end,
        })
    }

    /// Extract context around `cursor` with no entity information.
    pub fn extract(&self, text: &str, cursor: i64) -> ExtractedContext {
        self.extract_with_references(text, cursor, &[])
    }

    /// Extract context around `cursor`, boosting keywords that coincide with
    /// detected references (offsets into `text`).
    pub fn extract_with_references(
        &self,
        text: &str,
        cursor: i64,
        references: &[DetectedReference],
    ) -> ExtractedContext {
        let chars: Vec<char> = text.chars().collect();
        let Some(windows) = self.windows_for(&chars, cursor) else {
            debug!("Invalid extraction input (cursor {}), returning empty context", cursor);
            return ExtractedContext::empty(cursor);
        };
        let ContextWindows {
            before_start,
            cursor: pos,
            after_end,
        } = windows;

        let in_windows: Vec<&DetectedReference> = references
            .iter()
            .filter(|r| r.start_offset >= before_start && r.end_offset <= after_end)
            .collect();

        let mut tokens = Vec::new();
        self.collect_tokens(&chars, before_start, pos, &in_windows, 1.0, &mut tokens);
        self.collect_tokens(
            &chars,
            pos,
            after_end,
            &in_windows,
            AFTER_TOKEN_WEIGHT,
            &mut tokens,
        );
        let ranked = rank_keywords(tokens);
        let primary_keywords: Vec<String> = ranked
            .iter()
            .take(self.config.max_primary_keywords)
            .map(|k| k.display.clone())
            .collect();
        let secondary_keywords: Vec<String> = ranked
            .iter()
            .skip(self.config.max_primary_keywords)
            .take(self.config.max_secondary_keywords)
            .map(|k| k.display.clone())
            .collect();
        let all_keywords: Vec<&str> = primary_keywords
            .iter()
            .chain(secondary_keywords.iter())
            .map(String::as_str)
            .collect();

        let mut segments = self.segment(&chars, before_start, pos, &all_keywords, &in_windows, 1.0);
        segments.extend(self.segment(
            &chars,
            pos,
            after_end,
            &all_keywords,
            &in_windows,
            self.config.after_context_weight,
        ));

        let relevance_score =
            relevance(&segments, all_keywords.len(), in_windows.len());
        let summary = self.summarize(&segments, &primary_keywords);

        debug!(
            "Extracted {} segments, {} keywords around cursor {}",
            segments.len(),
            all_keywords.len(),
            pos
        );
        ExtractedContext {
            trigger_position: cursor,
            before_context: slice_chars(&chars, before_start, pos),
            after_context: slice_chars(&chars, pos, after_end),
            segments,
            primary_keywords,
            secondary_keywords,
            relevance_score,
            summary,
        }
    }

    fn collect_tokens(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        references: &[&DetectedReference],
        weight: f32,
        tokens: &mut Vec<Token>,
    ) {
        let mut masked = vec![false; end.saturating_sub(start)];
        for r in references
            .iter()
            .filter(|r| r.start_offset >= start && r.end_offset <= end)
        {
            tokens.push(Token {
                key: r.matched_text.to_lowercase(),
                display: r.matched_text.clone(),
                weight: weight * self.config.entity_boost,
                position: r.start_offset,
            });
            for m in &mut masked[r.start_offset - start..r.end_offset - start] {
                *m = true;
            }
        }

        let mut idx = start;
        while idx < end {
            let c = chars[idx];
            if masked[idx - start] {
                idx += 1;
                continue;
            }
            if is_cjk(c) {
                let run_start = idx;
                while idx < end && !masked[idx - start] && is_cjk(chars[idx]) {
                    idx += 1;
                }
                push_bigrams(chars, run_start, idx, weight, tokens);
            } else if is_word_char(c) {
                let run_start = idx;
                while idx < end
                    && !masked[idx - start]
                    && is_word_char(chars[idx])
                    && !is_cjk(chars[idx])
                {
                    idx += 1;
                }
                let word: String = chars[run_start..idx].iter().collect::<String>().to_lowercase();
                if is_latin_keyword(&word) {
                    tokens.push(Token {
                        key: word.clone(),
                        display: word,
                        weight,
                        position: run_start,
                    });
                }
            } else {
                idx += 1;
            }
        }
    }

    fn segment(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        keywords: &[&str],
        references: &[&DetectedReference],
        weight: f32,
    ) -> Vec<ContextSegment> {
        let mut segments = Vec::new();
        let mut seg_start = start;
        let mut idx = start;
        while idx < end {
            let c = chars[idx];
            idx += 1;
            if !is_sentence_terminator(c) {
                continue;
            }
            while idx < end && (is_sentence_terminator(chars[idx]) || is_closing_quote(chars[idx])) {
                idx += 1;
            }
            if let Some(segment) =
                self.build_segment(chars, seg_start, idx, keywords, references, weight)
            {
                segments.push(segment);
            }
            seg_start = idx;
        }
        if let Some(segment) = self.build_segment(chars, seg_start, end, keywords, references, weight)
        {
            segments.push(segment);
        }
        segments
    }

    fn build_segment(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        keywords: &[&str],
        references: &[&DetectedReference],
        weight: f32,
    ) -> Option<ContextSegment> {
        let mut start = start;
        let mut end = end;
        while start < end && chars[start].is_whitespace() {
            start += 1;
        }
        while end > start && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        if start == end {
            return None;
        }

        let text = slice_chars(chars, start, end);
        let lowered = text.to_lowercase();
        let context_type = classify(&text);

        let segment_keywords: Vec<String> = keywords
            .iter()
            .filter(|k| lowered.contains(&k.to_lowercase()))
            .take(5)
            .map(|k| k.to_string())
            .collect();
        let keyword_hits: usize = keywords
            .iter()
            .map(|k| lowered.matches(&k.to_lowercase()).count())
            .sum();
        let entity_hits = references
            .iter()
            .filter(|r| r.start_offset >= start && r.end_offset <= end)
            .count();

        let keyword_factor = (keyword_hits as f32 / 5.0).min(1.0);
        let entity_factor = (entity_hits as f32 / 2.0).min(1.0);
        let importance = (context_type.weight()
            * (0.4 + 0.3 * keyword_factor + 0.3 * entity_factor)
            * weight)
            .clamp(0.0, 1.0);

        Some(ContextSegment {
            text,
            start_offset: start,
            end_offset: end,
            context_type,
            importance,
            keywords: segment_keywords,
        })
    }

    fn summarize(&self, segments: &[ContextSegment], keywords: &[String]) -> String {
        let mut parts = Vec::new();
        if !keywords.is_empty() {
            parts.push(
                keywords
                    .iter()
                    .take(5)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        let top = segments
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.importance.total_cmp(&b.importance).then(ib.cmp(ia)));
        if let Some((_, segment)) = top {
            parts.push(truncate_with_ellipsis(&segment.text, 50));
        }
        truncate_with_ellipsis(&parts.join(" | "), self.config.summary_max_chars)
    }

    /// Keyword-only retrieval bundle for callers that skip entity detection.
    pub fn rag_query_context(&self, context: &ExtractedContext) -> RagQuery {
        let query = context
            .primary_keywords
            .iter()
            .take(8)
            .chain(context.secondary_keywords.iter().take(3))
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        let keywords: Vec<String> = context
            .primary_keywords
            .iter()
            .chain(context.secondary_keywords.iter())
            .cloned()
            .collect();
        let method = if context.is_empty() {
            CollectionMethod::Empty
        } else {
            CollectionMethod::Fallback
        };
        RagQuery {
            query,
            context: context.before_context.clone(),
            keywords,
            entities: Vec::new(),
            summary: context.summary.clone(),
            relevance: context.relevance_score,
            method,
        }
    }
}

/// Is `b` a sentence boundary: text edge, or just after a terminator (and its
/// closing quotes) that is not followed by more of the same.
fn is_boundary(chars: &[char], b: usize) -> bool {
    if b == 0 || b >= chars.len() {
        return true;
    }
    let prev = chars[b - 1];
    let ends = is_sentence_terminator(prev)
        || (is_closing_quote(prev) && b >= 2 && is_sentence_terminator(chars[b - 2]));
    ends && !is_sentence_terminator(chars[b]) && !is_closing_quote(chars[b])
}

/// Nearest boundary to `raw` within `[lo, hi]`; ties go to the outward side.
fn align_to_sentence(chars: &[char], raw: usize, lo: usize, hi: usize, outward_is_lower: bool) -> usize {
    (lo..=hi)
        .filter(|&b| is_boundary(chars, b))
        .min_by(|&a, &b| {
            let da = a.abs_diff(raw);
            let db = b.abs_diff(raw);
            da.cmp(&db).then(if outward_is_lower {
                a.cmp(&b)
            } else {
                b.cmp(&a)
            })
        })
        .unwrap_or(raw)
}

fn classify(text: &str) -> ContextType {
    let dialogue = text.chars().filter(|c| DIALOGUE_MARKERS.contains(c)).count();
    if dialogue >= 2 {
        return ContextType::Dialogue;
    }
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !is_word_char(c) || is_cjk(c))
        .filter(|w| !w.is_empty())
        .collect();
    let hits = |cjk: &[&str], latin: &[&str]| {
        cjk.iter().filter(|w| lowered.contains(*w)).count()
            + latin.iter().filter(|w| words.contains(w)).count()
    };
    if hits(ACTION_CHARS, ACTION_WORDS) >= 2 {
        return ContextType::Action;
    }
    if hits(DESCRIPTION_CHARS, DESCRIPTION_WORDS) >= 2 {
        return ContextType::Description;
    }
    ContextType::Narrative
}

fn push_bigrams(chars: &[char], start: usize, end: usize, weight: f32, tokens: &mut Vec<Token>) {
    if end - start < 2 {
        return;
    }
    for i in start..end - 1 {
        let pair = [chars[i], chars[i + 1]];
        if pair.iter().any(|c| CJK_FUNCTION_CHARS.contains(c)) {
            continue;
        }
        let bigram: String = pair.iter().collect();
        if CJK_STOP_WORDS.contains(&bigram.as_str()) {
            continue;
        }
        tokens.push(Token {
            key: bigram.clone(),
            display: bigram,
            weight,
            position: i,
        });
    }
}

fn is_latin_keyword(word: &str) -> bool {
    word.chars().count() >= 2
        && !word.chars().all(|c| c.is_ascii_digit())
        && !LATIN_STOP_WORDS.contains(&word)
}

/// Merge tokens case-insensitively; rank by weighted frequency, then first
/// occurrence.
fn rank_keywords(tokens: Vec<Token>) -> Vec<RankedKeyword> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut ranked: Vec<RankedKeyword> = Vec::new();
    for token in tokens {
        match index.get(&token.key) {
            Some(&i) => {
                let entry = &mut ranked[i];
                entry.score += token.weight;
                entry.first = entry.first.min(token.position);
            }
            None => {
                index.insert(token.key, ranked.len());
                ranked.push(RankedKeyword {
                    display: token.display,
                    score: token.weight,
                    first: token.position,
                });
            }
        }
    }
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.first.cmp(&b.first)));
    ranked
}

fn relevance(segments: &[ContextSegment], keyword_count: usize, entity_count: usize) -> f32 {
    if segments.is_empty() {
        return 0.0;
    }
    let avg_importance =
        segments.iter().map(|s| s.importance).sum::<f32>() / segments.len() as f32;
    let keyword_score = (keyword_count as f32 / 10.0).min(1.0);
    let entity_score = (entity_count as f32 / 3.0).min(1.0);
    (0.5 * avg_importance + 0.3 * keyword_score + 0.2 * entity_score).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLevel, EntityType};
    use pretty_assertions::assert_eq;

    fn extractor() -> ContextExtractor {
        ContextExtractor::new(ExtractionConfig::default())
    }

    fn reference(text: &str, matched: &str, entity_type: EntityType) -> DetectedReference {
        let byte = text.find(matched).unwrap();
        let start = text[..byte].chars().count();
        DetectedReference {
            entity_id: matched.to_string(),
            entity_name: matched.to_string(),
            entity_type,
            matched_text: matched.to_string(),
            start_offset: start,
            end_offset: start + matched.chars().count(),
            confidence: 1.0,
            confidence_level: ConfidenceLevel::High,
            is_alias: false,
            context_before: String::new(),
            context_after: String::new(),
        }
    }

    #[test]
    fn test_empty_text_is_zeroed() {
        let ctx = extractor().extract("", 0);
        assert_eq!(ctx, ExtractedContext::empty(0));
    }

    #[test]
    fn test_out_of_range_cursor_is_zeroed() {
        let text = "陈云寒拿起清心符。";
        for cursor in [-1, text.chars().count() as i64 + 1] {
            let ctx = extractor().extract(text, cursor);
            assert_eq!(ctx.relevance_score, 0.0);
            assert!(ctx.segments.is_empty());
            assert_eq!(ctx.trigger_position, cursor);
        }
    }

    #[test]
    fn test_cursor_at_end_uses_whole_short_text() {
        let text = "夜色很深。陈云寒拿起清心符，放在梨木符案上。";
        let ctx = extractor().extract(text, text.chars().count() as i64);
        assert_eq!(ctx.before_context, text);
        assert!(ctx.after_context.is_empty());
        assert_eq!(ctx.segments.len(), 2);
        assert!(ctx.relevance_score > 0.0);
    }

    #[test]
    fn test_windows_snap_to_sentence_boundary() {
        let extractor = ContextExtractor::new(ExtractionConfig {
            primary_window_size: 10,
            secondary_window_size: 6,
            boundary_margin: 4,
            ..ExtractionConfig::default()
        });
        // 0123456789...
        let text = "第一句话很长很长。第二句开始了这里光标后面还有字。结尾";
        let windows = extractor.windows(text, 15).unwrap();
        // raw start 5 snaps back to the boundary after 。 at index 8 -> 9
        assert_eq!(windows.before_start, 9);
        // raw end 21 snaps forward to just after the 。 at index 24
        assert_eq!(windows.after_end, 25);
    }

    #[test]
    fn test_window_without_nearby_boundary_keeps_raw_bounds() {
        let extractor = ContextExtractor::new(ExtractionConfig {
            primary_window_size: 10,
            secondary_window_size: 5,
            boundary_margin: 2,
            ..ExtractionConfig::default()
        });
        let text = "a".repeat(40);
        let windows = extractor.windows(&text, 20).unwrap();
        assert_eq!((windows.before_start, windows.after_end), (10, 25));
    }

    #[test]
    fn test_huge_windows_saturate() {
        let extractor = ContextExtractor::new(ExtractionConfig {
            primary_window_size: usize::MAX,
            secondary_window_size: usize::MAX,
            boundary_margin: usize::MAX,
            ..ExtractionConfig::default()
        });
        let windows = extractor.windows("abc. def.", 3).unwrap();
        assert_eq!((windows.before_start, windows.after_end), (0, 9));
    }

    #[test]
    fn test_segments_classified_and_offset() {
        let text = "他说：“快走吧。”她拔剑跳起，飞身攻向敌人。天色黑暗而寒冷，月光明亮。";
        let ctx = extractor().extract(text, text.chars().count() as i64);
        let types: Vec<ContextType> = ctx.segments.iter().map(|s| s.context_type).collect();
        assert_eq!(
            types,
            vec![
                ContextType::Dialogue,
                ContextType::Action,
                ContextType::Description
            ]
        );
        let chars: Vec<char> = text.chars().collect();
        for s in &ctx.segments {
            assert_eq!(slice_chars(&chars, s.start_offset, s.end_offset), s.text);
        }
    }

    #[test]
    fn test_after_segments_are_down_weighted() {
        let text = "陈云寒拿起清心符。陈云寒拿起清心符。";
        let ctx = extractor().extract(text, 9);
        assert_eq!(ctx.segments.len(), 2);
        let (before, after) = (&ctx.segments[0], &ctx.segments[1]);
        assert!((after.importance - before.importance * 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_entity_tokens_rank_first() {
        let text = "清心符亮了。陈云寒拿起清心符，陈云寒笑了。";
        let refs = vec![
            reference(text, "清心符", EntityType::Object),
            reference(text, "陈云寒", EntityType::Character),
        ];
        let ctx = extractor().extract_with_references(text, text.chars().count() as i64, &refs);
        // only the first occurrence of each is passed in, each boosted 1.5
        assert_eq!(ctx.primary_keywords[0], "清心符");
        assert_eq!(ctx.primary_keywords[1], "陈云寒");
    }

    #[test]
    fn test_keywords_dedupe_case_insensitively() {
        let text = "The Lantern swung. A lantern fell. LANTERN light faded.";
        let ctx = extractor().extract(text, text.chars().count() as i64);
        assert_eq!(ctx.primary_keywords[0], "lantern");
        assert_eq!(
            ctx.primary_keywords
                .iter()
                .filter(|k| k.eq_ignore_ascii_case("lantern"))
                .count(),
            1
        );
        assert!(!ctx.primary_keywords.iter().any(|k| k == "the"));
    }

    #[test]
    fn test_keyword_split_respects_limits() {
        let extractor = ContextExtractor::new(ExtractionConfig {
            max_primary_keywords: 2,
            max_secondary_keywords: 1,
            ..ExtractionConfig::default()
        });
        let text = "amber amber amber birch birch cedar cedar delta";
        let ctx = extractor.extract(text, text.len() as i64);
        assert_eq!(ctx.primary_keywords, vec!["amber", "birch"]);
        assert_eq!(ctx.secondary_keywords, vec!["cedar"]);
    }

    #[test]
    fn test_summary_is_bounded_and_deterministic() {
        let text = "陈云寒拿起清心符，放在梨木符案上。窗外风声渐紧。";
        let ctx = extractor().extract(text, text.chars().count() as i64);
        let again = extractor().extract(text, text.chars().count() as i64);
        assert_eq!(ctx.summary, again.summary);
        assert!(ctx.summary.chars().count() <= 120);
        assert!(ctx.summary.contains(" | "));
    }

    #[test]
    fn test_rag_query_context_is_keyword_only() {
        let text = "amber birch cedar";
        let ctx = extractor().extract(text, text.len() as i64);
        let bundle = extractor().rag_query_context(&ctx);
        assert_eq!(bundle.query, "amber birch cedar");
        assert!(bundle.entities.is_empty());
        assert_eq!(bundle.method, CollectionMethod::Fallback);
        let empty = extractor().rag_query_context(&ExtractedContext::empty(-1));
        assert_eq!(empty.method, CollectionMethod::Empty);
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_extract_never_panics(
                text in "[陈云寒。！？”“ a-zA-Z.\n]{0,80}",
                cursor in -5i64..100,
            ) {
                let extractor = ContextExtractor::new(ExtractionConfig {
                    primary_window_size: 20,
                    secondary_window_size: 10,
                    boundary_margin: 5,
                    ..ExtractionConfig::default()
                });
                let ctx = extractor.extract(&text, cursor);
                let len = text.chars().count() as i64;
                prop_assert!((0.0..=1.0).contains(&ctx.relevance_score));
                if cursor < 0 || cursor > len || text.is_empty() {
                    prop_assert_eq!(ctx.relevance_score, 0.0);
                    prop_assert!(ctx.segments.is_empty());
                } else {
                    prop_assert!(ctx.before_context.chars().count() <= 25);
                    prop_assert!(ctx.after_context.chars().count() <= 15);
                }
                for s in &ctx.segments {
                    prop_assert!((0.0..=1.0).contains(&s.importance));
                }
            }
        }
    }
}
