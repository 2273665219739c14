//! Confidence-scored entity reference detection.
//!
//! Each trackable catalog entry is scanned independently: every term (name or
//! alias) yields raw candidates, which then pass through the exclusion filters,
//! confidence shaping, the threshold check, and per-entity overlap resolution.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use rapidfuzz::distance::levenshtein;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use crate::models::{ConfidenceLevel, DetectedReference, Entity, EntityType};
use crate::repository::EntityCatalog;
use crate::services::filters::{ExclusionFilters, ExpressionSpan, FilterCounts, FilterKind};
use crate::services::matching::{compile_term, find_compiled, latin_words, WordSpan};
use crate::utils::text::{byte_to_char, char_len, is_cjk, slice_chars};

const CANONICAL_CONFIDENCE: f32 = 1.0;
const ALIAS_CONFIDENCE: f32 = 0.8;
const FUZZY_CONFIDENCE: f32 = 0.6;

const CUE_STEP: f32 = 0.05;
const MAX_CUE_BONUS: f32 = 0.15;
const SHAPE_BONUS: f32 = 0.05;
const GLOBAL_BONUS: f32 = 0.05;

const CHARACTER_CUES: &[&str] = &[
    "说", "道", "想", "看", "听", "走", "来", "去", "笑", "哭", "怒", "喜", "问", "答", "“",
    "”", "「", "」", "：",
];
const CHARACTER_WORDS: &[&str] = &[
    "said", "asked", "replied", "whispered", "shouted", "smiled", "laughed", "thought", "nodded",
];
const LOCATION_CUES: &[&str] = &["在", "到", "去", "来", "从", "向", "朝", "往", "处", "地方"];
const LOCATION_WORDS: &[&str] = &[
    "in", "at", "to", "from", "toward", "towards", "into", "near", "inside", "reached",
];
const OBJECT_CUES: &[&str] = &["拿", "用", "持", "握", "放", "取", "给", "递", "扔", "丢"];
const OBJECT_WORDS: &[&str] = &[
    "took", "held", "picked", "gave", "carried", "drew", "grabbed", "used", "dropped",
];

const LOCATION_SUFFIXES: &[char] = &[
    '城', '镇', '村', '国', '省', '市', '区', '县', '山', '河', '湖', '海', '谷', '峰',
];
const OBJECT_SUFFIXES: &[char] = &['剑', '刀', '枪', '书', '珠', '石', '丹', '药', '符', '印'];

/// Snapshot of detector configuration and catalog coverage.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionStatistics {
    pub confidence_threshold: f32,
    pub trackable_entries: usize,
    pub alias_count: usize,
    pub entries_by_type: BTreeMap<String, usize>,
    pub false_positive_terms: usize,
    pub time_filters: FilterCounts,
    pub quantity_filters: FilterCounts,
    pub disabled_patterns: Vec<String>,
    pub fuzzy_matching: bool,
}

#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    end: usize,
    text: String,
    base: f32,
    is_alias: bool,
}

/// Detects catalog entity mentions in narrative text.
///
/// Threshold and filter edits go through `&self` and are seen by every holder
/// of the detector.
pub struct ReferenceDetector {
    catalog: Arc<dyn EntityCatalog>,
    config: RwLock<DetectionConfig>,
    filters: RwLock<ExclusionFilters>,
}

/// One detection pass over a consistent config and filter snapshot.
struct Scan<'a> {
    config: &'a DetectionConfig,
    filters: &'a ExclusionFilters,
}

impl ReferenceDetector {
    pub fn new(catalog: Arc<dyn EntityCatalog>, config: DetectionConfig) -> Self {
        let mut filters = ExclusionFilters::default();
        for term in &config.false_positives {
            filters.add_false_positive(term);
        }
        for pattern in &config.time_patterns {
            let _ = filters.add_pattern(FilterKind::TimeExpression, pattern);
        }
        for pattern in &config.quantity_patterns {
            let _ = filters.add_pattern(FilterKind::QuantityExpression, pattern);
        }
        Self {
            catalog,
            config: RwLock::new(config),
            filters: RwLock::new(filters),
        }
    }

    /// Find every entity reference in `text`, sorted by start offset.
    ///
    /// Empty text or an unreadable catalog yields an empty list.
    pub fn detect(&self, text: &str) -> Vec<DetectedReference> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let entries = match self.catalog.all_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Catalog unavailable, skipping reference detection: {}", e);
                return Vec::new();
            }
        };

        let config = self.config.read().unwrap_or_else(|e| e.into_inner());
        let filters = self.filters.read().unwrap_or_else(|e| e.into_inner());
        let scan = Scan {
            config: &config,
            filters: &filters,
        };

        let chars: Vec<char> = text.chars().collect();
        let expressions = filters.expression_spans(text);
        let words = if config.fuzzy_matching {
            latin_words(text)
        } else {
            Vec::new()
        };

        let mut references = Vec::new();
        for entity in entries.iter().filter(|e| e.trackable) {
            let candidates = scan.entity_candidates(text, entity, &words);
            let scored: Vec<DetectedReference> = candidates
                .into_iter()
                .filter(|c| !scan.is_excluded(entity, c, &expressions))
                .map(|c| scan.score(&chars, entity, c))
                .filter(|r| r.confidence >= config.min_confidence_threshold)
                .collect();
            references.extend(resolve_overlaps(scored));
        }

        references.sort_by(|a, b| {
            a.start_offset
                .cmp(&b.start_offset)
                .then(b.len().cmp(&a.len()))
                .then(a.entity_id.cmp(&b.entity_id))
        });
        debug!(
            "Detected {} references across {} catalog entries",
            references.len(),
            entries.len()
        );
        references
    }

    /// Update the acceptance threshold. Values outside `[0, 1]` are ignored.
    pub fn set_confidence_threshold(&self, value: f32) -> bool {
        if !(0.0..=1.0).contains(&value) {
            debug!("Ignoring confidence threshold {}", value);
            return false;
        }
        self.config
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .min_confidence_threshold = value;
        info!("Confidence threshold set to {}", value);
        true
    }

    pub fn add_false_positive(&self, term: &str) -> bool {
        self.filters_mut().add_false_positive(term)
    }

    pub fn remove_false_positive(&self, term: &str) -> bool {
        self.filters_mut().remove_false_positive(term)
    }

    /// Register a custom time or quantity pattern. A malformed pattern is
    /// logged, recorded as disabled, and reported as `false`.
    pub fn add_exclusion_pattern(&self, kind: FilterKind, pattern: &str) -> bool {
        self.filters_mut().add_pattern(kind, pattern).is_ok()
    }

    fn filters_mut(&self) -> RwLockWriteGuard<'_, ExclusionFilters> {
        self.filters.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn statistics(&self) -> DetectionStatistics {
        let entries = self.catalog.all_entries().unwrap_or_default();
        let trackable: Vec<&Entity> = entries.iter().filter(|e| e.trackable).collect();
        let mut entries_by_type = BTreeMap::new();
        for entity in &trackable {
            *entries_by_type
                .entry(entity.entity_type.to_string())
                .or_insert(0) += 1;
        }
        let config = self.config.read().unwrap_or_else(|e| e.into_inner());
        let filters = self.filters.read().unwrap_or_else(|e| e.into_inner());
        DetectionStatistics {
            confidence_threshold: config.min_confidence_threshold,
            trackable_entries: trackable.len(),
            alias_count: trackable.iter().map(|e| e.aliases.len()).sum(),
            entries_by_type,
            false_positive_terms: filters.false_positive_count(),
            time_filters: filters.counts(FilterKind::TimeExpression),
            quantity_filters: filters.counts(FilterKind::QuantityExpression),
            disabled_patterns: filters.disabled_patterns(),
            fuzzy_matching: config.fuzzy_matching,
        }
    }
}

impl Scan<'_> {
    fn entity_candidates(&self, text: &str, entity: &Entity, words: &[WordSpan]) -> Vec<Candidate> {
        let terms: Vec<(String, bool)> = entity
            .search_terms()
            .into_iter()
            .filter(|(term, _)| char_len(term) >= self.config.min_term_length)
            .collect();

        let mut candidates = Vec::new();
        for (term, is_alias) in &terms {
            let Some(matcher) = compile_term(term) else {
                continue;
            };
            for m in find_compiled(text, &matcher) {
                candidates.push(Candidate {
                    start: m.start,
                    end: m.end,
                    text: m.text,
                    base: if *is_alias {
                        ALIAS_CONFIDENCE
                    } else {
                        CANONICAL_CONFIDENCE
                    },
                    is_alias: *is_alias,
                });
            }
        }

        if self.config.fuzzy_matching {
            let fuzzy = self.fuzzy_candidates(text, &terms, words, &candidates);
            candidates.extend(fuzzy);
        }
        candidates
    }

    /// Near-miss spellings of Latin-script terms ("Greyhavan" for "Greyhaven").
    fn fuzzy_candidates(
        &self,
        text: &str,
        terms: &[(String, bool)],
        words: &[WordSpan],
        exact: &[Candidate],
    ) -> Vec<Candidate> {
        let fuzzy_terms: Vec<(String, bool)> = terms
            .iter()
            .filter(|(term, _)| {
                char_len(term) >= self.config.fuzzy_min_length
                    && !term.chars().any(|c| is_cjk(c) || c.is_whitespace())
            })
            .map(|(term, alias)| (term.to_lowercase(), *alias))
            .collect();
        if fuzzy_terms.is_empty() {
            return Vec::new();
        }

        let mut fuzzy = Vec::new();
        for word in words {
            let word_text = &text[word.byte_start..word.byte_end];
            if char_len(word_text) < self.config.fuzzy_min_length {
                continue;
            }
            let start = byte_to_char(text, word.byte_start);
            let end = start + char_len(word_text);
            if exact.iter().any(|c| c.start < end && start < c.end) {
                continue;
            }
            let lowered = word_text.to_lowercase();
            let best = fuzzy_terms
                .iter()
                .filter(|(term, _)| *term != lowered)
                .map(|(term, alias)| {
                    let similarity =
                        levenshtein::normalized_similarity(lowered.chars(), term.chars());
                    (similarity, *alias)
                })
                .filter(|(similarity, _)| *similarity >= self.config.fuzzy_min_similarity)
                .max_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((_, is_alias)) = best {
                fuzzy.push(Candidate {
                    start,
                    end,
                    text: word_text.to_string(),
                    base: FUZZY_CONFIDENCE,
                    is_alias,
                });
            }
        }
        fuzzy
    }

    fn is_excluded(
        &self,
        entity: &Entity,
        candidate: &Candidate,
        expressions: &[ExpressionSpan],
    ) -> bool {
        if self.filters.is_false_positive(&candidate.text) {
            debug!("Dropping false positive '{}'", candidate.text);
            return true;
        }
        // "most of Greyhaven": a quantity phrase only swallows generic nouns
        let proper_name = candidate.base > FUZZY_CONFIDENCE
            && matches!(
                entity.entity_type,
                EntityType::Character | EntityType::Location
            );
        match expressions.iter().find(|s| {
            s.start < candidate.end
                && candidate.start < s.end
                && !(proper_name && s.kind == FilterKind::QuantityExpression)
        }) {
            Some(span) => {
                debug!(
                    "Dropping '{}' inside {:?} at {}..{}",
                    candidate.text, span.kind, span.start, span.end
                );
                true
            }
            None => false,
        }
    }

    fn score(&self, chars: &[char], entity: &Entity, candidate: Candidate) -> DetectedReference {
        let cue_start = candidate.start.saturating_sub(self.config.cue_window);
        let cue_end = candidate
            .end
            .saturating_add(self.config.cue_window)
            .min(chars.len());
        let cue_text = format!(
            "{} {}",
            slice_chars(chars, cue_start, candidate.start),
            slice_chars(chars, candidate.end, cue_end)
        );

        let mut confidence = candidate.base
            + cue_bonus(&cue_text, entity.entity_type)
            + shape_bonus(&candidate.text, entity.entity_type);
        if entity.is_global {
            confidence += GLOBAL_BONUS;
        }
        confidence = confidence.clamp(0.0, 1.0);
        if self
            .filters
            .is_negated(chars, candidate.start, self.config.negation_lookback)
        {
            confidence *= self.config.negation_penalty;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let window = self.config.context_window;
        DetectedReference {
            entity_id: entity.id.clone(),
            entity_name: entity.name.clone(),
            entity_type: entity.entity_type,
            matched_text: candidate.text,
            start_offset: candidate.start,
            end_offset: candidate.end,
            confidence,
            confidence_level: ConfidenceLevel::from_score(confidence),
            is_alias: candidate.is_alias,
            context_before: slice_chars(
                chars,
                candidate.start.saturating_sub(window),
                candidate.start,
            ),
            context_after: slice_chars(
                chars,
                candidate.end,
                candidate.end.saturating_add(window),
            ),
        }
    }
}

fn cue_bonus(window: &str, entity_type: EntityType) -> f32 {
    let (cues, words): (&[&str], &[&str]) = match entity_type {
        EntityType::Character => (CHARACTER_CUES, CHARACTER_WORDS),
        EntityType::Location => (LOCATION_CUES, LOCATION_WORDS),
        EntityType::Object => (OBJECT_CUES, OBJECT_WORDS),
        EntityType::Plot | EntityType::Concept => return 0.0,
    };
    let lowered = window.to_lowercase();
    let window_words: HashSet<&str> = latin_words(&lowered)
        .iter()
        .map(|w| &lowered[w.byte_start..w.byte_end])
        .collect();
    let hits = cues.iter().filter(|c| lowered.contains(*c)).count()
        + words.iter().filter(|w| window_words.contains(*w)).count();
    (hits as f32 * CUE_STEP).min(MAX_CUE_BONUS)
}

fn shape_bonus(matched: &str, entity_type: EntityType) -> f32 {
    let Some(last) = matched.chars().last() else {
        return 0.0;
    };
    let fits = match entity_type {
        EntityType::Character => {
            let len = char_len(matched);
            let all_cjk = matched.chars().all(is_cjk);
            (all_cjk && (2..=4).contains(&len))
                || matched.chars().next().is_some_and(char::is_uppercase)
        }
        EntityType::Location => LOCATION_SUFFIXES.contains(&last),
        EntityType::Object => OBJECT_SUFFIXES.contains(&last),
        EntityType::Plot | EntityType::Concept => false,
    };
    if fits {
        SHAPE_BONUS
    } else {
        0.0
    }
}

/// Keep non-overlapping references for one entity: longest span first, then
/// higher confidence, then earlier start.
fn resolve_overlaps(mut candidates: Vec<DetectedReference>) -> Vec<DetectedReference> {
    candidates.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then(b.confidence.total_cmp(&a.confidence))
            .then(a.start_offset.cmp(&b.start_offset))
    });
    let mut kept: Vec<DetectedReference> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !kept.iter().any(|k| k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }
    kept
}
