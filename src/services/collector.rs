//! Retrieval query assembly: reference detection + context extraction merged
//! into one size-bounded bundle.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{CollectorConfig, ExtractionConfig};
use crate::models::{
    CollectionMethod, ContextCollectionResult, DetectedReference, ExtractedContext, RagQuery,
};
use crate::services::extractor::ContextExtractor;
use crate::services::reference::ReferenceDetector;
use crate::utils::text::{char_len, slice_chars, tail_chars, truncate_chars, truncate_with_ellipsis};

/// Chars that mark genre vocabulary (cultivation, spells, weapons, buildings).
const STORY_ELEMENT_CHARS: &[char] = &[
    '力', '气', '血', '魂', '魄', '符', '咒', '法', '术', '剑', '刀', '枪', '矛', '宫', '殿',
    '楼', '阁',
];
const STORY_ELEMENT_WORDS: &[&str] = &[
    "sword", "blade", "spell", "rune", "talisman", "castle", "palace", "tower", "soul", "blood",
    "magic", "curse",
];

/// Before-context length at which the length bonus saturates.
const FULL_LENGTH_CHARS: f32 = 300.0;

/// The configuration a collector currently runs with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectorSettings {
    pub extraction: ExtractionConfig,
    pub collector: CollectorConfig,
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct CollectorUpdate {
    pub primary_window_size: Option<usize>,
    pub secondary_window_size: Option<usize>,
    pub max_primary_keywords: Option<usize>,
    pub max_secondary_keywords: Option<usize>,
    pub max_query_length: Option<usize>,
    pub max_query_entities: Option<usize>,
}

struct CollectorState {
    settings: CollectorSettings,
    extractor: ContextExtractor,
}

impl CollectorState {
    fn new(settings: CollectorSettings) -> Self {
        Self {
            extractor: ContextExtractor::new(settings.extraction.clone()),
            settings,
        }
    }
}

pub struct ContextCollector {
    detector: Arc<ReferenceDetector>,
    state: RwLock<Arc<CollectorState>>,
}

impl ContextCollector {
    pub fn new(
        detector: Arc<ReferenceDetector>,
        extraction: ExtractionConfig,
        collector: CollectorConfig,
    ) -> Self {
        Self {
            detector,
            state: RwLock::new(Arc::new(CollectorState::new(CollectorSettings {
                extraction,
                collector,
            }))),
        }
    }

    fn snapshot(&self) -> Arc<CollectorState> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn detector(&self) -> &Arc<ReferenceDetector> {
        &self.detector
    }

    /// Collect a retrieval bundle for the trigger position `cursor`.
    pub fn collect(&self, text: &str, cursor: i64) -> ContextCollectionResult {
        let state = self.snapshot();
        let Some(windows) = state.extractor.windows(text, cursor) else {
            debug!("Invalid collection input (cursor {})", cursor);
            return ContextCollectionResult::empty(cursor);
        };

        let chars: Vec<char> = text.chars().collect();
        let window_text = slice_chars(&chars, windows.before_start, windows.after_end);
        let references: Vec<DetectedReference> = self
            .detector
            .detect(&window_text)
            .into_iter()
            .map(|mut r| {
                r.start_offset += windows.before_start;
                r.end_offset += windows.before_start;
                r
            })
            .collect();

        let context = state
            .extractor
            .extract_with_references(text, cursor, &references);

        let mut detected_entities: Vec<String> = Vec::new();
        let mut seen_ids: Vec<&str> = Vec::new();
        for r in &references {
            if !seen_ids.contains(&r.entity_id.as_str()) {
                seen_ids.push(&r.entity_id);
                detected_entities.push(r.entity_name.clone());
            }
        }

        let config = &state.settings.collector;
        let rag_query = build_query(&context, &detected_entities, &references, config);

        let has_keywords =
            !context.primary_keywords.is_empty() || !context.secondary_keywords.is_empty();
        let collection_method = if detected_entities.is_empty() && has_keywords {
            CollectionMethod::Fallback
        } else {
            CollectionMethod::Full
        };

        let relevance_score = enhanced_relevance(&context, detected_entities.len());
        let summary = collection_summary(
            &context,
            &detected_entities,
            state.settings.extraction.summary_max_chars,
        );

        debug!(
            "Collected {} entities, {} keywords, query of {} chars ({})",
            detected_entities.len(),
            context.primary_keywords.len() + context.secondary_keywords.len(),
            char_len(&rag_query),
            collection_method
        );

        ContextCollectionResult {
            trigger_position: cursor,
            primary_keywords: context.primary_keywords.clone(),
            secondary_keywords: context.secondary_keywords.clone(),
            detected_entities,
            rag_query,
            relevance_score,
            collection_method,
            context: context.before_context,
            summary,
        }
    }

    /// Repackage a collection result into the retrieval bundle.
    pub fn get_rag_optimized_query(&self, result: &ContextCollectionResult) -> RagQuery {
        RagQuery {
            query: result.rag_query.clone(),
            context: result.context.clone(),
            keywords: result
                .primary_keywords
                .iter()
                .chain(result.secondary_keywords.iter())
                .cloned()
                .collect(),
            entities: result.detected_entities.clone(),
            summary: result.summary.clone(),
            relevance: result.relevance_score,
            method: result.collection_method,
        }
    }

    /// Apply a partial settings update atomically.
    ///
    /// Any zero-sized value rejects the whole update and leaves the current
    /// settings untouched.
    pub fn update_configuration(&self, update: CollectorUpdate) -> bool {
        let values = [
            update.primary_window_size,
            update.max_query_length,
            update.max_query_entities,
            update.max_primary_keywords,
        ];
        if values.iter().flatten().any(|v| *v == 0) {
            debug!("Ignoring collector update with zero-sized value: {:?}", update);
            return false;
        }

        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        let mut settings = guard.settings.clone();
        if let Some(v) = update.primary_window_size {
            settings.extraction.primary_window_size = v;
        }
        if let Some(v) = update.secondary_window_size {
            settings.extraction.secondary_window_size = v;
        }
        if let Some(v) = update.max_primary_keywords {
            settings.extraction.max_primary_keywords = v;
        }
        if let Some(v) = update.max_secondary_keywords {
            settings.extraction.max_secondary_keywords = v;
        }
        if let Some(v) = update.max_query_length {
            settings.collector.max_query_length = v;
        }
        if let Some(v) = update.max_query_entities {
            settings.collector.max_query_entities = v;
        }
        info!("Updated context collector configuration: {:?}", update);
        *guard = Arc::new(CollectorState::new(settings));
        true
    }

    /// Active configuration snapshot.
    pub fn statistics(&self) -> CollectorSettings {
        self.snapshot().settings.clone()
    }

    /// Share of keywords that look like genre vocabulary, in `[0, 1]`.
    pub fn assess_keyword_quality(keywords: &[String]) -> f32 {
        if keywords.is_empty() {
            return 0.0;
        }
        let total: f32 = keywords
            .iter()
            .map(|k| {
                let len_score = match char_len(k) {
                    0 | 1 => 0.0,
                    2 => 0.1,
                    _ => 0.2,
                };
                let story_score = if is_story_element(k) { 0.3 } else { 0.0 };
                len_score + story_score
            })
            .sum();
        (total / keywords.len() as f32).min(1.0)
    }
}

pub fn is_story_element(word: &str) -> bool {
    if word.chars().any(|c| STORY_ELEMENT_CHARS.contains(&c)) {
        return true;
    }
    let lowered = word.to_lowercase();
    STORY_ELEMENT_WORDS.iter().any(|w| lowered.contains(w))
}

/// Entities, then primary keywords, then the summary, within the length
/// budget. Story-element keywords move ahead when the budget is tight.
fn build_query(
    context: &ExtractedContext,
    entities: &[String],
    references: &[DetectedReference],
    config: &CollectorConfig,
) -> String {
    let max = config.max_query_length;
    let mut parts: Vec<String> = entities
        .iter()
        .take(config.max_query_entities)
        .cloned()
        .collect();

    let covered: Vec<String> = entities
        .iter()
        .map(|e| e.to_lowercase())
        .chain(references.iter().map(|r| r.matched_text.to_lowercase()))
        .collect();
    let mut keywords: Vec<&String> = context
        .primary_keywords
        .iter()
        .filter(|k| !covered.contains(&k.to_lowercase()))
        .collect();

    let needed: usize = parts
        .iter()
        .map(|p| char_len(p))
        .chain(keywords.iter().map(|k| char_len(k)))
        .map(|n| n + 1)
        .sum();
    if needed > max {
        keywords.sort_by_key(|k| !is_story_element(k));
    }
    parts.extend(keywords.into_iter().cloned());

    let mut query = String::new();
    let mut used = 0;
    for part in &parts {
        let len = char_len(part);
        let extra = if query.is_empty() { len } else { len + 1 };
        if used + extra > max {
            if query.is_empty() {
                query = truncate_chars(part, max);
                used = char_len(&query);
            }
            continue;
        }
        if !query.is_empty() {
            query.push(' ');
        }
        query.push_str(part);
        used += extra;
    }

    if !query.is_empty() && !context.summary.is_empty() && used + 1 < max {
        let remaining = max - used - 1;
        let summary = truncate_chars(&context.summary, remaining);
        if !summary.trim().is_empty() {
            query.push(' ');
            query.push_str(summary.trim_end());
        }
    }

    if query.trim().is_empty() {
        let tail = tail_chars(&context.before_context, config.fallback_query_chars);
        query = truncate_chars(tail.trim(), max);
        if !query.is_empty() {
            debug!("No entities or keywords, using before-context tail as query");
        }
    }
    query
}

fn enhanced_relevance(context: &ExtractedContext, entity_count: usize) -> f32 {
    let entity_bonus = (entity_count as f32 * 0.05).min(0.2);
    let keywords: Vec<String> = context
        .primary_keywords
        .iter()
        .chain(context.secondary_keywords.iter())
        .cloned()
        .collect();
    let quality = ContextCollector::assess_keyword_quality(&keywords);
    let length_factor = (char_len(&context.before_context) as f32 / FULL_LENGTH_CHARS).min(1.0);
    (context.relevance_score + entity_bonus + quality * 0.1 + length_factor * 0.1).clamp(0.0, 1.0)
}

fn collection_summary(context: &ExtractedContext, entities: &[String], max_chars: usize) -> String {
    let mut parts = Vec::new();
    if !entities.is_empty() {
        parts.push(entities.iter().take(5).cloned().collect::<Vec<_>>().join(", "));
    }
    if !context.summary.is_empty() {
        parts.push(context.summary.clone());
    }
    truncate_with_ellipsis(&parts.join(" | "), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::models::{Entity, EntityType};
    use crate::repository::InMemoryCatalog;
    use pretty_assertions::assert_eq;

    fn collector(entries: Vec<Entity>) -> ContextCollector {
        let detector = ReferenceDetector::new(
            Arc::new(InMemoryCatalog::new(entries)),
            DetectionConfig::default(),
        );
        ContextCollector::new(
            Arc::new(detector),
            ExtractionConfig::default(),
            CollectorConfig::default(),
        )
    }

    fn catalog() -> Vec<Entity> {
        vec![
            Entity::new("c1", "陈云寒", EntityType::Character).with_alias("云寒"),
            Entity::new("o1", "清心符", EntityType::Object),
            Entity::new("o2", "梨木符案", EntityType::Object),
        ]
    }

    #[test]
    fn test_full_collection_leads_with_entities() {
        let text = "夜深了。陈云寒拿起清心符，放在梨木符案上。云寒笑了";
        let result = collector(catalog()).collect(text, text.chars().count() as i64);
        assert_eq!(result.collection_method, CollectionMethod::Full);
        assert_eq!(
            result.detected_entities,
            vec!["陈云寒", "清心符", "梨木符案"]
        );
        assert!(result.rag_query.starts_with("陈云寒 清心符 梨木符案"));
        assert!(char_len(&result.rag_query) <= 200);
        assert!(result.relevance_score > 0.0 && result.relevance_score <= 1.0);
    }

    #[test]
    fn test_fallback_without_entities() {
        let text = "The lantern swung over the harbor wall.";
        let result = collector(catalog()).collect(text, text.len() as i64);
        assert_eq!(result.collection_method, CollectionMethod::Fallback);
        assert!(result.detected_entities.is_empty());
        assert!(result.rag_query.starts_with("lantern"));
    }

    #[test]
    fn test_invalid_input_is_empty() {
        let c = collector(catalog());
        for (text, cursor) in [("", 0), ("陈云寒", -1), ("陈云寒", 4)] {
            let result = c.collect(text, cursor);
            assert_eq!(result, ContextCollectionResult::empty(cursor));
        }
    }

    #[test]
    fn test_query_respects_max_length() {
        let c = collector(catalog());
        assert!(c.update_configuration(CollectorUpdate {
            max_query_length: Some(12),
            ..CollectorUpdate::default()
        }));
        let text = "陈云寒拿起清心符，放在梨木符案上。";
        let result = c.collect(text, text.chars().count() as i64);
        assert!(char_len(&result.rag_query) <= 12);
        assert!(result.rag_query.starts_with("陈云寒 清心符"));
    }

    #[test]
    fn test_punctuation_only_uses_before_context_tail() {
        let text = "…… —— ！";
        let result = collector(Vec::new()).collect(text, text.chars().count() as i64);
        assert_eq!(result.rag_query, "…… —— ！");
        assert_eq!(result.collection_method, CollectionMethod::Full);
    }

    #[test]
    fn test_update_configuration_is_all_or_nothing() {
        let c = collector(Vec::new());
        let before = c.statistics();
        assert!(!c.update_configuration(CollectorUpdate {
            primary_window_size: Some(50),
            max_query_length: Some(0),
            ..CollectorUpdate::default()
        }));
        assert_eq!(c.statistics(), before);

        assert!(c.update_configuration(CollectorUpdate {
            primary_window_size: Some(50),
            ..CollectorUpdate::default()
        }));
        assert_eq!(c.statistics().extraction.primary_window_size, 50);
        assert_eq!(c.statistics().collector, before.collector);
    }

    #[test]
    fn test_oversized_windows_are_clamped_to_text() {
        let c = collector(Vec::new());
        assert!(c.update_configuration(CollectorUpdate {
            primary_window_size: Some(usize::MAX),
            secondary_window_size: Some(usize::MAX),
            ..CollectorUpdate::default()
        }));
        let result = c.collect("abc. def.", 3);
        assert_eq!(result.context, "abc");
        assert_eq!(result.trigger_position, 3);
    }

    #[test]
    fn test_rag_optimized_query_shape() {
        let c = collector(catalog());
        let text = "陈云寒拿起清心符。";
        let result = c.collect(text, text.chars().count() as i64);
        let bundle = c.get_rag_optimized_query(&result);
        assert_eq!(bundle.query, result.rag_query);
        assert_eq!(bundle.entities, result.detected_entities);
        assert_eq!(bundle.method, CollectionMethod::Full);
        assert_eq!(
            bundle.keywords.len(),
            result.primary_keywords.len() + result.secondary_keywords.len()
        );
    }

    #[test]
    fn test_keyword_quality() {
        assert_eq!(ContextCollector::assess_keyword_quality(&[]), 0.0);
        let strong = vec!["清心符".to_string(), "长剑".to_string()];
        let weak = vec!["窗外".to_string(), "风声".to_string()];
        assert!(
            ContextCollector::assess_keyword_quality(&strong)
                > ContextCollector::assess_keyword_quality(&weak)
        );
        assert!(is_story_element("talisman"));
        assert!(!is_story_element("harbor"));
    }

    #[test]
    fn test_story_elements_kept_when_budget_is_tight() {
        let context = ExtractedContext {
            primary_keywords: vec!["窗外".into(), "风声".into(), "长剑".into()],
            before_context: "窗外风声，长剑".into(),
            ..ExtractedContext::empty(7)
        };
        let config = CollectorConfig {
            max_query_length: 5,
            ..CollectorConfig::default()
        };
        assert_eq!(build_query(&context, &[], &[], &config), "长剑 窗外");
    }
}
