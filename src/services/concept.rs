//! Coarse, cache-friendly concept mention checks and autocomplete lookups.
//!
//! Shares the term/boundary primitive with the reference detector but skips
//! confidence shaping and exclusion filters.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use moka::sync::Cache;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ConceptConfig;
use crate::models::{Concept, ConceptMatch};
use crate::repository::EntityCatalog;
use crate::services::matching::{contains_term, find_term};
use crate::utils::text::char_len;
use crate::ScrivoError;

/// Ranking bucket for an autocomplete hit (lower is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    NamePrefix,
    NameSubstring,
    AliasPrefix,
    AliasSubstring,
}

/// Cache occupancy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub entries: u64,
    pub max_entries: u64,
    pub concepts: usize,
}

/// Aggregate mention statistics for one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptStatistics {
    pub total_matches: usize,
    pub unique_concepts: usize,
    pub concept_types: BTreeMap<String, usize>,
    /// Up to five `(concept_id, count)` pairs, most frequent first.
    pub most_frequent: Vec<(String, usize)>,
    /// Matched chars over total chars.
    pub coverage_ratio: f64,
}

pub struct ConceptDetector {
    config: ConceptConfig,
    concepts: RwLock<Vec<Concept>>,
    /// Text hash -> detected concepts. Inserts stop once full.
    cache: Cache<u64, Arc<Vec<Concept>>>,
    catalog_generation: AtomicU64,
}

impl ConceptDetector {
    pub fn new(config: ConceptConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_cache_entries.max(1))
            .build();
        Self {
            config,
            concepts: RwLock::new(Vec::new()),
            cache,
            catalog_generation: AtomicU64::new(0),
        }
    }

    /// Replace the concept set.
    pub fn load_concepts(&self, concepts: Vec<Concept>) {
        let count = concepts.len();
        *self.concepts.write().unwrap_or_else(|e| e.into_inner()) = concepts;
        self.clear_cache();
        info!("Loaded {} concepts", count);
    }

    /// Replace the concept set with every catalog entry.
    pub fn load_from_catalog(&self, catalog: &dyn EntityCatalog) -> Result<usize, ScrivoError> {
        let entries = catalog.all_entries()?;
        let concepts: Vec<Concept> = entries.iter().map(Concept::from).collect();
        let count = concepts.len();
        self.load_concepts(concepts);
        self.catalog_generation
            .store(catalog.generation(), Ordering::SeqCst);
        Ok(count)
    }

    /// Reload from `catalog` when it changed since the last load.
    pub fn sync_with_catalog(&self, catalog: &dyn EntityCatalog) -> bool {
        if catalog.generation() == self.catalog_generation.load(Ordering::SeqCst) {
            return false;
        }
        match self.load_from_catalog(catalog) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to refresh concepts from catalog: {}", e);
                false
            }
        }
    }

    /// Add or replace a concept by id.
    pub fn add_concept(&self, concept: Concept) {
        {
            let mut concepts = self.concepts.write().unwrap_or_else(|e| e.into_inner());
            match concepts.iter_mut().find(|c| c.id == concept.id) {
                Some(existing) => *existing = concept,
                None => concepts.push(concept),
            }
        }
        self.clear_cache();
    }

    pub fn remove_concept(&self, concept_id: &str) -> bool {
        let removed = {
            let mut concepts = self.concepts.write().unwrap_or_else(|e| e.into_inner());
            let before = concepts.len();
            concepts.retain(|c| c.id != concept_id);
            concepts.len() != before
        };
        if removed {
            self.clear_cache();
        }
        removed
    }

    pub fn concepts(&self) -> Vec<Concept> {
        self.concepts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Concepts mentioned in `text`, ordered by priority then insertion order.
    pub fn detect(&self, text: &str) -> Vec<Concept> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let key = text_hash(text);
        if let Some(hit) = self.cache.get(&key) {
            return hit.as_ref().clone();
        }

        let mut detected: Vec<Concept> = self
            .concepts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.auto_detect && self.is_mentioned(c, text))
            .cloned()
            .collect();
        detected.sort_by_key(Concept::effective_priority);

        if self.cached_entries() < self.config.max_cache_entries {
            self.cache.insert(key, Arc::new(detected.clone()));
        }
        debug!("Detected {} concepts", detected.len());
        detected
    }

    fn is_mentioned(&self, concept: &Concept, text: &str) -> bool {
        self.terms(concept)
            .any(|(term, _)| contains_term(text, term))
    }

    fn terms<'a>(&self, concept: &'a Concept) -> impl Iterator<Item = (&'a str, bool)> {
        let min = self.config.min_term_length;
        std::iter::once((concept.name.trim(), false))
            .chain(concept.aliases.iter().map(|a| (a.trim(), true)))
            .filter(move |(term, _)| !term.is_empty() && char_len(term) >= min)
    }

    /// Every occurrence of every concept term, sorted by start offset.
    pub fn detect_detailed(&self, text: &str) -> Vec<ConceptMatch> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let concepts = self.concepts.read().unwrap_or_else(|e| e.into_inner());
        let mut matches = Vec::new();
        for concept in concepts.iter() {
            for (term, is_alias) in self.terms(concept) {
                for m in find_term(text, term) {
                    matches.push(ConceptMatch {
                        concept_id: concept.id.clone(),
                        concept_name: concept.name.clone(),
                        concept_type: concept.concept_type,
                        matched_text: m.text,
                        start_offset: m.start,
                        end_offset: m.end,
                        confidence: if is_alias { 0.8 } else { 1.0 },
                    });
                }
            }
        }
        matches.sort_by_key(|m| m.start_offset);
        matches
    }

    /// Autocomplete candidates for a partially typed name.
    pub fn find_matching(&self, partial: &str) -> Vec<Concept> {
        let partial = partial.trim();
        if partial.is_empty() || char_len(partial) < self.config.min_term_length {
            return Vec::new();
        }
        let needle = partial.to_lowercase();

        let concepts = self.concepts.read().unwrap_or_else(|e| e.into_inner());
        let mut ranked: Vec<(MatchRank, u32, &Concept)> = concepts
            .iter()
            .filter_map(|c| rank_match(c, &needle).map(|rank| (rank, c.effective_priority(), c)))
            .collect();
        // Stable sort: insertion order breaks remaining ties.
        ranked.sort_by_key(|(rank, priority, _)| (*rank, *priority));

        ranked
            .into_iter()
            .take(self.config.max_suggestions)
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    pub fn statistics(&self, text: &str) -> ConceptStatistics {
        let matches = self.detect_detailed(text);

        let mut concept_types = BTreeMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();
        for m in &matches {
            *concept_types
                .entry(m.concept_type.to_string())
                .or_insert(0) += 1;
            match counts.iter_mut().find(|(id, _)| *id == m.concept_id) {
                Some((_, n)) => *n += 1,
                None => counts.push((m.concept_id.clone(), 1)),
            }
        }
        let unique_concepts = counts.len();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(5);

        let total_chars = char_len(text);
        let matched: usize = matches.iter().map(|m| m.end_offset - m.start_offset).sum();
        let coverage_ratio = if total_chars == 0 {
            0.0
        } else {
            matched as f64 / total_chars as f64
        };

        ConceptStatistics {
            total_matches: matches.len(),
            unique_concepts,
            concept_types,
            most_frequent: counts,
            coverage_ratio,
        }
    }

    /// Live entries. `entry_count` lags behind pending writes and
    /// invalidations, so count directly.
    fn cached_entries(&self) -> u64 {
        self.cache.iter().count() as u64
    }

    pub fn cache_info(&self) -> CacheInfo {
        CacheInfo {
            entries: self.cached_entries(),
            max_entries: self.config.max_cache_entries,
            concepts: self
                .concepts
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .len(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        debug!("Concept detection cache cleared");
    }
}

fn rank_match(concept: &Concept, needle: &str) -> Option<MatchRank> {
    let name = concept.name.to_lowercase();
    if name.starts_with(needle) {
        return Some(MatchRank::NamePrefix);
    }
    if name.contains(needle) {
        return Some(MatchRank::NameSubstring);
    }
    concept.aliases.iter().find_map(|alias| {
        let alias = alias.to_lowercase();
        if alias.starts_with(needle) {
            Some(MatchRank::AliasPrefix)
        } else if alias.contains(needle) {
            Some(MatchRank::AliasSubstring)
        } else {
            None
        }
    })
}

fn text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityType};
    use crate::repository::InMemoryCatalog;
    use pretty_assertions::assert_eq;

    fn detector() -> ConceptDetector {
        let detector = ConceptDetector::new(ConceptConfig::default());
        detector.load_concepts(vec![
            Concept::new("o1", "清心符", EntityType::Object),
            Concept::new("c1", "陈云寒", EntityType::Character).with_alias("云寒"),
            Concept::new("l1", "青云山", EntityType::Location),
        ]);
        detector
    }

    fn ids(concepts: &[Concept]) -> Vec<&str> {
        concepts.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_detect_orders_by_priority() {
        let detected = detector().detect("清心符落在青云山，云寒拾起");
        assert_eq!(ids(&detected), vec!["c1", "l1", "o1"]);
    }

    #[test]
    fn test_detect_skips_manual_concepts() {
        let detector = detector();
        let mut manual = Concept::new("p1", "退婚", EntityType::Plot);
        manual.auto_detect = false;
        detector.add_concept(manual);
        assert!(detector.detect("退婚之后").is_empty());
    }

    #[test]
    fn test_find_matching_rank_order() {
        let detector = ConceptDetector::new(ConceptConfig::default());
        detector.load_concepts(vec![
            Concept::new("a", "Old Stone Bridge", EntityType::Location),
            Concept::new("b", "Stonehold", EntityType::Location),
            Concept::new("c", "Keep", EntityType::Location).with_alias("Stone Keep"),
            Concept::new("d", "Tower", EntityType::Location).with_alias("the stone tower"),
            Concept::new("e", "Stoneheart", EntityType::Character),
        ]);
        let found = detector.find_matching("ston");
        // name prefix (character before location), name substring, alias prefix, alias substring
        assert_eq!(ids(&found), vec!["e", "b", "a", "c", "d"]);
    }

    #[test]
    fn test_find_matching_ignores_short_partials_and_caps_results() {
        let detector = ConceptDetector::new(ConceptConfig::default());
        detector.load_concepts(
            (0..15)
                .map(|i| Concept::new(format!("c{i}"), format!("Name{i}"), EntityType::Concept))
                .collect(),
        );
        assert!(detector.find_matching("N").is_empty());
        assert_eq!(detector.find_matching("name").len(), 10);
    }

    #[test]
    fn test_cache_stops_inserting_when_full() {
        let detector = ConceptDetector::new(ConceptConfig {
            max_cache_entries: 2,
            ..ConceptConfig::default()
        });
        detector.load_concepts(vec![Concept::new("o1", "清心符", EntityType::Object)]);
        detector.detect("清心符一");
        detector.detect("清心符二");
        detector.detect("清心符三");
        assert_eq!(detector.cache_info().entries, 2);
        // uncached text still detects
        assert_eq!(detector.detect("清心符三").len(), 1);
    }

    #[test]
    fn test_mutations_invalidate_cache() {
        let detector = detector();
        assert_eq!(detector.detect("云寒来了").len(), 1);
        assert_eq!(detector.cache_info().entries, 1);
        assert!(detector.remove_concept("c1"));
        assert_eq!(detector.cache_info().entries, 0);
        assert!(detector.detect("云寒来了").is_empty());
        assert!(!detector.remove_concept("c1"));
    }

    #[test]
    fn test_detect_detailed_spans_and_confidence() {
        let matches = detector().detect_detailed("云寒看着陈云寒");
        let spans: Vec<(&str, usize, f32)> = matches
            .iter()
            .map(|m| (m.matched_text.as_str(), m.start_offset, m.confidence))
            .collect();
        assert_eq!(
            spans,
            vec![("云寒", 0, 0.8), ("陈云寒", 4, 1.0), ("云寒", 5, 0.8)]
        );
    }

    #[test]
    fn test_statistics() {
        let stats = detector().statistics("清心符，清心符，青云山");
        assert_eq!(stats.total_matches, 3);
        assert_eq!(stats.unique_concepts, 2);
        assert_eq!(stats.most_frequent[0], ("o1".to_string(), 2));
        assert_eq!(stats.concept_types.get("object"), Some(&2));
        assert!((stats.coverage_ratio - 9.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_sync_with_catalog_follows_generation() {
        let catalog = InMemoryCatalog::new(vec![Entity::new("c1", "Mara", EntityType::Character)]);
        let detector = ConceptDetector::new(ConceptConfig::default());
        assert_eq!(detector.load_from_catalog(&catalog).unwrap(), 1);
        assert!(!detector.sync_with_catalog(&catalog));

        catalog.upsert(Entity::new("l1", "Greyhaven", EntityType::Location));
        assert!(detector.sync_with_catalog(&catalog));
        assert_eq!(detector.concepts().len(), 2);
        assert_eq!(detector.detect("Mara reached Greyhaven").len(), 2);
    }
}
