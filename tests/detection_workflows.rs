//! End-to-end detection over a shared catalog: reference detection, concept
//! lookup, and the invariants every detection result must hold.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use common::builders::{catalog, EntityBuilder};
use common::story_catalog;
use scrivo::config::{ConceptConfig, DetectionConfig};
use scrivo::models::{ConfidenceLevel, EntityType};
use scrivo::repository::{EntityCatalog, InMemoryCatalog};
use scrivo::services::{ConceptDetector, FilterKind, ReferenceDetector};

fn detector(catalog: Arc<InMemoryCatalog>) -> ReferenceDetector {
    let catalog: Arc<dyn EntityCatalog> = catalog;
    ReferenceDetector::new(catalog, DetectionConfig::default())
}

// =============================================================================
// Reference detection
// =============================================================================

#[test]
fn cjk_entities_detected_without_whitespace() {
    let refs = detector(story_catalog()).detect("陈云寒拿起清心符，放在梨木符案上");

    let spans: Vec<(&str, usize, usize)> = refs
        .iter()
        .map(|r| (r.entity_name.as_str(), r.start_offset, r.end_offset))
        .collect();
    assert_eq!(
        spans,
        vec![("陈云寒", 0, 3), ("清心符", 5, 8), ("梨木符案", 11, 15)]
    );
    assert!(refs.iter().all(|r| r.confidence >= 0.6));
    assert!(refs.iter().all(|r| !r.is_alias));
}

#[test]
fn time_expression_beats_similarly_named_entity() {
    let catalog = catalog(vec![EntityBuilder::new("第三次", EntityType::Plot).build()]);
    let refs = detector(catalog).detect("这个月第三次了");
    assert!(refs.is_empty());
}

#[test]
fn latin_names_resolve_to_longest_term() {
    let refs = detector(story_catalog()).detect("Mara Vell rode into Greyhaven at dusk.");
    let names: Vec<&str> = refs.iter().map(|r| r.matched_text.as_str()).collect();
    assert_eq!(names, vec!["Mara Vell", "Greyhaven"]);
    assert_eq!(refs[0].confidence_level, ConfidenceLevel::High);
}

#[test]
fn alias_mentions_report_canonical_name() {
    let refs = detector(story_catalog()).detect("云寒笑了");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].entity_name, "陈云寒");
    assert_eq!(refs[0].matched_text, "云寒");
    assert!(refs[0].is_alias);
}

#[test]
fn everyday_words_do_not_read_as_negation() {
    let detector = detector(story_catalog());

    let names = |text: &str| -> Vec<String> {
        detector
            .detect(text)
            .into_iter()
            .map(|r| r.entity_name)
            .collect()
    };
    assert_eq!(names("他非常喜欢陈云寒"), vec!["陈云寒"]);
    assert_eq!(names("\"No,\" Mara said."), vec!["Mara Vell"]);
    assert_eq!(names("陈云寒来了"), vec!["陈云寒"]);
    assert!(names("他不是陈云寒。").is_empty());
}

#[test]
fn quantity_phrases_spare_places_and_people() {
    let detector = detector(story_catalog());
    let refs = detector.detect("Most of Greyhaven burned.");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].entity_name, "Greyhaven");

    let refs = detector.detect("Mara's friends arrived.");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].matched_text, "Mara");
}

#[test]
fn runtime_filter_edits_take_effect() {
    let detector = detector(story_catalog());
    assert_eq!(detector.detect("青云山下").len(), 1);

    assert!(detector.add_false_positive("青云山"));
    assert!(detector.detect("青云山下").is_empty());
    assert!(detector.remove_false_positive("青云山"));
    assert_eq!(detector.detect("青云山下").len(), 1);

    assert!(!detector.add_exclusion_pattern(FilterKind::TimeExpression, "[broken"));
    let stats = detector.statistics();
    assert_eq!(stats.time_filters.disabled, 1);
    assert_eq!(stats.disabled_patterns, vec!["[broken".to_string()]);
    assert_eq!(detector.detect("青云山下").len(), 1);
}

#[test]
fn catalog_mutations_are_seen_by_next_detection() {
    let shared = story_catalog();
    let detector = detector(shared.clone());
    assert!(detector.detect("白鹤来了").is_empty());

    shared.upsert(EntityBuilder::character("白鹤").build());
    assert_eq!(detector.detect("白鹤来了").len(), 1);
}

// =============================================================================
// Concept lookup
// =============================================================================

#[test]
fn concepts_follow_catalog() {
    let shared = story_catalog();
    let concepts = ConceptDetector::new(ConceptConfig::default());
    assert_eq!(concepts.load_from_catalog(shared.as_ref()).unwrap(), 6);

    let found: Vec<String> = concepts
        .detect("陈云寒望向青云山")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert!(found.contains(&"陈云寒".to_string()));
    assert!(found.contains(&"青云山".to_string()));

    let suggestions: Vec<String> = concepts
        .find_matching("云寒")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(suggestions, vec!["陈云寒".to_string()]);

    shared.remove("l1");
    assert!(concepts.sync_with_catalog(shared.as_ref()));
    assert!(concepts
        .detect("陈云寒望向青云山")
        .iter()
        .all(|c| c.name != "青云山"));
}

// =============================================================================
// Invariants
// =============================================================================

fn story_text() -> impl Strategy<Value = String> {
    let pieces = prop::sample::select(vec![
        "陈云寒", "云寒", "清心符", "梨木符案", "青云山", "Mara", "Mara Vell", "Greyhaven",
        "不是", "而是", "第三次", "这个月", "，", "。", " ", "the ", "walked ", "三把", "剑",
    ]);
    prop::collection::vec(pieces, 0..24).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn detected_references_hold_invariants(text in story_text()) {
        let refs = detector(story_catalog()).detect(&text);
        let len = text.chars().count();

        for r in &refs {
            prop_assert!((0.0..=1.0).contains(&r.confidence));
            prop_assert!(r.confidence >= 0.6);
            prop_assert!(r.start_offset < r.end_offset && r.end_offset <= len);
        }
        for pair in refs.windows(2) {
            prop_assert!(pair[0].start_offset <= pair[1].start_offset);
        }
        for (i, a) in refs.iter().enumerate() {
            for b in refs.iter().skip(i + 1) {
                if a.entity_id == b.entity_id {
                    prop_assert!(!a.overlaps(b));
                }
            }
        }
    }
}
