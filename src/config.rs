//! Runtime configuration for the detectors, extractor, collector, and
//! completion driver.
//!
//! Loaded from `{data_path}/scrivo.toml` or the `SCRIVO_CONFIG` env var (JSON).
//! Every field has a default, so partial files are fine. Out-of-range values are
//! replaced by defaults instead of failing: a bad setting must never take down an
//! editing session.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Reference detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Candidates below this confidence are discarded.
    pub min_confidence_threshold: f32,
    /// Shorter search terms are ignored.
    pub min_term_length: usize,
    /// Chars captured on each side of a reference for display.
    pub context_window: usize,
    /// Chars scanned on each side of a match for entity-type cues.
    pub cue_window: usize,
    /// Chars scanned before a match for negation markers.
    pub negation_lookback: usize,
    /// Multiplier applied to negated matches.
    pub negation_penalty: f32,
    pub fuzzy_matching: bool,
    /// Normalized Levenshtein similarity required for a fuzzy match.
    pub fuzzy_min_similarity: f64,
    /// Minimum word length (chars) considered for fuzzy matching.
    pub fuzzy_min_length: usize,
    /// Extra terms dropped unconditionally.
    pub false_positives: Vec<String>,
    /// Extra time-expression patterns (regex).
    pub time_patterns: Vec<String>,
    /// Extra quantity-expression patterns (regex).
    pub quantity_patterns: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.6,
            min_term_length: 2,
            context_window: 50,
            cue_window: 20,
            negation_lookback: 20,
            negation_penalty: 0.5,
            fuzzy_matching: true,
            fuzzy_min_similarity: 0.85,
            fuzzy_min_length: 5,
            false_positives: Vec::new(),
            time_patterns: Vec::new(),
            quantity_patterns: Vec::new(),
        }
    }
}

/// Concept detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptConfig {
    /// Texts cached before inserts stop.
    pub max_cache_entries: u64,
    pub min_term_length: usize,
    pub max_suggestions: usize,
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 1000,
            min_term_length: 2,
            max_suggestions: 10,
        }
    }
}

/// Context window and keyword settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Chars before the cursor.
    pub primary_window_size: usize,
    /// Chars after the cursor.
    pub secondary_window_size: usize,
    /// Max extra chars a window may move to land on a sentence boundary.
    pub boundary_margin: usize,
    pub max_primary_keywords: usize,
    pub max_secondary_keywords: usize,
    pub summary_max_chars: usize,
    /// Importance multiplier for segments after the cursor.
    pub after_context_weight: f32,
    /// Rank multiplier for tokens that are detected entity mentions.
    pub entity_boost: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            primary_window_size: 300,
            secondary_window_size: 100,
            boundary_margin: 40,
            max_primary_keywords: 10,
            max_secondary_keywords: 5,
            summary_max_chars: 120,
            after_context_weight: 0.3,
            entity_boost: 1.5,
        }
    }
}

/// Retrieval query assembly settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub max_query_length: usize,
    pub max_query_entities: usize,
    /// Tail of the before-context used when nothing else fills the query.
    pub fallback_query_chars: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_query_length: 200,
            max_query_entities: 5,
            fallback_query_chars: 150,
        }
    }
}

/// AI completion call settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

/// Retrieval collaborator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// How long an availability probe result is trusted.
    pub availability_ttl_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            availability_ttl_secs: 30,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrivoConfig {
    pub detection: DetectionConfig,
    pub concepts: ConceptConfig,
    pub extraction: ExtractionConfig,
    pub collector: CollectorConfig,
    pub completion: CompletionConfig,
    pub retrieval: RetrievalConfig,
}

impl ScrivoConfig {
    /// Replace out-of-range values with their defaults, logging each one.
    pub fn sanitized(mut self) -> Self {
        let d = DetectionConfig::default();
        if !(0.0..=1.0).contains(&self.detection.min_confidence_threshold) {
            warn!(
                "Ignoring min_confidence_threshold {} (must be within [0, 1])",
                self.detection.min_confidence_threshold
            );
            self.detection.min_confidence_threshold = d.min_confidence_threshold;
        }
        if !(0.0..=1.0).contains(&self.detection.negation_penalty) {
            warn!(
                "Ignoring negation_penalty {} (must be within [0, 1])",
                self.detection.negation_penalty
            );
            self.detection.negation_penalty = d.negation_penalty;
        }
        if !(0.0..=1.0).contains(&self.detection.fuzzy_min_similarity) {
            warn!(
                "Ignoring fuzzy_min_similarity {}",
                self.detection.fuzzy_min_similarity
            );
            self.detection.fuzzy_min_similarity = d.fuzzy_min_similarity;
        }
        if self.detection.min_term_length == 0 {
            self.detection.min_term_length = d.min_term_length;
        }

        let e = ExtractionConfig::default();
        if self.extraction.primary_window_size == 0 {
            warn!("Ignoring primary_window_size 0");
            self.extraction.primary_window_size = e.primary_window_size;
        }
        if self.extraction.summary_max_chars == 0 {
            self.extraction.summary_max_chars = e.summary_max_chars;
        }
        if !(0.0..=1.0).contains(&self.extraction.after_context_weight) {
            self.extraction.after_context_weight = e.after_context_weight;
        }
        if self.extraction.entity_boost < 1.0 {
            self.extraction.entity_boost = e.entity_boost;
        }

        if self.collector.max_query_length == 0 {
            warn!("Ignoring max_query_length 0");
            self.collector.max_query_length = CollectorConfig::default().max_query_length;
        }
        if self.completion.timeout_ms == 0 {
            self.completion.timeout_ms = CompletionConfig::default().timeout_ms;
        }
        self
    }
}

/// Load configuration with priority:
/// 1. `explicit` path, if given
/// 2. `{data_path}/scrivo.toml`
/// 3. `SCRIVO_CONFIG` env var (JSON)
/// 4. Defaults
pub fn load_config(data_path: &Path, explicit: Option<&Path>) -> ScrivoConfig {
    let default_path = data_path.join("scrivo.toml");
    let candidates = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::iter::once(default_path));

    for config_path in candidates {
        if !config_path.exists() {
            continue;
        }
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<ScrivoConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    return config.sanitized();
                }
                Err(e) => {
                    warn!(
                        "Failed to parse {}: {}. Using default.",
                        config_path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read {}: {}. Using default.",
                    config_path.display(),
                    e
                );
            }
        }
    }

    if let Ok(json) = std::env::var("SCRIVO_CONFIG") {
        match serde_json::from_str::<ScrivoConfig>(&json) {
            Ok(config) => {
                info!("Loaded config from SCRIVO_CONFIG env");
                return config.sanitized();
            }
            Err(e) => {
                warn!("Failed to parse SCRIVO_CONFIG: {}. Using default.", e);
            }
        }
    }

    ScrivoConfig::default()
}
