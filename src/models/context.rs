use serde::{Deserialize, Serialize};
use std::fmt;

/// Rhetorical type of a context segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Dialogue,
    Action,
    Description,
    Narrative,
}

impl ContextType {
    /// Base weight used when scoring segment importance.
    pub fn weight(self) -> f32 {
        match self {
            ContextType::Dialogue => 0.8,
            ContextType::Action => 0.9,
            ContextType::Description => 0.6,
            ContextType::Narrative => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContextType::Dialogue => "dialogue",
            ContextType::Action => "action",
            ContextType::Description => "description",
            ContextType::Narrative => "narrative",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentence- or paragraph-level chunk of an extraction window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSegment {
    pub text: String,
    /// Char offset into the full text.
    pub start_offset: usize,
    pub end_offset: usize,
    pub context_type: ContextType,
    /// Normalized importance in [0, 1].
    pub importance: f32,
    /// Keywords (from the extraction's ranked set) that occur in this segment.
    pub keywords: Vec<String>,
}

/// Bounded, ranked context around a trigger position.
///
/// Built fresh per extraction call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContext {
    pub trigger_position: i64,
    pub before_context: String,
    pub after_context: String,
    pub segments: Vec<ContextSegment>,
    pub primary_keywords: Vec<String>,
    pub secondary_keywords: Vec<String>,
    pub relevance_score: f32,
    pub summary: String,
}

impl ExtractedContext {
    /// The zeroed result for invalid input.
    pub fn empty(trigger_position: i64) -> Self {
        Self {
            trigger_position,
            before_context: String::new(),
            after_context: String::new(),
            segments: Vec::new(),
            primary_keywords: Vec::new(),
            secondary_keywords: Vec::new(),
            relevance_score: 0.0,
            summary: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_context.is_empty() && self.after_context.is_empty()
    }
}

/// How a collection result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMethod {
    /// Entities were detected near the cursor.
    Full,
    /// Input failed validation.
    Empty,
    /// No entities, but keywords carried the query.
    Fallback,
}

impl CollectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionMethod::Full => "full",
            CollectionMethod::Empty => "empty",
            CollectionMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for CollectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval query bundle assembled from detection + extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextCollectionResult {
    pub trigger_position: i64,
    pub primary_keywords: Vec<String>,
    pub secondary_keywords: Vec<String>,
    /// Canonical names of detected entities, in order of first mention.
    pub detected_entities: Vec<String>,
    pub rag_query: String,
    pub relevance_score: f32,
    pub collection_method: CollectionMethod,
    /// Before-cursor window the query was built from.
    pub context: String,
    pub summary: String,
}

impl ContextCollectionResult {
    pub fn empty(trigger_position: i64) -> Self {
        Self {
            trigger_position,
            primary_keywords: Vec::new(),
            secondary_keywords: Vec::new(),
            detected_entities: Vec::new(),
            rag_query: String::new(),
            relevance_score: 0.0,
            collection_method: CollectionMethod::Empty,
            context: String::new(),
            summary: String::new(),
        }
    }
}

/// Exact bundle shape handed to the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagQuery {
    pub query: String,
    pub context: String,
    pub keywords: Vec<String>,
    pub entities: Vec<String>,
    pub summary: String,
    pub relevance: f32,
    pub method: CollectionMethod,
}
