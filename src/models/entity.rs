use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of story element tracked by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Character,
    Location,
    Object,
    Plot,
    Concept,
}

impl EntityType {
    /// All entity types in display order.
    pub fn all() -> [EntityType; 5] {
        [
            EntityType::Character,
            EntityType::Location,
            EntityType::Object,
            EntityType::Plot,
            EntityType::Concept,
        ]
    }

    /// Default ranking priority (lower sorts first).
    pub fn default_priority(self) -> u32 {
        match self {
            EntityType::Character => 1,
            EntityType::Location => 2,
            EntityType::Plot => 3,
            EntityType::Object => 4,
            EntityType::Concept => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Character => "character",
            EntityType::Location => "location",
            EntityType::Object => "object",
            EntityType::Plot => "plot",
            EntityType::Concept => "concept",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// A catalog-tracked story element (codex entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Whether the reference detector scans for this entry.
    #[serde(default = "default_true")]
    pub trackable: bool,
    /// Global entries are always relevant and get a small confidence bonus.
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub description: String,
}

impl Entity {
    /// Create a trackable entity with no aliases.
    pub fn new(id: impl Into<String>, name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type,
            aliases: Vec::new(),
            trackable: true,
            is_global: false,
            description: String::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn untracked(mut self) -> Self {
        self.trackable = false;
        self
    }

    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    /// Canonical name plus non-blank aliases, longest first, deduplicated
    /// case-insensitively. The flag marks alias terms.
    pub fn search_terms(&self) -> Vec<(String, bool)> {
        let mut terms: Vec<(String, bool)> = Vec::new();
        let canonical = self.name.trim();
        if !canonical.is_empty() {
            terms.push((canonical.to_string(), false));
        }
        for alias in &self.aliases {
            let alias = alias.trim();
            if alias.is_empty() {
                continue;
            }
            let lowered = alias.to_lowercase();
            if terms.iter().any(|(t, _)| t.to_lowercase() == lowered) {
                continue;
            }
            terms.push((alias.to_string(), true));
        }
        // Stable sort keeps the canonical name ahead of an equally long alias.
        terms.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        terms
    }
}

/// Discrete bucket for a reference confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// High >= 0.8, Medium >= 0.6, Low otherwise.
    pub fn from_score(confidence: f32) -> Self {
        if confidence >= 0.8 {
            ConfidenceLevel::High
        } else if confidence >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located occurrence of an entity name or alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedReference {
    pub entity_id: String,
    /// Canonical name of the referenced entity.
    pub entity_name: String,
    pub entity_type: EntityType,
    /// Text exactly as it appears in the input.
    pub matched_text: String,
    /// Char offset of the first matched char.
    pub start_offset: usize,
    /// Char offset one past the last matched char.
    pub end_offset: usize,
    pub confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub is_alias: bool,
    pub context_before: String,
    pub context_after: String,
}

impl DetectedReference {
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }

    pub fn overlaps(&self, other: &DetectedReference) -> bool {
        self.start_offset < other.end_offset && other.start_offset < self.end_offset
    }
}
