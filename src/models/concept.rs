use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityType};

/// A generic domain concept for coarse, cache-friendly mention checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(rename = "type")]
    pub concept_type: EntityType,
    /// Explicit ranking priority; falls back to the type default when absent.
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,
    #[serde(default)]
    pub description: String,
}

fn default_auto_detect() -> bool {
    true
}

impl Concept {
    pub fn new(id: impl Into<String>, name: impl Into<String>, concept_type: EntityType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            concept_type,
            priority: None,
            auto_detect: true,
            description: String::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Effective ranking priority (lower sorts first).
    pub fn effective_priority(&self) -> u32 {
        self.priority
            .unwrap_or_else(|| self.concept_type.default_priority())
    }
}

impl From<&Entity> for Concept {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            aliases: entity.aliases.clone(),
            concept_type: entity.entity_type,
            priority: None,
            auto_detect: entity.trackable,
            description: entity.description.clone(),
        }
    }
}

/// One located occurrence of a concept term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptMatch {
    pub concept_id: String,
    pub concept_name: String,
    pub concept_type: EntityType,
    pub matched_text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub confidence: f32,
}
