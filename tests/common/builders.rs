//! Test data builders for catalog construction.
//!
//! Provides fluent API for creating test entities with sensible defaults.

#![allow(dead_code)]

use std::sync::Arc;

use scrivo::models::{Entity, EntityType};
use scrivo::repository::InMemoryCatalog;

/// Builder for creating catalog entities.
pub struct EntityBuilder {
    id: Option<String>,
    name: String,
    entity_type: EntityType,
    aliases: Vec<String>,
    trackable: bool,
    is_global: bool,
}

impl EntityBuilder {
    /// Create a character builder with the given name.
    pub fn character(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Character)
    }

    pub fn location(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Location)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Object)
    }

    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: None,
            name: name.into(),
            entity_type,
            aliases: Vec::new(),
            trackable: true,
            is_global: false,
        }
    }

    /// Set an explicit id (defaults to the name).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
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

    pub fn build(self) -> Entity {
        let id = self.id.unwrap_or_else(|| self.name.clone());
        let mut entity = Entity::new(id, self.name, self.entity_type);
        entity.aliases = self.aliases;
        entity.trackable = self.trackable;
        entity.is_global = self.is_global;
        entity
    }
}

/// Wrap built entities in a shared in-memory catalog.
pub fn catalog(entries: Vec<Entity>) -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::new(entries))
}

/// Small mixed-language catalog shared by the workflow tests.
pub fn story_catalog() -> Arc<InMemoryCatalog> {
    catalog(vec![
        EntityBuilder::character("陈云寒").id("c1").alias("云寒").build(),
        EntityBuilder::object("清心符").id("o1").build(),
        EntityBuilder::object("梨木符案").id("o2").build(),
        EntityBuilder::location("青云山").id("l1").build(),
        EntityBuilder::character("Mara Vell").id("c2").alias("Mara").build(),
        EntityBuilder::location("Greyhaven").id("l2").build(),
    ])
}
