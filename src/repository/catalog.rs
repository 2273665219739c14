//! Read-only entity catalog consumed by the detectors.
//!
//! The catalog is an external collaborator: detectors take a snapshot per call
//! through [`EntityCatalog::all_entries`] and treat any error as an empty
//! catalog.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::Deserialize;
use tracing::{debug, info};

use crate::models::Entity;
use crate::ScrivoError;

/// Source of catalog entries.
pub trait EntityCatalog: Send + Sync {
    /// Snapshot of every entry.
    fn all_entries(&self) -> Result<Vec<Entity>, ScrivoError>;

    /// Look up a single entry by id.
    fn entry(&self, id: &str) -> Result<Option<Entity>, ScrivoError>;

    /// Monotonic counter bumped on every mutation; detectors compare it to
    /// decide when their caches are stale.
    fn generation(&self) -> u64 {
        0
    }
}

/// Thread-safe in-memory catalog.
#[derive(Default)]
pub struct InMemoryCatalog {
    entries: RwLock<Vec<Entity>>,
    generation: AtomicU64,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<Entity>) -> Self {
        Self {
            entries: RwLock::new(entries),
            generation: AtomicU64::new(0),
        }
    }

    /// Insert or replace the entry with the same id.
    pub fn upsert(&self, entity: Entity) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => entries.push(entity),
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Remove an entry by id. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if removed {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityCatalog for InMemoryCatalog {
    fn all_entries(&self) -> Result<Vec<Entity>, ScrivoError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn entry(&self, id: &str) -> Result<Option<Entity>, ScrivoError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { entries: Vec<Entity> },
    List(Vec<Entity>),
}

/// Parse catalog entries from YAML or JSON text.
///
/// Entries without an id get a random one; blank aliases are dropped.
pub fn parse_catalog(contents: &str, is_json: bool) -> Result<Vec<Entity>, ScrivoError> {
    let file: CatalogFile = if is_json {
        serde_json::from_str(contents)?
    } else {
        serde_yaml_ng::from_str(contents)?
    };
    let mut entries = match file {
        CatalogFile::Wrapped { entries } | CatalogFile::List(entries) => entries,
    };

    for entry in &mut entries {
        if entry.id.trim().is_empty() {
            entry.id = uuid::Uuid::new_v4().to_string();
            debug!("Assigned id {} to catalog entry '{}'", entry.id, entry.name);
        }
        entry.aliases.retain(|a| !a.trim().is_empty());
    }

    Ok(entries)
}

/// Load a catalog file (`.json`, or YAML for anything else).
pub fn load_catalog_file(path: &Path) -> Result<InMemoryCatalog, ScrivoError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ScrivoError::Catalog(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let entries = parse_catalog(&contents, is_json)?;
    info!(
        "Loaded {} catalog entries from {}",
        entries.len(),
        path.display()
    );
    Ok(InMemoryCatalog::new(entries))
}
