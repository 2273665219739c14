//! Shared initialization for the CLI and library embedders.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{load_config, ScrivoConfig};
use crate::repository::{load_catalog_file, EntityCatalog, InMemoryCatalog};
use crate::services::{
    AutoReplaceEngine, ConceptDetector, ContextCollector, ContextExtractor, ReferenceDetector,
    RetrievalGateway, RetrievalService,
};

/// Catalog file names probed inside the data directory, in order.
const CATALOG_FILES: &[&str] = &["catalog.yaml", "catalog.yml", "catalog.json"];

/// Application context holding the catalog and every service built on it.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: ScrivoConfig,
    pub catalog: Arc<InMemoryCatalog>,
    pub detector: Arc<ReferenceDetector>,
    pub concepts: ConceptDetector,
    pub extractor: ContextExtractor,
    pub collector: ContextCollector,
    pub retrieval: RetrievalGateway,
    pub auto_replace: AutoReplaceEngine,
}

/// Data path priority: explicit path > SCRIVO_DATA_PATH env > ./.scrivo (if exists) > ~/.scrivo
pub fn resolve_data_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var("SCRIVO_DATA_PATH").ok().map(PathBuf::from))
        .or_else(|| {
            let local_path = Path::new(".scrivo");
            if local_path.exists() && local_path.is_dir() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".scrivo"))
                .unwrap_or_else(|| PathBuf::from(".scrivo"))
        })
}

impl AppContext {
    /// Initialize application context.
    ///
    /// The catalog comes from `catalog_path` when given, otherwise from the
    /// first `catalog.{yaml,yml,json}` in the data directory. A missing
    /// catalog is not an error: detection simply finds nothing.
    pub fn new(
        explicit_path: Option<PathBuf>,
        config_path: Option<&Path>,
        catalog_path: Option<&Path>,
    ) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());

        let config = load_config(&data_path, config_path);

        let catalog = match catalog_path {
            Some(path) => load_catalog_file(path)?,
            None => match CATALOG_FILES
                .iter()
                .map(|name| data_path.join(name))
                .find(|p| p.exists())
            {
                Some(path) => load_catalog_file(&path)?,
                None => {
                    tracing::info!("No catalog found, starting with an empty one");
                    InMemoryCatalog::default()
                }
            },
        };

        Ok(Self::from_parts(data_path, config, Arc::new(catalog)))
    }

    /// Wire services around an already-loaded catalog.
    pub fn from_parts(
        data_path: PathBuf,
        config: ScrivoConfig,
        catalog: Arc<InMemoryCatalog>,
    ) -> Self {
        let shared: Arc<dyn EntityCatalog> = catalog.clone();
        let detector = Arc::new(ReferenceDetector::new(shared, config.detection.clone()));

        let concepts = ConceptDetector::new(config.concepts.clone());
        if let Err(e) = concepts.load_from_catalog(catalog.as_ref()) {
            tracing::warn!("Concept detector starts empty: {}", e);
        }

        let extractor = ContextExtractor::new(config.extraction.clone());
        let collector = ContextCollector::new(
            detector.clone(),
            config.extraction.clone(),
            config.collector.clone(),
        );

        Self {
            data_path,
            catalog,
            detector,
            concepts,
            extractor,
            collector,
            retrieval: RetrievalGateway::disabled(&config.retrieval),
            auto_replace: AutoReplaceEngine::new(),
            config,
        }
    }

    /// Attach a retrieval backend.
    pub fn with_retrieval(mut self, service: Arc<dyn RetrievalService>) -> Self {
        self.retrieval = RetrievalGateway::new(service, &self.config.retrieval);
        self
    }
}
