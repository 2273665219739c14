//! Optional retrieval (RAG) collaborator.
//!
//! The gateway never fails: an absent, unavailable, or erroring service
//! yields an empty passage list. Availability probes are cached for a short
//! interval so editing keystrokes do not hammer the service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::models::RagQuery;
use crate::ScrivoError;

/// A supporting passage returned by the retrieval service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// Retrieval capability consumed by the completion flow.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Cheap liveness probe.
    async fn is_available(&self) -> bool;

    async fn retrieve(&self, query: &RagQuery) -> Result<Vec<RetrievedPassage>, ScrivoError>;
}

/// Stand-in used when no retrieval backend is configured.
pub struct NoopRetrievalService;

#[async_trait]
impl RetrievalService for NoopRetrievalService {
    async fn is_available(&self) -> bool {
        false
    }

    async fn retrieve(&self, _query: &RagQuery) -> Result<Vec<RetrievedPassage>, ScrivoError> {
        Ok(Vec::new())
    }
}

/// Result of a gateway lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalOutcome {
    pub available: bool,
    pub passages: Vec<RetrievedPassage>,
}

impl RetrievalOutcome {
    fn unavailable() -> Self {
        Self {
            available: false,
            passages: Vec::new(),
        }
    }
}

pub struct RetrievalGateway {
    service: Arc<dyn RetrievalService>,
    /// Single-slot cache holding the last availability probe.
    availability: Cache<(), bool>,
    availability_ttl: Duration,
}

impl RetrievalGateway {
    pub fn new(service: Arc<dyn RetrievalService>, config: &RetrievalConfig) -> Self {
        let availability_ttl = Duration::from_secs(config.availability_ttl_secs.max(1));
        let availability = Cache::builder()
            .max_capacity(1)
            .time_to_live(availability_ttl)
            .build();
        Self {
            service,
            availability,
            availability_ttl,
        }
    }

    /// Gateway with no backend.
    pub fn disabled(config: &RetrievalConfig) -> Self {
        Self::new(Arc::new(NoopRetrievalService), config)
    }

    pub fn availability_ttl(&self) -> Duration {
        self.availability_ttl
    }

    /// Cached availability of the backing service.
    pub async fn is_available(&self) -> bool {
        let service = self.service.clone();
        self.availability
            .get_with((), async move {
                let available = service.is_available().await;
                debug!("Retrieval availability probed: {}", available);
                available
            })
            .await
    }

    /// Forget the cached probe so the next call re-checks.
    pub async fn revalidate(&self) {
        self.availability.invalidate(&()).await;
    }

    /// Fetch passages for `query`, degrading to an empty list.
    pub async fn retrieve(&self, query: &RagQuery) -> RetrievalOutcome {
        if !self.is_available().await {
            return RetrievalOutcome::unavailable();
        }
        if query.query.trim().is_empty() {
            return RetrievalOutcome {
                available: true,
                passages: Vec::new(),
            };
        }
        match self.service.retrieve(query).await {
            Ok(passages) => {
                debug!("Retrieved {} passages", passages.len());
                RetrievalOutcome {
                    available: true,
                    passages,
                }
            }
            Err(e) => {
                warn!("Retrieval failed, continuing without passages: {}", e);
                // Force a fresh probe next time.
                self.availability.invalidate(&()).await;
                RetrievalOutcome::unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CollectionMethod;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingService {
        probes: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RetrievalService for CountingService {
        async fn is_available(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            true
        }

        async fn retrieve(&self, query: &RagQuery) -> Result<Vec<RetrievedPassage>, ScrivoError> {
            if self.fail {
                return Err(ScrivoError::Provider("index offline".to_string()));
            }
            Ok(vec![RetrievedPassage {
                source: "notes".to_string(),
                text: format!("about {}", query.query),
                score: 0.9,
            }])
        }
    }

    fn query(text: &str) -> RagQuery {
        RagQuery {
            query: text.to_string(),
            context: String::new(),
            keywords: Vec::new(),
            entities: Vec::new(),
            summary: String::new(),
            relevance: 0.5,
            method: CollectionMethod::Fallback,
        }
    }

    fn gateway(fail: bool) -> (Arc<CountingService>, RetrievalGateway) {
        let service = Arc::new(CountingService {
            probes: AtomicUsize::new(0),
            fail,
        });
        let gateway = RetrievalGateway::new(service.clone(), &RetrievalConfig::default());
        (service, gateway)
    }

    #[tokio::test]
    async fn test_availability_probe_is_cached() {
        let (service, gateway) = gateway(false);
        assert!(gateway.is_available().await);
        assert!(gateway.is_available().await);
        assert_eq!(service.probes.load(Ordering::SeqCst), 1);

        gateway.revalidate().await;
        assert!(gateway.is_available().await);
        assert_eq!(service.probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retrieve_returns_passages() {
        let (_, gateway) = gateway(false);
        let outcome = gateway.retrieve(&query("陈云寒")).await;
        assert!(outcome.available);
        assert_eq!(outcome.passages[0].text, "about 陈云寒");
    }

    #[tokio::test]
    async fn test_failing_service_degrades_to_empty() {
        let (service, gateway) = gateway(true);
        let outcome = gateway.retrieve(&query("陈云寒")).await;
        assert_eq!(outcome, RetrievalOutcome::unavailable());
        // failure dropped the cached probe
        gateway.is_available().await;
        assert_eq!(service.probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_gateway_is_unavailable() {
        let gateway = RetrievalGateway::disabled(&RetrievalConfig::default());
        assert!(!gateway.is_available().await);
        assert!(gateway.retrieve(&query("anything")).await.passages.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_skips_backend() {
        let (_, gateway) = gateway(true);
        let outcome = gateway.retrieve(&query("  ")).await;
        assert!(outcome.available);
        assert!(outcome.passages.is_empty());
    }
}
