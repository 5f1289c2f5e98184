//! Process-wide application state.
//!
//! Built once at startup and handed to every consumer. The coverage cache
//! lives here instead of in a module-level static, so tests can build as many
//! independent states as they need.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::db::repository::ObservationRepository;
use crate::db::{LocalRepository, RepositoryConfig, RepositoryFactory};
use crate::services::coverage::CoverageCache;
use crate::services::enrichment::EnrichedDataLoader;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Coverage ratios, shared by all requests
    pub coverage: Arc<CoverageCache>,
    /// Typed observation queries
    pub observations: Arc<dyn ObservationRepository>,
    /// Enrichment builders with per-query memo
    pub loader: Arc<EnrichedDataLoader>,
}

impl AppState {
    pub fn new(coverage: Arc<CoverageCache>, observations: Arc<dyn ObservationRepository>) -> Self {
        let loader = Arc::new(EnrichedDataLoader::new(
            Arc::clone(&observations),
            Arc::clone(&coverage),
        ));
        Self {
            coverage,
            observations,
            loader,
        }
    }

    /// Serve coverage queries and observations from one in-memory repository.
    pub fn local(repository: LocalRepository) -> Self {
        let repository = Arc::new(repository);
        let coverage = Arc::new(CoverageCache::new(repository.clone()));
        Self::new(coverage, repository)
    }

    /// Build the coverage cache from configuration.
    ///
    /// The SPARQL client is chosen by `[repository] type`; observations come
    /// from the given repository.
    pub fn from_config(
        config: &RepositoryConfig,
        observations: Arc<dyn ObservationRepository>,
    ) -> Result<Self> {
        let client = RepositoryFactory::from_repository_config(config)
            .context("Failed to create SPARQL client")?;
        let coverage = Arc::new(CoverageCache::with_ttl(client, config.coverage_ttl()));

        info!(
            repository = %config.repository.repo_type,
            ttl_secs = config.coverage.ttl_secs,
            "application state initialized"
        );
        Ok(Self::new(coverage, observations))
    }

    /// Coverage from the backend selected by the enabled features, default TTL.
    pub fn from_selected_backend(observations: Arc<dyn ObservationRepository>) -> Result<Self> {
        let client = RepositoryFactory::create_selected().context("Failed to create SPARQL client")?;
        Ok(Self::new(Arc::new(CoverageCache::new(client)), observations))
    }
}
