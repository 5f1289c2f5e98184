//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating and configuring repository instances
//! based on runtime configuration.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::{RepositoryConfig, SparqlConfig};
#[cfg(feature = "sparql-repo")]
use super::repositories::HttpSparqlClient;
use super::repositories::LocalRepository;
use super::repository::{RepositoryError, RepositoryResult, SparqlClient};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// LINDAS SPARQL endpoint over HTTP
    Sparql,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("sparql", "lindas", "local")
    ///
    /// # Returns
    /// * `Ok(RepositoryType)` if valid
    /// * `Err` if invalid
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sparql" | "lindas" => Ok(Self::Sparql),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. Defaults to Sparql if `SPARQL_ENDPOINT` is
    /// set, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("SPARQL_ENDPOINT").is_ok() {
            Self::Sparql
        } else {
            Self::Local
        }
    }
}

/// Repository factory for creating SPARQL clients.
///
/// # Example
/// ```
/// use elcom_rust::db::{RepositoryFactory, RepositoryType};
///
/// let client = RepositoryFactory::create(RepositoryType::Local, None).unwrap();
/// # let _ = client;
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a SPARQL client based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of client to create
    /// * `sparql_config` - Optional endpoint configuration (defaults apply when absent)
    ///
    /// # Returns
    /// * `Ok(Arc<dyn SparqlClient>)` - Client instance
    /// * `Err(RepositoryError)` - If creation fails or the backend feature is disabled
    pub fn create(
        repo_type: RepositoryType,
        sparql_config: Option<&SparqlConfig>,
    ) -> RepositoryResult<Arc<dyn SparqlClient>> {
        match repo_type {
            RepositoryType::Sparql => {
                #[cfg(feature = "sparql-repo")]
                {
                    let config = sparql_config.cloned().unwrap_or_default();
                    let client = Self::create_sparql(&config)?;
                    Ok(client as Arc<dyn SparqlClient>)
                }
                #[cfg(not(feature = "sparql-repo"))]
                {
                    let _ = sparql_config;
                    Err(RepositoryError::configuration(
                        "SPARQL repository feature not enabled",
                    ))
                }
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create an HTTP SPARQL client.
    #[cfg(feature = "sparql-repo")]
    pub fn create_sparql(config: &SparqlConfig) -> RepositoryResult<Arc<HttpSparqlClient>> {
        Ok(Arc::new(HttpSparqlClient::new(config)?))
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<LocalRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a client from environment configuration.
    pub fn from_env() -> RepositoryResult<Arc<dyn SparqlClient>> {
        let repo_type = RepositoryType::from_env();
        let config = SparqlConfig::from_env();
        Self::create(repo_type, Some(&config))
    }

    /// Create a client from a TOML configuration file.
    pub fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn SparqlClient>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config)
    }

    /// Create a client from a [`RepositoryConfig`] instance.
    pub fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn SparqlClient>> {
        let repo_type = config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        Self::create(repo_type, Some(&config.sparql_config()))
    }

    /// Create a client for the backend selected by the enabled features.
    ///
    /// `sparql-repo` takes precedence when both backend features are enabled;
    /// it reads its endpoint from the environment.
    #[cfg(feature = "sparql-repo")]
    pub fn create_selected() -> RepositoryResult<Arc<dyn SparqlClient>> {
        Self::create(RepositoryType::Sparql, Some(&SparqlConfig::from_env()))
    }

    #[cfg(all(feature = "local-repo", not(feature = "sparql-repo")))]
    pub fn create_selected() -> RepositoryResult<Arc<dyn SparqlClient>> {
        Ok(Self::create_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_type() {
        assert_eq!("local".parse::<RepositoryType>().unwrap(), RepositoryType::Local);
        assert_eq!("SPARQL".parse::<RepositoryType>().unwrap(), RepositoryType::Sparql);
        assert_eq!("lindas".parse::<RepositoryType>().unwrap(), RepositoryType::Sparql);
        assert!("postgres".parse::<RepositoryType>().is_err());
    }

    #[tokio::test]
    async fn test_create_local_client() {
        let client = RepositoryFactory::create(RepositoryType::Local, None).unwrap();
        let rows = client.select("SELECT * WHERE { ?s ?p ?o }").await.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_invalid_type_in_config() {
        let mut config = RepositoryConfig::default();
        config.repository.repo_type = "graphdb".to_string();

        let err = RepositoryFactory::from_repository_config(&config)
            .err()
            .unwrap();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    }

    #[cfg(all(feature = "local-repo", not(feature = "sparql-repo")))]
    #[tokio::test]
    async fn test_selected_backend_is_local() {
        let client = RepositoryFactory::create_selected().unwrap();
        assert!(client.select("SELECT * WHERE { ?s ?p ?o }").await.unwrap().is_empty());
    }

    #[cfg(feature = "sparql-repo")]
    #[test]
    fn test_selected_backend_prefers_sparql() {
        assert!(RepositoryFactory::create_selected().is_ok());
    }

    #[cfg(not(feature = "sparql-repo"))]
    #[test]
    fn test_sparql_requires_feature() {
        let result = RepositoryFactory::create(RepositoryType::Sparql, None);
        assert!(result.is_err());
    }
}
