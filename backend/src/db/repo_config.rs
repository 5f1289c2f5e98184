//! Repository configuration file support.
//!
//! This module provides utilities for reading repository configuration from
//! TOML configuration files, with environment overrides.
//!
//! ```toml
//! [repository]
//! type = "sparql"
//!
//! [sparql]
//! endpoint = "https://lindas.admin.ch/query"
//! timeout_secs = 30
//!
//! [coverage]
//! ttl_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::factory::RepositoryType;
use super::repository::RepositoryError;
use crate::services::coverage::DEFAULT_COVERAGE_TTL;

/// Public LINDAS endpoint.
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://lindas.admin.ch/query";

/// Repository configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
    #[serde(default)]
    pub sparql: SparqlSettings,
    #[serde(default)]
    pub coverage: CoverageSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// SPARQL endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparqlSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SparqlSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: None,
        }
    }
}

/// Coverage cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_SPARQL_ENDPOINT.to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_COVERAGE_TTL.as_secs()
}

/// Runtime settings for the HTTP SPARQL client.
#[derive(Debug, Clone, PartialEq)]
pub struct SparqlConfig {
    pub endpoint: String,
    /// Request timeout; `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            timeout: None,
        }
    }
}

impl SparqlConfig {
    /// Read `SPARQL_ENDPOINT` and `SPARQL_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("SPARQL_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.timeout = std::env::var("SPARQL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);
        config
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repository: RepositorySettings {
                repo_type: "local".to_string(),
            },
            sparql: SparqlSettings::default(),
            coverage: CoverageSettings::default(),
        }
    }
}

impl RepositoryConfig {
    /// Load repository configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(RepositoryConfig)` if successful
    /// * `Err(RepositoryError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RepositoryError> {
        toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load repository configuration from the default location.
    ///
    /// Searches for `elcom.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        let search_paths = [
            PathBuf::from("elcom.toml"),
            PathBuf::from("backend/elcom.toml"),
            PathBuf::from("../elcom.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(RepositoryError::configuration(
            "No elcom.toml found in standard locations",
        ))
    }

    /// Apply `REPOSITORY_TYPE`, `SPARQL_ENDPOINT` and `COVERAGE_TTL_SECS` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(repo_type) = std::env::var("REPOSITORY_TYPE") {
            self.repository.repo_type = repo_type;
        }
        if let Ok(endpoint) = std::env::var("SPARQL_ENDPOINT") {
            self.sparql.endpoint = endpoint;
        }
        if let Some(ttl) = std::env::var("COVERAGE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.coverage.ttl_secs = ttl;
        }
        self
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }

    pub fn sparql_config(&self) -> SparqlConfig {
        SparqlConfig {
            endpoint: self.sparql.endpoint.clone(),
            timeout: self.sparql.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn coverage_ttl(&self) -> Duration {
        Duration::from_secs(self.coverage.ttl_secs)
    }
}
