//! In-memory local repository implementation.
//!
//! This module provides a local implementation of both repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory, providing fast, deterministic, and isolated execution.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{
    EnergyPricesQuery, EnergyPricesResponse, Municipality, OperatorMunicipality, Period,
    SunshineIndicator, SunshineQuery, SunshineResponse,
};
use crate::db::repository::{
    coverage_query, ErrorContext, ObservationRepository, RepositoryError, RepositoryResult,
    SparqlClient, SparqlRow, SparqlTerm,
};
use crate::models::CoverageRecord;

const MUNICIPALITY_IRI: &str = "https://ld.admin.ch/municipality/";
const OPERATOR_IRI: &str = "https://energy.ld.admin.ch/elcom/electricityprice/operator/";
const NETWORK_LEVEL_IRI: &str = "https://energy.ld.admin.ch/elcom/electricityprice/network_level/";

/// In-memory local repository.
///
/// Cloning shares the underlying data, so a test can keep a handle for
/// inspection after handing a clone to the code under test.
///
/// # Example
/// ```
/// use elcom_rust::db::repositories::LocalRepository;
/// use elcom_rust::api::{MunicipalityId, NetworkLevel, OperatorId, Period};
/// use elcom_rust::models::CoverageRecord;
///
/// let repo = LocalRepository::new();
/// repo.add_coverage_record(
///     Period::new(2024),
///     CoverageRecord {
///         municipality: MunicipalityId::new("261"),
///         network_level: NetworkLevel::NE7,
///         operator: OperatorId::new("A"),
///         ratio: 0.5,
///     },
/// );
/// assert_eq!(repo.select_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    select_calls: Arc<AtomicUsize>,
    observation_calls: Arc<AtomicUsize>,
}

struct LocalData {
    select_responses: HashMap<String, Vec<SparqlRow>>,
    energy_prices: EnergyPricesResponse,
    municipalities: Vec<Municipality>,
    sunshine: HashMap<(Period, SunshineIndicator), SunshineResponse>,
    operator_municipalities: HashMap<(Period, Option<String>), Vec<OperatorMunicipality>>,

    // Failure injection
    is_healthy: bool,
    failures_remaining: usize,
    latency: Option<Duration>,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            select_responses: HashMap::new(),
            energy_prices: EnergyPricesResponse::default(),
            municipalities: Vec::new(),
            sunshine: HashMap::new(),
            operator_municipalities: HashMap::new(),
            is_healthy: true,
            failures_remaining: 0,
            latency: None,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `rows` from now on.
    pub fn set_select_response(&self, query: impl Into<String>, rows: Vec<SparqlRow>) {
        self.data.write().select_responses.insert(query.into(), rows);
    }

    /// Append a coverage record to the canned response of its year's query.
    pub fn add_coverage_record(&self, period: Period, record: CoverageRecord) {
        let mut row = SparqlRow::new();
        row.insert(
            "municipality".to_string(),
            SparqlTerm::uri(format!("{}{}", MUNICIPALITY_IRI, record.municipality)),
        );
        row.insert(
            "operator".to_string(),
            SparqlTerm::uri(format!("{}{}", OPERATOR_IRI, record.operator)),
        );
        row.insert(
            "network_level".to_string(),
            SparqlTerm::uri(format!("{}{}", NETWORK_LEVEL_IRI, record.network_level)),
        );
        row.insert(
            "coverage_ratio".to_string(),
            SparqlTerm::literal(record.ratio.to_string()),
        );

        self.data
            .write()
            .select_responses
            .entry(coverage_query(period))
            .or_default()
            .push(row);
    }

    pub fn set_energy_prices(&self, response: EnergyPricesResponse) {
        self.data.write().energy_prices = response;
    }

    pub fn set_municipalities(&self, municipalities: Vec<Municipality>) {
        self.data.write().municipalities = municipalities;
    }

    pub fn set_sunshine(&self, period: Period, indicator: SunshineIndicator, response: SunshineResponse) {
        self.data.write().sunshine.insert((period, indicator), response);
    }

    pub fn set_operator_municipalities(
        &self,
        period: Period,
        category: Option<&str>,
        rows: Vec<OperatorMunicipality>,
    ) {
        self.data
            .write()
            .operator_municipalities
            .insert((period, category.map(str::to_string)), rows);
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Make the next `count` queries fail with a connection error.
    pub fn fail_next(&self, count: usize) {
        self.data.write().failures_remaining = count;
    }

    /// Delay every query, so concurrent callers overlap.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.data.write().latency = latency;
    }

    /// Number of `select` calls issued so far.
    pub fn select_count(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Number of typed observation queries issued so far.
    pub fn observation_query_count(&self) -> usize {
        self.observation_calls.load(Ordering::SeqCst)
    }

    /// Clear all data from the repository, keeping failure settings.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            latency: data.latency,
            ..Default::default()
        };
    }

    /// Helper to simulate latency and injected failures.
    async fn simulate(&self, operation: &str) -> RepositoryResult<()> {
        let latency = self.data.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut data = self.data.write();
        if !data.is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Backend is not healthy",
                ErrorContext::new(operation),
            ));
        }
        if data.failures_remaining > 0 {
            data.failures_remaining -= 1;
            return Err(RepositoryError::connection_with_context(
                "Injected failure",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SparqlClient for LocalRepository {
    async fn select(&self, query: &str) -> RepositoryResult<Vec<SparqlRow>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate("select").await?;

        Ok(self
            .data
            .read()
            .select_responses
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ObservationRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn fetch_energy_prices(
        &self,
        query: &EnergyPricesQuery,
    ) -> RepositoryResult<EnergyPricesResponse> {
        self.observation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate("fetch_energy_prices").await?;

        let data = self.data.read();
        let matches = |period: Period, category: &str| {
            period == query.period && category == query.category
        };
        Ok(EnergyPricesResponse {
            observations: data
                .energy_prices
                .observations
                .iter()
                .filter(|o| matches(o.period, &o.category))
                .cloned()
                .collect(),
            canton_medians: data
                .energy_prices
                .canton_medians
                .iter()
                .filter(|o| matches(o.period, &o.category))
                .cloned()
                .collect(),
            swiss_medians: data
                .energy_prices
                .swiss_medians
                .iter()
                .filter(|o| matches(o.period, &o.category))
                .cloned()
                .collect(),
        })
    }

    async fn fetch_municipalities(&self, _period: Period) -> RepositoryResult<Vec<Municipality>> {
        self.observation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate("fetch_municipalities").await?;
        Ok(self.data.read().municipalities.clone())
    }

    async fn fetch_sunshine(&self, query: &SunshineQuery) -> RepositoryResult<SunshineResponse> {
        self.observation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate("fetch_sunshine").await?;

        let data = self.data.read();
        let Some(response) = data.sunshine.get(&(query.period, query.indicator)) else {
            return Ok(SunshineResponse::default());
        };
        let observations = response
            .observations
            .iter()
            .filter(|o| match (&query.category, &o.category) {
                (Some(wanted), Some(actual)) => wanted == actual,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();

        Ok(SunshineResponse {
            observations,
            median: response.median,
        })
    }

    async fn fetch_operator_municipalities(
        &self,
        period: Period,
        category: Option<&str>,
    ) -> RepositoryResult<Vec<OperatorMunicipality>> {
        self.observation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate("fetch_operator_municipalities").await?;

        Ok(self
            .data
            .read()
            .operator_municipalities
            .get(&(period, category.map(str::to_string)))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MunicipalityId, NetworkLevel, OperatorId};

    #[tokio::test]
    async fn test_unknown_query_returns_no_rows() {
        let repo = LocalRepository::new();
        let rows = repo.select("SELECT * WHERE { ?s ?p ?o }").await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(repo.select_count(), 1);
    }

    #[tokio::test]
    async fn test_add_coverage_record_builds_iri_rows() {
        let repo = LocalRepository::new();
        repo.add_coverage_record(
            Period::new(2024),
            CoverageRecord {
                municipality: MunicipalityId::new("261"),
                network_level: NetworkLevel::NE7,
                operator: OperatorId::new("A"),
                ratio: 0.5,
            },
        );

        let rows = repo.select(&coverage_query(Period::new(2024))).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["municipality"].value.ends_with("/261"));
        assert_eq!(rows[0]["coverage_ratio"].value, "0.5");
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);

        let err = repo.select("q").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!repo.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_next_recovers() {
        let repo = LocalRepository::new();
        repo.fail_next(1);

        assert!(repo.select("q").await.is_err());
        assert!(repo.select("q").await.is_ok());
        assert_eq!(repo.select_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_keeps_health() {
        let repo = LocalRepository::new();
        repo.set_select_response("q", vec![SparqlRow::new()]);
        repo.set_healthy(false);
        repo.clear();

        assert!(!repo.health_check().await.unwrap());
        repo.set_healthy(true);
        assert!(repo.select("q").await.unwrap().is_empty());
    }
}
