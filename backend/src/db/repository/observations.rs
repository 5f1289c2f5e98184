//! Typed observation and reference queries.
//!
//! This trait stands for the GraphQL layer that returns typed arrays for the
//! enrichment builders. Implementations can use different backends.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    EnergyPricesQuery, EnergyPricesResponse, Municipality, OperatorMunicipality, Period,
    SunshineQuery, SunshineResponse,
};

/// Repository trait for observation and reference data.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    /// Check if the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Fetch energy-price observations together with canton and Swiss medians.
    ///
    /// # Arguments
    /// * `query` - Period, consumption category and tariff component
    async fn fetch_energy_prices(
        &self,
        query: &EnergyPricesQuery,
    ) -> RepositoryResult<EnergyPricesResponse>;

    /// Fetch the municipality reference list for a period.
    async fn fetch_municipalities(&self, period: Period) -> RepositoryResult<Vec<Municipality>>;

    /// Fetch sunshine observations and the indicator median.
    async fn fetch_sunshine(&self, query: &SunshineQuery) -> RepositoryResult<SunshineResponse>;

    /// Fetch the municipalities served by each operator.
    ///
    /// Keyed by period and category; only needed for geographic shapes.
    async fn fetch_operator_municipalities(
        &self,
        period: Period,
        category: Option<&str>,
    ) -> RepositoryResult<Vec<OperatorMunicipality>>;
}
