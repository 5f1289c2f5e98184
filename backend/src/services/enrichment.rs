//! Enriched data builders.
//!
//! Raw observation arrays are joined with reference data into grouped,
//! O(1)-lookup structures. The builders are pure functions over
//! [`LoadState`] inputs: they return `Loading` or `Error` unless every input
//! is ready, and never hand out a partial structure.
//!
//! [`EnrichedDataLoader`] fetches the inputs concurrently, applies the
//! coverage filter and memoizes the result per query.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{
    CantonId, EnergyPriceObservation, EnergyPricesQuery, EnergyPricesResponse, LoadState,
    MedianObservation, Municipality, MunicipalityId, OperatorId, OperatorMunicipality,
    SunshineObservation, SunshineQuery, SunshineResponse,
};
use crate::db::repository::ObservationRepository;
use crate::services::coverage::{CoverageCache, CoverageYear};
use crate::services::map_encodings::extent;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityData {
    pub id: MunicipalityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CantonData {
    pub id: CantonId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorData {
    pub id: OperatorId,
    pub name: String,
    pub uid: Option<String>,
}

/// Energy-price observation with its resolved reference records.
///
/// Reference records are shared with the index, not copied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEnergyObservation {
    pub observation: EnergyPriceObservation,
    /// `None` when the municipality list does not know the id.
    pub municipality_data: Option<Arc<MunicipalityData>>,
    pub canton_data: Arc<CantonData>,
}

impl EnrichedEnergyObservation {
    pub fn value(&self) -> Option<f64> {
        self.observation.value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSunshineObservation {
    pub observation: SunshineObservation,
    pub operator_data: Arc<OperatorData>,
}

impl EnrichedSunshineObservation {
    pub fn value(&self) -> Option<f64> {
        self.observation.value
    }
}

pub type Group<T> = Vec<Arc<T>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedEnergyPricesData {
    pub municipalities: HashMap<MunicipalityId, Arc<MunicipalityData>>,
    pub cantons: HashMap<CantonId, Arc<CantonData>>,
    pub observations: Group<EnrichedEnergyObservation>,
    pub observations_by_municipality: HashMap<MunicipalityId, Group<EnrichedEnergyObservation>>,
    pub observations_by_canton: HashMap<CantonId, Group<EnrichedEnergyObservation>>,
    pub canton_medians: HashMap<CantonId, f64>,
    pub swiss_median: Option<f64>,
    /// Min and max of the per-municipality weighted means.
    pub extent: Option<(f64, f64)>,
}

impl EnrichedEnergyPricesData {
    pub fn canton_median(&self, canton: &str) -> Option<f64> {
        self.canton_medians.get(canton).copied()
    }

    pub fn municipality_observations(&self, municipality: &str) -> &[Arc<EnrichedEnergyObservation>] {
        self.observations_by_municipality
            .get(municipality)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn canton_observations(&self, canton: &str) -> &[Arc<EnrichedEnergyObservation>] {
        self.observations_by_canton
            .get(canton)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedSunshineData {
    pub operators: HashMap<OperatorId, Arc<OperatorData>>,
    pub observations: Group<EnrichedSunshineObservation>,
    pub observations_by_operator: HashMap<OperatorId, Group<EnrichedSunshineObservation>>,
    pub median: Option<f64>,
    pub extent: Option<(f64, f64)>,
}

impl EnrichedSunshineData {
    pub fn operator_observations(&self, operator: &str) -> &[Arc<EnrichedSunshineObservation>] {
        self.observations_by_operator
            .get(operator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Municipalities served by each operator, for geographic shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperatorMunicipalityIndex {
    pub by_operator: HashMap<OperatorId, Vec<MunicipalityId>>,
}

impl OperatorMunicipalityIndex {
    pub fn from_rows(rows: &[OperatorMunicipality]) -> Self {
        let mut by_operator: HashMap<OperatorId, Vec<MunicipalityId>> = HashMap::new();
        for row in rows {
            let municipalities = by_operator.entry(row.operator.clone()).or_default();
            if !municipalities.contains(&row.municipality) {
                municipalities.push(row.municipality.clone());
            }
        }
        Self { by_operator }
    }

    pub fn municipalities(&self, operator: &str) -> &[MunicipalityId] {
        self.by_operator
            .get(operator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Weighted mean of valued observations; weight is the coverage ratio, 1 when absent.
pub fn weighted_mean<'a>(observations: impl IntoIterator<Item = &'a EnergyPriceObservation>) -> Option<f64> {
    let (sum, weights) = observations
        .into_iter()
        .filter_map(|o| {
            let value = o.value.filter(|v| v.is_finite())?;
            Some((value, o.coverage_ratio.unwrap_or(1.0)))
        })
        .fold((0.0, 0.0), |(sum, weights), (value, weight)| {
            (sum + value * weight, weights + weight)
        });

    if weights > 0.0 {
        Some(sum / weights)
    } else {
        None
    }
}

fn median_value(medians: &[MedianObservation]) -> Option<f64> {
    medians.iter().find_map(|m| m.value)
}

/// Join energy-price observations with the municipality list.
pub fn build_energy_prices_data(
    response: &EnergyPricesResponse,
    municipalities: &[Municipality],
) -> EnrichedEnergyPricesData {
    let municipality_index: HashMap<MunicipalityId, Arc<MunicipalityData>> = municipalities
        .iter()
        .map(|m| {
            (
                m.id.clone(),
                Arc::new(MunicipalityData {
                    id: m.id.clone(),
                    name: m.name.clone(),
                }),
            )
        })
        .collect();

    // Cantons are only known through the observations.
    let mut canton_index: HashMap<CantonId, Arc<CantonData>> = HashMap::new();
    for o in &response.observations {
        canton_index.entry(o.canton.clone()).or_insert_with(|| {
            Arc::new(CantonData {
                id: o.canton.clone(),
                name: o.canton_label.clone().unwrap_or_else(|| o.canton.to_string()),
            })
        });
    }

    let mut observations = Vec::with_capacity(response.observations.len());
    let mut by_municipality: HashMap<MunicipalityId, Group<EnrichedEnergyObservation>> = HashMap::new();
    let mut by_canton: HashMap<CantonId, Group<EnrichedEnergyObservation>> = HashMap::new();

    for o in &response.observations {
        let canton_data = match canton_index.get(&o.canton) {
            Some(data) => Arc::clone(data),
            None => continue,
        };
        let enriched = Arc::new(EnrichedEnergyObservation {
            municipality_data: municipality_index.get(&o.municipality).cloned(),
            canton_data,
            observation: o.clone(),
        });

        by_municipality
            .entry(o.municipality.clone())
            .or_default()
            .push(Arc::clone(&enriched));
        by_canton
            .entry(o.canton.clone())
            .or_default()
            .push(Arc::clone(&enriched));
        observations.push(enriched);
    }

    let means: Vec<f64> = by_municipality
        .values()
        .filter_map(|group| weighted_mean(group.iter().map(|e| &e.observation)))
        .collect();

    let canton_medians = response
        .canton_medians
        .iter()
        .filter_map(|m| Some((m.canton.clone()?, m.value?)))
        .collect();

    debug!(
        observations = observations.len(),
        municipalities = by_municipality.len(),
        cantons = by_canton.len(),
        "built energy prices index"
    );

    EnrichedEnergyPricesData {
        municipalities: municipality_index,
        cantons: canton_index,
        observations,
        observations_by_municipality: by_municipality,
        observations_by_canton: by_canton,
        canton_medians,
        swiss_median: median_value(&response.swiss_medians),
        extent: extent(&means),
    }
}

/// Group sunshine observations by operator.
///
/// The operator index is deduplicated by id; the last row wins.
pub fn build_sunshine_data(response: &SunshineResponse) -> EnrichedSunshineData {
    let mut operators: HashMap<OperatorId, Arc<OperatorData>> = HashMap::new();
    for o in &response.observations {
        operators.insert(
            o.operator_id.clone(),
            Arc::new(OperatorData {
                id: o.operator_id.clone(),
                name: o.name.clone(),
                uid: o.operator_uid.clone(),
            }),
        );
    }

    let mut observations = Vec::with_capacity(response.observations.len());
    let mut by_operator: HashMap<OperatorId, Group<EnrichedSunshineObservation>> = HashMap::new();
    for o in &response.observations {
        let Some(operator_data) = operators.get(&o.operator_id).cloned() else {
            continue;
        };
        let enriched = Arc::new(EnrichedSunshineObservation {
            observation: o.clone(),
            operator_data,
        });
        by_operator
            .entry(o.operator_id.clone())
            .or_default()
            .push(Arc::clone(&enriched));
        observations.push(enriched);
    }

    let values: Vec<f64> = response.observations.iter().filter_map(|o| o.value).collect();

    debug!(
        observations = observations.len(),
        operators = operators.len(),
        "built sunshine index"
    );

    EnrichedSunshineData {
        operators,
        observations,
        observations_by_operator: by_operator,
        median: response.median.filter(|m| m.is_finite()),
        extent: extent(&values),
    }
}

pub fn enrich_energy_prices(
    observations: LoadState<EnergyPricesResponse>,
    municipalities: LoadState<Vec<Municipality>>,
) -> LoadState<Arc<EnrichedEnergyPricesData>> {
    observations
        .zip(municipalities)
        .map(|(response, municipalities)| {
            Arc::new(build_energy_prices_data(&response, &municipalities))
        })
}

pub fn enrich_sunshine(
    observations: LoadState<SunshineResponse>,
) -> LoadState<Arc<EnrichedSunshineData>> {
    observations.map(|response| Arc::new(build_sunshine_data(&response)))
}

pub fn enrich_operator_municipalities(
    rows: LoadState<Vec<OperatorMunicipality>>,
) -> LoadState<Arc<OperatorMunicipalityIndex>> {
    rows.map(|rows| Arc::new(OperatorMunicipalityIndex::from_rows(&rows)))
}

/// Fill in missing coverage ratios from the cache and drop poorly covered rows.
///
/// The cache must have been prepared for the observations' periods.
pub fn apply_coverage(
    observations: Vec<EnergyPriceObservation>,
    cache: &CoverageCache,
) -> Vec<EnergyPriceObservation> {
    let annotated = observations.into_iter().map(|mut o| {
        if o.coverage_ratio.is_none() {
            o.coverage_ratio = Some(cache.get_coverage_at(&o, o.network_level));
        }
        o
    });
    CoverageCache::filter_by_coverage_ratio(annotated, |o| o.coverage_ratio)
}

/// Single-slot memo: holds the value built for the most recent key.
pub struct EnrichmentMemo<K, V> {
    slot: Mutex<Option<(K, Arc<V>)>>,
}

impl<K, V> Default for EnrichmentMemo<K, V> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<K: PartialEq + Clone, V> EnrichmentMemo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match &*self.slot.lock() {
            Some((cached, value)) if cached == key => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn store(&self, key: K, value: Arc<V>) {
        *self.slot.lock() = Some((key, value));
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

/// Memo key of the energy-price index: the query plus the coverage snapshot
/// it was filtered with.
#[derive(Clone)]
struct EnergyPricesKey {
    query: EnergyPricesQuery,
    coverage: Option<Arc<CoverageYear>>,
}

impl PartialEq for EnergyPricesKey {
    fn eq(&self, other: &Self) -> bool {
        let same_coverage = match (&self.coverage, &other.coverage) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.query == other.query && same_coverage
    }
}

/// Fetches, filters and indexes observation data.
pub struct EnrichedDataLoader {
    repository: Arc<dyn ObservationRepository>,
    coverage: Arc<CoverageCache>,
    energy_prices: EnrichmentMemo<EnergyPricesKey, EnrichedEnergyPricesData>,
    sunshine: EnrichmentMemo<SunshineQuery, EnrichedSunshineData>,
}

impl EnrichedDataLoader {
    pub fn new(repository: Arc<dyn ObservationRepository>, coverage: Arc<CoverageCache>) -> Self {
        Self {
            repository,
            coverage,
            energy_prices: EnrichmentMemo::new(),
            sunshine: EnrichmentMemo::new(),
        }
    }

    /// Energy-price index for `query`, coverage-filtered.
    ///
    /// Coverage for the period is prepared first; the memoized index is reused
    /// only while the coverage data it was filtered with is still current.
    /// Observations and municipalities are fetched concurrently.
    pub async fn energy_prices(
        &self,
        query: &EnergyPricesQuery,
    ) -> LoadState<Arc<EnrichedEnergyPricesData>> {
        if let Err(err) = self.coverage.prepare(&[query.period]).await {
            return LoadState::Error(err);
        }
        let key = EnergyPricesKey {
            query: query.clone(),
            coverage: self.coverage.year(query.period),
        };

        if let Some(data) = self.energy_prices.get(&key) {
            debug!(period = %query.period, category = %query.category, "energy prices memo hit");
            return LoadState::Ready(data);
        }

        info!(period = %query.period, category = %query.category, "loading energy prices");
        let (observations, municipalities) = tokio::join!(
            self.repository.fetch_energy_prices(query),
            self.repository.fetch_municipalities(query.period),
        );

        let inputs = LoadState::from_result(observations).zip(LoadState::from_result(municipalities));
        let (mut response, municipalities) = match inputs {
            LoadState::Ready(inputs) => inputs,
            LoadState::Loading => return LoadState::Loading,
            LoadState::Error(err) => return LoadState::Error(err),
        };

        response.observations = apply_coverage(response.observations, &self.coverage);

        let state = enrich_energy_prices(LoadState::Ready(response), LoadState::Ready(municipalities));
        if let Some(data) = state.ready() {
            self.energy_prices.store(key, Arc::clone(data));
        }
        state
    }

    pub async fn sunshine(&self, query: &SunshineQuery) -> LoadState<Arc<EnrichedSunshineData>> {
        if let Some(data) = self.sunshine.get(query) {
            debug!(period = %query.period, indicator = ?query.indicator, "sunshine memo hit");
            return LoadState::Ready(data);
        }

        info!(period = %query.period, indicator = ?query.indicator, "loading sunshine observations");
        let state = enrich_sunshine(LoadState::from_result(
            self.repository.fetch_sunshine(query).await,
        ));
        if let Some(data) = state.ready() {
            self.sunshine.store(query.clone(), Arc::clone(data));
        }
        state
    }

    /// Operator to municipality lookup, fetched separately from the sunshine index.
    pub async fn operator_municipalities(
        &self,
        query: &SunshineQuery,
    ) -> LoadState<Arc<OperatorMunicipalityIndex>> {
        enrich_operator_municipalities(LoadState::from_result(
            self.repository
                .fetch_operator_municipalities(query.period, query.category.as_deref())
                .await,
        ))
    }

    pub fn clear(&self) {
        self.energy_prices.clear();
        self.sunshine.clear();
    }
}

#[cfg(test)]
#[path = "enrichment_tests.rs"]
mod enrichment_tests;
