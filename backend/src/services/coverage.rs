//! Coverage ratios per (municipality, network level, operator).
//!
//! A coverage ratio is the share of a municipality's connections served by an
//! operator at a network level. Observations whose ratio falls below
//! [`COVERAGE_RATIO_THRESHOLD`] are hidden from the map.
//!
//! Ratios are fetched once per reporting year and kept in a [`CoverageCache`].
//! The cache stores the *pending* fetch, so overlapping [`CoverageCache::prepare`]
//! calls for the same year share one upstream query.

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::api::{EnergyPriceObservation, MunicipalityId, NetworkLevel, OperatorId, Period};
use crate::db::repository::{RepositoryError, RepositoryResult, SparqlClient, SparqlRow};

pub use crate::db::repository::coverage_query;
pub use crate::models::CoverageRecord;

/// Minimum coverage ratio for an observation to be shown.
pub const COVERAGE_RATIO_THRESHOLD: f64 = 0.25;

/// Lifetime of a cached year, measured from when its fetch was started.
pub const DEFAULT_COVERAGE_TTL: Duration = Duration::from_secs(300);

fn last_segment(iri: &str) -> &str {
    iri.trim_end_matches('/')
        .rsplit(['/', '#'])
        .next()
        .unwrap_or(iri)
}

fn parse_coverage_row(row: &SparqlRow) -> Option<CoverageRecord> {
    let municipality = last_segment(&row.get("municipality")?.value);
    let operator = last_segment(&row.get("operator")?.value);
    let network_level = last_segment(&row.get("network_level")?.value)
        .parse::<NetworkLevel>()
        .ok()?;
    let ratio = row.get("coverage_ratio")?.value.trim().parse::<f64>().ok()?;

    if municipality.is_empty() || operator.is_empty() || !ratio.is_finite() {
        return None;
    }

    Some(CoverageRecord {
        municipality: MunicipalityId::new(municipality),
        network_level,
        operator: OperatorId::new(operator),
        ratio,
    })
}

/// Decode coverage rows, skipping rows with missing or malformed bindings.
pub fn parse_coverage_rows(rows: &[SparqlRow]) -> Vec<CoverageRecord> {
    let records: Vec<CoverageRecord> = rows.iter().filter_map(parse_coverage_row).collect();
    let skipped = rows.len() - records.len();
    if skipped > 0 {
        warn!(skipped, total = rows.len(), "skipped malformed coverage rows");
    }
    records
}

/// Key of the per-(municipality, network level) operator count.
pub fn muni_network_count_key(municipality: &str, network_level: NetworkLevel) -> String {
    format!("{}-{}", municipality, network_level)
}

fn coverage_key(municipality: &str, network_level: NetworkLevel, operator: &str) -> String {
    format!("{}-{}-{}", municipality, network_level, operator)
}

/// Coverage ratios of one reporting year.
#[derive(Debug, Clone)]
pub struct CoverageYear {
    pub period: Period,
    pub fetched_at: DateTime<Utc>,
    ratios: HashMap<String, f64>,
    muni_counts: HashMap<String, usize>,
    muni_network_counts: HashMap<String, usize>,
}

impl CoverageYear {
    pub fn from_records(period: Period, records: impl IntoIterator<Item = CoverageRecord>) -> Self {
        let mut year = CoverageYear {
            period,
            fetched_at: Utc::now(),
            ratios: HashMap::new(),
            muni_counts: HashMap::new(),
            muni_network_counts: HashMap::new(),
        };

        for record in records {
            let key = coverage_key(
                record.municipality.as_str(),
                record.network_level,
                record.operator.as_str(),
            );
            // A repeated triple overwrites the ratio but is counted once.
            if year.ratios.insert(key, record.ratio).is_none() {
                *year
                    .muni_counts
                    .entry(record.municipality.0.clone())
                    .or_insert(0) += 1;
                *year
                    .muni_network_counts
                    .entry(muni_network_count_key(
                        record.municipality.as_str(),
                        record.network_level,
                    ))
                    .or_insert(0) += 1;
            }
        }

        year
    }

    /// Recorded ratio for the exact triple, if any.
    pub fn ratio(&self, municipality: &str, network_level: NetworkLevel, operator: &str) -> Option<f64> {
        self.ratios
            .get(&coverage_key(municipality, network_level, operator))
            .copied()
    }

    /// Number of (network level, operator) records for a municipality.
    pub fn operator_count(&self, municipality: &str) -> usize {
        self.muni_counts.get(municipality).copied().unwrap_or(0)
    }

    /// Number of operators recorded for a municipality at one network level.
    pub fn network_level_operator_count(&self, municipality: &str, network_level: NetworkLevel) -> usize {
        self.muni_network_counts
            .get(&muni_network_count_key(municipality, network_level))
            .copied()
            .unwrap_or(0)
    }

    /// Coverage with the missing-record policy applied.
    ///
    /// A level that has operators, but not this one, means zero coverage.
    /// A level with no operators at all is not reported separately and
    /// counts as full coverage.
    pub fn coverage(&self, municipality: &str, operator: &str, network_level: NetworkLevel) -> f64 {
        if let Some(ratio) = self.ratio(municipality, network_level, operator) {
            return ratio;
        }
        if self.network_level_operator_count(municipality, network_level) > 0 {
            0.0
        } else {
            1.0
        }
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

/// Anything that can be looked up in the coverage cache.
pub trait CoverageSubject {
    fn period(&self) -> Period;
    fn municipality(&self) -> &str;
    fn operator(&self) -> &str;
}

impl CoverageSubject for EnergyPriceObservation {
    fn period(&self) -> Period {
        self.period
    }

    fn municipality(&self) -> &str {
        self.municipality.as_str()
    }

    fn operator(&self) -> &str {
        self.operator.as_str()
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
}

type CoverageFuture = Shared<BoxFuture<'static, Result<Arc<CoverageYear>, RepositoryError>>>;

struct CacheEntry {
    created_at: Instant,
    future: CoverageFuture,
}

/// Process-wide cache of coverage ratios keyed by reporting year.
///
/// Create one per process and hand it to every consumer. Entries expire after
/// the configured TTL and are refetched by the next [`prepare`](Self::prepare);
/// there is no explicit teardown.
///
/// The last successfully fetched data of a year keeps being served while its
/// refetch is in flight, and after a refetch fails.
pub struct CoverageCache {
    client: Arc<dyn SparqlClient>,
    ttl: Duration,
    entries: Mutex<HashMap<Period, CacheEntry>>,
    resolved: Mutex<HashMap<Period, Arc<CoverageYear>>>,
    counters: Arc<Counters>,
}

impl CoverageCache {
    pub fn new(client: Arc<dyn SparqlClient>) -> Self {
        Self::with_ttl(client, DEFAULT_COVERAGE_TTL)
    }

    pub fn with_ttl(client: Arc<dyn SparqlClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            entries: Mutex::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch every year that is not cached or has expired.
    ///
    /// Years already in flight are awaited, not refetched. All years are
    /// attempted; the first upstream error is returned unchanged and the
    /// failed years are evicted so a later call retries them.
    pub async fn prepare(&self, years: &[Period]) -> RepositoryResult<()> {
        let mut unique = years.to_vec();
        unique.sort();
        unique.dedup();

        let pending: Vec<(Period, CoverageFuture)> = unique
            .into_iter()
            .map(|year| (year, self.entry_for(year)))
            .collect();

        let results = join_all(pending.iter().map(|(_, future)| future.clone())).await;

        let mut first_error = None;
        for ((year, future), result) in pending.into_iter().zip(results) {
            match result {
                Ok(data) => self.record_resolved(year, data),
                Err(err) => {
                    warn!(year = %year, error = %err, "coverage fetch failed");
                    self.evict_if_current(year, &future);
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn entry_for(&self, year: Period) -> CoverageFuture {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(&year) {
            if entry.created_at.elapsed() < self.ttl {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(year = %year, "coverage cache hit");
                return entry.future.clone();
            }
            debug!(year = %year, "coverage cache entry expired");
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let future = fetch_year(Arc::clone(&self.client), year, Arc::clone(&self.counters))
            .boxed()
            .shared();
        entries.insert(
            year,
            CacheEntry {
                created_at: Instant::now(),
                future: future.clone(),
            },
        );
        future
    }

    fn record_resolved(&self, year: Period, data: Arc<CoverageYear>) {
        let mut resolved = self.resolved.lock();
        let newer_present = resolved
            .get(&year)
            .is_some_and(|current| current.fetched_at > data.fetched_at);
        if !newer_present {
            resolved.insert(year, data);
        }
    }

    fn evict_if_current(&self, year: Period, future: &CoverageFuture) {
        let mut entries = self.entries.lock();
        if entries
            .get(&year)
            .is_some_and(|entry| entry.future.ptr_eq(future))
        {
            entries.remove(&year);
        }
    }

    /// Latest resolved coverage data for a year.
    ///
    /// While a refetch is in flight (or after it failed) the previously
    /// fetched data is returned.
    pub fn year(&self, year: Period) -> Option<Arc<CoverageYear>> {
        let current = self
            .entries
            .lock()
            .get(&year)
            .and_then(|entry| match entry.future.peek() {
                Some(Ok(data)) => Some(Arc::clone(data)),
                _ => None,
            });
        current.or_else(|| self.resolved.lock().get(&year).cloned())
    }

    /// Coverage ratio at the household level (NE7).
    pub fn get_coverage<S: CoverageSubject + ?Sized>(&self, subject: &S) -> f64 {
        self.get_coverage_at(subject, NetworkLevel::default())
    }

    /// Coverage ratio of `subject` at `network_level`.
    ///
    /// Returns 0 when the year has never been fetched successfully;
    /// otherwise applies [`CoverageYear::coverage`]. Never fails.
    pub fn get_coverage_at<S: CoverageSubject + ?Sized>(
        &self,
        subject: &S,
        network_level: NetworkLevel,
    ) -> f64 {
        match self.year(subject.period()) {
            Some(year) => year.coverage(subject.municipality(), subject.operator(), network_level),
            None => 0.0,
        }
    }

    /// Keep the items whose ratio is at least [`COVERAGE_RATIO_THRESHOLD`].
    ///
    /// Items without a ratio are dropped.
    pub fn filter_by_coverage_ratio<T, F>(items: impl IntoIterator<Item = T>, accessor: F) -> Vec<T>
    where
        F: Fn(&T) -> Option<f64>,
    {
        items
            .into_iter()
            .filter(|item| accessor(item).is_some_and(|ratio| ratio >= COVERAGE_RATIO_THRESHOLD))
            .collect()
    }

    /// Years with an entry (resolved or in flight).
    pub fn cached_years(&self) -> Vec<Period> {
        let mut years: Vec<Period> = self.entries.lock().keys().copied().collect();
        years.sort();
        years
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
        self.resolved.lock().clear();
    }

    pub fn stats(&self) -> CoverageCacheStats {
        CoverageCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
        }
    }
}

async fn fetch_year(
    client: Arc<dyn SparqlClient>,
    year: Period,
    counters: Arc<Counters>,
) -> Result<Arc<CoverageYear>, RepositoryError> {
    counters.fetches.fetch_add(1, Ordering::Relaxed);
    info!(year = %year, "fetching coverage ratios");

    let rows = client.select(&coverage_query(year)).await?;
    let records = parse_coverage_rows(&rows);
    let data = CoverageYear::from_records(year, records);

    debug!(year = %year, records = data.len(), "coverage ratios cached");
    Ok(Arc::new(data))
}

#[cfg(test)]
#[path = "coverage_tests.rs"]
mod coverage_tests;
