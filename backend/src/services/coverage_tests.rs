use super::*;
use crate::api::CantonId;
use crate::db::repositories::LocalRepository;
use crate::db::repository::SparqlTerm;
use proptest::prelude::*;

const YEAR: Period = Period(2024);

fn record(municipality: &str, level: NetworkLevel, operator: &str, ratio: f64) -> CoverageRecord {
    CoverageRecord {
        municipality: MunicipalityId::new(municipality),
        network_level: level,
        operator: OperatorId::new(operator),
        ratio,
    }
}

fn observation(municipality: &str, operator: &str, value: f64) -> EnergyPriceObservation {
    EnergyPriceObservation {
        period: YEAR,
        municipality: MunicipalityId::new(municipality),
        municipality_label: None,
        canton: CantonId::new("1"),
        canton_label: Some("Zürich".to_string()),
        operator: OperatorId::new(operator),
        operator_label: None,
        category: "H4".to_string(),
        network_level: NetworkLevel::NE7,
        value: Some(value),
        coverage_ratio: None,
    }
}

fn cache_for(repo: &LocalRepository) -> CoverageCache {
    CoverageCache::new(Arc::new(repo.clone()))
}

#[test]
fn test_coverage_policy_three_way() {
    let year = CoverageYear::from_records(
        YEAR,
        vec![
            record("261", NetworkLevel::NE7, "A", 0.5),
            record("261", NetworkLevel::NE5, "C", 0.8),
        ],
    );

    // Recorded triple.
    assert_eq!(year.coverage("261", "A", NetworkLevel::NE7), 0.5);
    // Level has operators, but not this one.
    assert_eq!(year.coverage("261", "B", NetworkLevel::NE7), 0.0);
    // Level has no operators at all.
    assert_eq!(year.coverage("261", "B", NetworkLevel::NE6), 1.0);
    assert_eq!(year.coverage("999", "A", NetworkLevel::NE7), 1.0);
}

#[test]
fn test_counts_ignore_duplicate_triples() {
    let year = CoverageYear::from_records(
        YEAR,
        vec![
            record("261", NetworkLevel::NE7, "A", 0.5),
            record("261", NetworkLevel::NE7, "A", 0.6),
            record("261", NetworkLevel::NE5, "A", 1.0),
        ],
    );

    assert_eq!(year.len(), 2);
    assert_eq!(year.operator_count("261"), 2);
    assert_eq!(year.network_level_operator_count("261", NetworkLevel::NE7), 1);
    assert_eq!(year.ratio("261", NetworkLevel::NE7, "A"), Some(0.6));
}

#[test]
fn test_muni_network_count_key_format() {
    assert_eq!(muni_network_count_key("261", NetworkLevel::NE7), "261-NE7");
}

#[test]
fn test_parse_rows_skips_malformed() {
    let mut good = SparqlRow::new();
    good.insert(
        "municipality".to_string(),
        SparqlTerm::uri("https://ld.admin.ch/municipality/261"),
    );
    good.insert(
        "operator".to_string(),
        SparqlTerm::uri("https://energy.ld.admin.ch/elcom/electricityprice/operator/486"),
    );
    good.insert(
        "network_level".to_string(),
        SparqlTerm::uri("https://energy.ld.admin.ch/elcom/electricityprice/network_level/NE7"),
    );
    good.insert("coverage_ratio".to_string(), SparqlTerm::literal("0.75"));

    let mut bad_ratio = good.clone();
    bad_ratio.insert("coverage_ratio".to_string(), SparqlTerm::literal("n/a"));

    let mut missing_operator = good.clone();
    missing_operator.remove("operator");

    let records = parse_coverage_rows(&[good, bad_ratio, missing_operator]);
    assert_eq!(records, vec![record("261", NetworkLevel::NE7, "486", 0.75)]);
}

#[test]
fn test_get_coverage_without_prepare_is_zero() {
    let repo = LocalRepository::new();
    let cache = cache_for(&repo);

    assert_eq!(cache.get_coverage(&observation("261", "A", 10.0)), 0.0);
    assert_eq!(repo.select_count(), 0);
}

#[tokio::test]
async fn test_prepare_populates_year() {
    let repo = LocalRepository::new();
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.5));
    let cache = cache_for(&repo);

    cache.prepare(&[YEAR]).await.unwrap();

    assert_eq!(cache.get_coverage(&observation("261", "A", 10.0)), 0.5);
    assert_eq!(cache.get_coverage(&observation("261", "B", 20.0)), 0.0);
    assert_eq!(
        cache.get_coverage_at(&observation("261", "B", 20.0), NetworkLevel::NE5),
        1.0
    );
    assert_eq!(cache.cached_years(), vec![YEAR]);
}

#[tokio::test]
async fn test_concurrent_prepare_shares_one_fetch() {
    let repo = LocalRepository::new();
    repo.set_latency(Some(Duration::from_millis(50)));
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.5));
    let cache = cache_for(&repo);

    let (first, second) = tokio::join!(cache.prepare(&[YEAR]), cache.prepare(&[YEAR, YEAR]));
    first.unwrap();
    second.unwrap();

    assert_eq!(repo.select_count(), 1);
    let stats = cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_sequential_prepare_within_ttl_hits_cache() {
    let repo = LocalRepository::new();
    let cache = cache_for(&repo);

    cache.prepare(&[YEAR]).await.unwrap();
    cache.prepare(&[YEAR]).await.unwrap();

    assert_eq!(repo.select_count(), 1);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let repo = LocalRepository::new();
    let cache = CoverageCache::with_ttl(Arc::new(repo.clone()), Duration::ZERO);

    cache.prepare(&[YEAR]).await.unwrap();
    cache.prepare(&[YEAR]).await.unwrap();

    assert_eq!(repo.select_count(), 2);
}

#[tokio::test]
async fn test_failed_year_is_retried() {
    let repo = LocalRepository::new();
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.5));
    repo.fail_next(1);
    let cache = cache_for(&repo);

    let err = cache.prepare(&[YEAR]).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ConnectionError { .. }));
    assert!(cache.year(YEAR).is_none());
    assert!(cache.cached_years().is_empty());

    cache.prepare(&[YEAR]).await.unwrap();
    assert_eq!(repo.select_count(), 2);
    assert_eq!(cache.get_coverage(&observation("261", "A", 10.0)), 0.5);
}

#[tokio::test]
async fn test_refresh_in_flight_serves_previous_data() {
    let repo = LocalRepository::new();
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.5));
    let cache = CoverageCache::with_ttl(Arc::new(repo.clone()), Duration::ZERO);
    cache.prepare(&[YEAR]).await.unwrap();

    repo.set_latency(Some(Duration::from_millis(100)));
    let subject = observation("261", "A", 10.0);
    let (refreshed, during) = tokio::join!(cache.prepare(&[YEAR]), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get_coverage(&subject)
    });

    refreshed.unwrap();
    assert_eq!(during, 0.5);
    assert_eq!(repo.select_count(), 2);
    assert_eq!(cache.get_coverage(&subject), 0.5);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_data() {
    let repo = LocalRepository::new();
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.5));
    let cache = CoverageCache::with_ttl(Arc::new(repo.clone()), Duration::ZERO);
    cache.prepare(&[YEAR]).await.unwrap();

    repo.fail_next(1);
    assert!(cache.prepare(&[YEAR]).await.is_err());
    assert_eq!(cache.get_coverage(&observation("261", "A", 10.0)), 0.5);

    // A later refresh picks up upstream changes.
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.9));
    cache.prepare(&[YEAR]).await.unwrap();
    assert_eq!(repo.select_count(), 3);
    assert_eq!(cache.get_coverage(&observation("261", "A", 10.0)), 0.9);
}

#[tokio::test]
async fn test_failure_does_not_block_other_years() {
    let repo = LocalRepository::new();
    repo.fail_next(1);
    let cache = cache_for(&repo);

    let result = cache.prepare(&[Period::new(2023), Period::new(2024)]).await;
    assert!(result.is_err());
    assert_eq!(repo.select_count(), 2);
    assert_eq!(cache.cached_years().len(), 1);
}

#[tokio::test]
async fn test_invalidate_all_forces_refetch() {
    let repo = LocalRepository::new();
    let cache = cache_for(&repo);

    cache.prepare(&[YEAR]).await.unwrap();
    cache.invalidate_all();
    assert_eq!(cache.get_coverage(&observation("261", "A", 1.0)), 0.0);

    cache.prepare(&[YEAR]).await.unwrap();
    assert_eq!(repo.select_count(), 2);
}

#[test]
fn test_filter_threshold_is_inclusive() {
    let items = vec![Some(0.1), Some(0.25), None, Some(0.9)];
    let kept = CoverageCache::filter_by_coverage_ratio(items, |ratio| *ratio);
    assert_eq!(kept, vec![Some(0.25), Some(0.9)]);
}

#[tokio::test]
async fn test_low_coverage_operator_is_filtered_out() {
    let repo = LocalRepository::new();
    repo.add_coverage_record(YEAR, record("261", NetworkLevel::NE7, "A", 0.5));
    let cache = cache_for(&repo);
    cache.prepare(&[YEAR]).await.unwrap();

    let observations = vec![observation("261", "A", 10.0), observation("261", "B", 20.0)];
    let kept = CoverageCache::filter_by_coverage_ratio(observations, |o| {
        Some(cache.get_coverage(o))
    });

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].operator.as_str(), "A");
    assert_eq!(kept[0].value, Some(10.0));
}

proptest! {
    #[test]
    fn prop_filter_is_idempotent(ratios in prop::collection::vec(prop::option::of(0.0f64..=1.0), 0..64)) {
        let once = CoverageCache::filter_by_coverage_ratio(ratios, |r| *r);
        let twice = CoverageCache::filter_by_coverage_ratio(once.clone(), |r| *r);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_recorded_ratio_is_returned(ratio in 0.0f64..=1.0, operators in 1usize..5) {
        let records = (0..operators)
            .map(|i| record("261", NetworkLevel::NE7, &format!("op{}", i), ratio));
        let year = CoverageYear::from_records(YEAR, records);

        prop_assert_eq!(year.coverage("261", "op0", NetworkLevel::NE7), ratio);
        prop_assert_eq!(year.coverage("261", "other", NetworkLevel::NE7), 0.0);
        prop_assert_eq!(year.coverage("261", "other", NetworkLevel::NE6), 1.0);
    }
}
