#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use elcom_rust::api::{
    CantonId, EnergyPriceObservation, MunicipalityId, NetworkLevel, OperatorId, Period,
    SunshineObservation,
};
use elcom_rust::services::CoverageRecord;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Environment variables read by the crate.
pub const ELCOM_ENV_VARS: &[&str] = &[
    "REPOSITORY_TYPE",
    "SPARQL_ENDPOINT",
    "SPARQL_TIMEOUT_SECS",
    "COVERAGE_TTL_SECS",
];

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::apply(changes);
    f()
}

/// Runs `f` with every variable in [`ELCOM_ENV_VARS`] unset, then `changes` applied.
pub fn with_clean_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let mut all: Vec<(&str, Option<&str>)> = ELCOM_ENV_VARS.iter().map(|k| (*k, None)).collect();
    all.extend_from_slice(changes);
    with_scoped_env(&all, f)
}

struct ScopedEnv {
    previous: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let previous = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect();

        for (k, v) in changes {
            set_or_remove(k, *v);
        }

        Self { previous }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.previous.drain(..) {
            set_or_remove(&k, v.as_deref());
        }
    }
}

fn set_or_remove(key: &str, value: Option<&str>) {
    match value {
        Some(val) => std::env::set_var(key, val),
        None => std::env::remove_var(key),
    }
}

pub const YEAR: Period = Period(2024);

pub fn energy_observation(
    municipality: &str,
    operator: &str,
    value: Option<f64>,
) -> EnergyPriceObservation {
    EnergyPriceObservation {
        period: YEAR,
        municipality: MunicipalityId::new(municipality),
        municipality_label: None,
        canton: CantonId::new("1"),
        canton_label: Some("Zürich".to_string()),
        operator: OperatorId::new(operator),
        operator_label: Some(format!("Operator {}", operator)),
        category: "H4".to_string(),
        network_level: NetworkLevel::NE7,
        value,
        coverage_ratio: None,
    }
}

pub fn sunshine_observation(operator: &str, name: &str, value: Option<f64>) -> SunshineObservation {
    SunshineObservation {
        operator_id: OperatorId::new(operator),
        name: name.to_string(),
        operator_uid: None,
        period: YEAR,
        category: None,
        value,
        settlement_density: None,
        energy_density: None,
    }
}

pub fn coverage_record(
    municipality: &str,
    network_level: NetworkLevel,
    operator: &str,
    ratio: f64,
) -> CoverageRecord {
    CoverageRecord {
        municipality: MunicipalityId::new(municipality),
        network_level,
        operator: OperatorId::new(operator),
        ratio,
    }
}
