//! Raw observation and reference records as delivered by the query layer.
//!
//! These are immutable once fetched and live for one request/render cycle.

use serde::{Deserialize, Serialize};

use crate::api::{
    CantonId, MunicipalityId, NetworkLevel, OperatorId, Period, PriceComponent, SunshineIndicator,
};

/// One tariff value reported by an operator for a municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPriceObservation {
    pub period: Period,
    pub municipality: MunicipalityId,
    pub municipality_label: Option<String>,
    pub canton: CantonId,
    pub canton_label: Option<String>,
    pub operator: OperatorId,
    pub operator_label: Option<String>,
    /// Consumption profile, e.g. "H4".
    pub category: String,
    #[serde(default)]
    pub network_level: NetworkLevel,
    pub value: Option<f64>,
    /// Share of the municipality supplied by this operator, when known.
    #[serde(default)]
    pub coverage_ratio: Option<f64>,
}

/// Canton or Swiss median for a period and category.
///
/// `canton` is `None` for the national median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianObservation {
    pub period: Period,
    pub canton: Option<CantonId>,
    pub canton_label: Option<String>,
    pub category: String,
    pub value: Option<f64>,
}

/// Municipality reference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub id: MunicipalityId,
    pub name: String,
}

/// Result of the energy-prices observation query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyPricesResponse {
    pub observations: Vec<EnergyPriceObservation>,
    pub canton_medians: Vec<MedianObservation>,
    pub swiss_medians: Vec<MedianObservation>,
}

/// One sunshine indicator value reported by a grid operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunshineObservation {
    pub operator_id: OperatorId,
    pub name: String,
    pub operator_uid: Option<String>,
    pub period: Period,
    pub category: Option<String>,
    pub value: Option<f64>,
    pub settlement_density: Option<String>,
    pub energy_density: Option<String>,
}

/// Result of the sunshine observation query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SunshineResponse {
    pub observations: Vec<SunshineObservation>,
    pub median: Option<f64>,
}

/// Municipality served by an operator, used for geographic shapes only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMunicipality {
    pub operator: OperatorId,
    pub municipality: MunicipalityId,
    pub canton: Option<CantonId>,
}

/// Filter for the energy-prices query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnergyPricesQuery {
    pub period: Period,
    pub category: String,
    #[serde(default)]
    pub component: PriceComponent,
}

impl EnergyPricesQuery {
    pub fn new(period: Period, category: impl Into<String>) -> Self {
        Self {
            period,
            category: category.into(),
            component: PriceComponent::default(),
        }
    }
}

/// Filter for the sunshine queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SunshineQuery {
    pub period: Period,
    pub indicator: SunshineIndicator,
    pub category: Option<String>,
}

/// One row of the coverage projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub municipality: MunicipalityId,
    pub network_level: NetworkLevel,
    pub operator: OperatorId,
    pub ratio: f64,
}
