//! Entity selection resolver.
//!
//! Combines hover and click state into one active entity and formats its
//! observations for display. An explicit selection always wins over hover.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::api::{DataType, EntityType};
use crate::services::enrichment::{
    EnrichedEnergyObservation, EnrichedEnergyPricesData, EnrichedSunshineData,
    EnrichedSunshineObservation,
};
use crate::services::map_encodings::ColorScale;

/// Transient UI state: what is hovered and what is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySelection {
    pub hovered_id: Option<String>,
    pub selected_id: Option<String>,
    pub entity_type: EntityType,
}

impl EntitySelection {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            hovered_id: None,
            selected_id: None,
            entity_type,
        }
    }

    pub fn hovered(mut self, id: impl Into<String>) -> Self {
        self.hovered_id = Some(id.into());
        self
    }

    pub fn selected(mut self, id: impl Into<String>) -> Self {
        self.selected_id = Some(id.into());
        self
    }

    pub fn active_id(&self) -> Option<&str> {
        self.selected_id.as_deref().or(self.hovered_id.as_deref())
    }
}

/// Enriched data the resolver can look entities up in.
#[derive(Debug, Clone)]
pub enum EnrichedData {
    EnergyPrices(Arc<EnrichedEnergyPricesData>),
    Sunshine(Arc<EnrichedSunshineData>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectedObservations {
    EnergyPrices(Vec<Arc<EnrichedEnergyObservation>>),
    Sunshine(Vec<Arc<EnrichedSunshineObservation>>),
}

impl SelectedObservations {
    pub fn len(&self) -> usize {
        match self {
            SelectedObservations::EnergyPrices(o) => o.len(),
            SelectedObservations::Sunshine(o) => o.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedRow {
    pub label: String,
    pub formatted_value: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedData {
    pub title: String,
    pub caption: String,
    pub values: Vec<FormattedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSelection {
    pub entity_id: Option<String>,
    pub is_hovered: bool,
    pub is_selected: bool,
    pub formatted_data: Option<FormattedData>,
    pub observations: Option<SelectedObservations>,
}

/// Resolve the active entity and format its observations.
///
/// Returns `formatted_data: None` and `observations: None` when there is no
/// active entity, when any input is unavailable, when `enriched` does not
/// match `data_type`, or when the entity has no observations.
pub fn resolve(
    selection: &EntitySelection,
    data_type: DataType,
    enriched: Option<&EnrichedData>,
    color_scale: Option<&ColorScale>,
    format_value: Option<&dyn Fn(f64) -> String>,
) -> ResolvedSelection {
    let active = selection.active_id();
    let entity_id = active.map(str::to_string);
    let is_hovered = active.is_some() && selection.hovered_id.as_deref() == active;
    let is_selected = active.is_some() && selection.selected_id.as_deref() == active;

    let mut resolved = ResolvedSelection {
        entity_id,
        is_hovered,
        is_selected,
        formatted_data: None,
        observations: None,
    };

    let (Some(id), Some(enriched), Some(scale), Some(format_value)) =
        (active, enriched, color_scale, format_value)
    else {
        return resolved;
    };

    let (formatted, observations) = match (data_type, enriched) {
        (DataType::EnergyPrices, EnrichedData::EnergyPrices(data)) => {
            let matches = match selection.entity_type {
                EntityType::Municipality => data.municipality_observations(id),
                _ => data.canton_observations(id),
            };
            if matches.is_empty() {
                return resolved;
            }
            (
                format_energy_prices(matches, selection.entity_type, scale, format_value),
                SelectedObservations::EnergyPrices(matches.to_vec()),
            )
        }
        (DataType::Sunshine, EnrichedData::Sunshine(data)) => {
            let matches = data.operator_observations(id);
            if matches.is_empty() {
                return resolved;
            }
            (
                format_sunshine(matches, scale, format_value),
                SelectedObservations::Sunshine(matches.to_vec()),
            )
        }
        _ => {
            debug!(?data_type, "enriched data does not match the requested data type");
            return resolved;
        }
    };

    resolved.formatted_data = Some(formatted);
    resolved.observations = Some(observations);
    resolved
}

/// Rows keep valueless observations with a blank value.
pub fn format_energy_prices(
    observations: &[Arc<EnrichedEnergyObservation>],
    entity_type: EntityType,
    scale: &ColorScale,
    format_value: &dyn Fn(f64) -> String,
) -> FormattedData {
    let title = observations
        .first()
        .map(|first| match entity_type {
            EntityType::Municipality => first
                .municipality_data
                .as_ref()
                .map(|m| m.name.clone())
                .or_else(|| first.observation.municipality_label.clone())
                .unwrap_or_else(|| first.observation.municipality.to_string()),
            _ => first.canton_data.name.clone(),
        })
        .unwrap_or_default();

    let values = observations
        .iter()
        .map(|e| {
            let o = &e.observation;
            let label = match entity_type {
                EntityType::Municipality => o
                    .operator_label
                    .clone()
                    .unwrap_or_else(|| o.operator.to_string()),
                _ => e
                    .municipality_data
                    .as_ref()
                    .map(|m| m.name.clone())
                    .or_else(|| o.municipality_label.clone())
                    .unwrap_or_else(|| o.municipality.to_string()),
            };
            FormattedRow {
                label,
                formatted_value: o.value.map(format_value).unwrap_or_default(),
                color: scale.color_for(o.value).map(str::to_string),
            }
        })
        .collect();

    FormattedData {
        title,
        caption: entity_type.label().to_string(),
        values,
    }
}

/// Rows without a value are dropped.
pub fn format_sunshine(
    observations: &[Arc<EnrichedSunshineObservation>],
    scale: &ColorScale,
    format_value: &dyn Fn(f64) -> String,
) -> FormattedData {
    let title = observations
        .first()
        .map(|first| first.operator_data.name.clone())
        .unwrap_or_default();

    let values = observations
        .iter()
        .filter_map(|e| {
            let o = &e.observation;
            let value = o.value?;
            Some(FormattedRow {
                label: o.category.clone().unwrap_or_else(|| o.period.to_string()),
                formatted_value: format_value(value),
                color: Some(scale.color(value).to_string()),
            })
        })
        .collect();

    FormattedData {
        title,
        caption: EntityType::Operator.label().to_string(),
        values,
    }
}
