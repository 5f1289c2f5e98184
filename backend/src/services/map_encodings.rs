//! Threshold and color encodings for the map.
//!
//! An encoding partitions the value domain with ordered thresholds and assigns
//! one palette color per class. Thresholds are placed around the median with
//! fixed coefficients, or span the observed extent when there is no median.

use serde::Serialize;
use tracing::debug;

use crate::api::{Period, PriceComponent, SunshineIndicator};

/// Median multipliers for tariffs and most indicators.
pub const DEFAULT_COEFFICIENTS: [f64; 4] = [0.85, 0.95, 1.05, 1.15];

/// Network costs are more dispersed than tariffs.
pub const NETWORK_COSTS_COEFFICIENTS: [f64; 4] = [0.7, 0.9, 1.1, 1.3];

/// Cut point of yes/no indicators encoded as 0/1.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Diverging palette, low (good) to high (bad).
pub const DEFAULT_PALETTE: [&str; 5] = ["#1a9641", "#a6d96a", "#ffffbf", "#fdae61", "#d7191c"];

/// One class boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threshold {
    pub value: f64,
    /// Signed deviation from the median ("+15%"), a literal for binary
    /// encodings, or empty for extent-based thresholds.
    pub label: String,
}

impl Threshold {
    fn unlabelled(value: f64) -> Self {
        Self {
            value,
            label: String::new(),
        }
    }
}

/// A display entry: the class color and its lower bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub from: Option<Threshold>,
    pub color: String,
}

/// Ordered thresholds and the palette they index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorEncoding {
    thresholds: Vec<Threshold>,
    palette: Vec<String>,
}

impl ColorEncoding {
    /// # Panics
    /// If the palette does not have exactly one more color than there are
    /// thresholds.
    pub fn new(thresholds: Vec<Threshold>, palette: Vec<String>) -> Self {
        assert_eq!(
            palette.len(),
            thresholds.len() + 1,
            "palette must have one more color than there are thresholds"
        );
        Self {
            thresholds,
            palette,
        }
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn threshold_values(&self) -> Vec<f64> {
        self.thresholds.iter().map(|t| t.value).collect()
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Same thresholds, palette in reverse order.
    pub fn reversed(self) -> Self {
        let mut palette = self.palette;
        palette.reverse();
        Self::new(self.thresholds, palette)
    }

    pub fn make_scale(&self) -> ColorScale {
        ColorScale {
            thresholds: self.threshold_values(),
            palette: self.palette.clone(),
        }
    }

    pub fn legend(&self) -> Vec<LegendItem> {
        self.palette
            .iter()
            .enumerate()
            .map(|(i, color)| LegendItem {
                from: i.checked_sub(1).map(|j| self.thresholds[j].clone()),
                color: color.clone(),
            })
            .collect()
    }
}

/// Step scale: a value maps to the color of the last threshold not above it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    thresholds: Vec<f64>,
    palette: Vec<String>,
}

impl ColorScale {
    pub fn color(&self, value: f64) -> &str {
        let bucket = self.thresholds.partition_point(|t| *t <= value);
        &self.palette[bucket]
    }

    pub fn color_for(&self, value: Option<f64>) -> Option<&str> {
        value.map(|v| self.color(v))
    }
}

/// Encoding variant of an indicator family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EncodingKind {
    Default,
    NetworkCosts,
    Binary,
    DaysInAdvance,
    /// Franc rule; identical to [`EncodingKind::Default`].
    Compliance,
}

impl EncodingKind {
    pub fn for_indicator(indicator: SunshineIndicator) -> Self {
        match indicator {
            SunshineIndicator::NetworkCosts => EncodingKind::NetworkCosts,
            SunshineIndicator::OutageInfo => EncodingKind::Binary,
            SunshineIndicator::DaysInAdvanceOutageNotification => EncodingKind::DaysInAdvance,
            SunshineIndicator::Compliance => EncodingKind::Compliance,
            SunshineIndicator::NetTariffs
            | SunshineIndicator::EnergyTariffs
            | SunshineIndicator::Saidi
            | SunshineIndicator::Saifi => EncodingKind::Default,
        }
    }

    pub fn for_component(_component: PriceComponent) -> Self {
        EncodingKind::Default
    }

    /// Build the encoding for one view.
    ///
    /// `palette` replaces [`DEFAULT_PALETTE`] and is resampled to the number
    /// of colors the encoding needs. An empty palette falls back to the default.
    pub fn encode(
        &self,
        median: Option<f64>,
        values: &[f64],
        year: Period,
        palette: Option<&[String]>,
    ) -> ColorEncoding {
        let base = base_palette(palette);
        debug!(kind = ?self, year = %year, median = ?median, values = values.len(), "building color encoding");

        match self {
            EncodingKind::Default | EncodingKind::Compliance => {
                median_or_extent(median, values, &DEFAULT_COEFFICIENTS, &base)
            }
            EncodingKind::NetworkCosts => {
                median_or_extent(median, values, &NETWORK_COSTS_COEFFICIENTS, &base)
            }
            EncodingKind::DaysInAdvance => {
                median_or_extent(median, values, &DEFAULT_COEFFICIENTS, &base).reversed()
            }
            EncodingKind::Binary => binary(&base),
        }
    }
}

fn base_palette(palette: Option<&[String]>) -> Vec<String> {
    match palette {
        Some(colors) if !colors.is_empty() => colors.to_vec(),
        _ => DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
    }
}

/// Pick `count` colors spread evenly over `palette`, keeping both ends.
pub fn resample_palette(palette: &[String], count: usize) -> Vec<String> {
    if palette.is_empty() || count == 0 {
        return Vec::new();
    }
    if palette.len() == count {
        return palette.to_vec();
    }
    if count == 1 {
        return vec![palette[0].clone()];
    }

    let last = palette.len() - 1;
    (0..count)
        .map(|i| {
            let index = (i as f64 * last as f64 / (count - 1) as f64).round() as usize;
            palette[index.min(last)].clone()
        })
        .collect()
}

/// Rounded percentage deviation of a coefficient, signed when positive.
pub fn deviation_label(coefficient: f64) -> String {
    let percent = ((coefficient - 1.0) * 100.0).round() as i64;
    if percent > 0 {
        format!("+{}%", percent)
    } else {
        format!("{}%", percent)
    }
}

fn median_or_extent(
    median: Option<f64>,
    values: &[f64],
    coefficients: &[f64],
    palette: &[String],
) -> ColorEncoding {
    match median.filter(|m| m.is_finite()) {
        Some(median) => {
            let mut thresholds: Vec<Threshold> = coefficients
                .iter()
                .map(|c| Threshold {
                    value: median * c,
                    label: deviation_label(*c),
                })
                .collect();
            // A negative median flips the order.
            thresholds.sort_by(|a, b| a.value.total_cmp(&b.value));
            let colors = resample_palette(palette, thresholds.len() + 1);
            ColorEncoding::new(thresholds, colors)
        }
        None => {
            let (min, max) = extent(values).unwrap_or((0.0, 0.0));
            let thresholds = vec![Threshold::unlabelled(min), Threshold::unlabelled(max)];
            let colors = resample_palette(palette, thresholds.len() + 1);
            ColorEncoding::new(thresholds, colors)
        }
    }
}

fn binary(palette: &[String]) -> ColorEncoding {
    let first = palette[0].clone();
    let last = palette[palette.len() - 1].clone();
    ColorEncoding::new(
        vec![
            Threshold {
                value: BINARY_THRESHOLD,
                label: "No".to_string(),
            },
            Threshold {
                value: BINARY_THRESHOLD,
                label: "Yes".to_string(),
            },
        ],
        vec![first.clone(), first, last],
    )
}

/// Min and max of the finite values.
pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}

#[cfg(test)]
#[path = "map_encodings_tests.rs"]
mod map_encodings_tests;
