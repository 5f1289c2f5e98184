//! Public API surface for the Rust backend.
//!
//! Identifier newtypes and the small enums shared by every component.
//! All types derive Serialize/Deserialize so they can cross the boundary to
//! the rendering layer unchanged.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

pub use crate::services::load_state::LoadState;
pub use crate::models::observation::{
    EnergyPriceObservation, EnergyPricesQuery, EnergyPricesResponse, MedianObservation,
    Municipality, OperatorMunicipality, SunshineObservation, SunshineQuery, SunshineResponse,
};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

string_id!(
    /// Swiss municipality identifier (BFS number as string, e.g. "261").
    MunicipalityId
);
string_id!(
    /// Grid operator identifier.
    OperatorId
);
string_id!(
    /// Canton identifier (BFS canton number as string).
    CantonId
);

/// Reporting year.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Period(pub u16);

impl Period {
    pub fn new(year: u16) -> Self {
        Period(year)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Period {
    fn from(year: u16) -> Self {
        Period(year)
    }
}

/// Grid network level a coverage ratio applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkLevel {
    NE5,
    NE6,
    /// Household level, used when the caller does not name one.
    #[default]
    NE7,
}

impl NetworkLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkLevel::NE5 => "NE5",
            NetworkLevel::NE6 => "NE6",
            NetworkLevel::NE7 => "NE7",
        }
    }
}

impl fmt::Display for NetworkLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NE5" => Ok(NetworkLevel::NE5),
            "NE6" => Ok(NetworkLevel::NE6),
            "NE7" => Ok(NetworkLevel::NE7),
            _ => Err(format!("Unknown network level: {}", s)),
        }
    }
}

/// Kind of geographic or organisational entity an id refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Municipality,
    Canton,
    Operator,
}

impl EntityType {
    /// Caption shown above the entity's values.
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Municipality => "Municipality",
            EntityType::Canton => "Canton",
            EntityType::Operator => "Network operator",
        }
    }
}

/// Which data family a view is showing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    EnergyPrices,
    Sunshine,
}

/// Tariff component of an energy-price observation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceComponent {
    #[default]
    Total,
    Gridusage,
    Energy,
    Charge,
    Aidfee,
}

/// Sunshine indicator reported per grid operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SunshineIndicator {
    NetworkCosts,
    NetTariffs,
    EnergyTariffs,
    Saidi,
    Saifi,
    OutageInfo,
    DaysInAdvanceOutageNotification,
    Compliance,
}

impl FromStr for SunshineIndicator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "networkCosts" => Ok(Self::NetworkCosts),
            "netTariffs" => Ok(Self::NetTariffs),
            "energyTariffs" => Ok(Self::EnergyTariffs),
            "saidi" => Ok(Self::Saidi),
            "saifi" => Ok(Self::Saifi),
            "outageInfo" => Ok(Self::OutageInfo),
            "daysInAdvanceOutageNotification" => Ok(Self::DaysInAdvanceOutageNotification),
            "compliance" => Ok(Self::Compliance),
            _ => Err(format!("Unknown sunshine indicator: {}", s)),
        }
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
