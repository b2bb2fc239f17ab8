//! Trip data scraped for a departed vessel.

use serde::{Deserialize, Serialize};

/// One leg of a voyage as published on a vessel page.
///
/// `departure` and `arrival` keep the site's raw "date time" text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripLeg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_port: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
}

impl TripLeg {
    /// Build a leg, dropping blank values.
    pub fn new(
        origin_port: Option<String>,
        departure: Option<String>,
        destination_port: Option<String>,
        arrival: Option<String>,
    ) -> Self {
        Self {
            origin_port: populated(origin_port),
            departure: populated(departure),
            destination_port: populated(destination_port),
            arrival: populated(arrival),
        }
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        [
            &self.origin_port,
            &self.departure,
            &self.destination_port,
            &self.arrival,
        ]
        .iter()
        .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()))
    }
}

/// Enrichment result for one vessel: the trip in progress and the last
/// completed trip from the vessel's history table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(default)]
    pub current: TripLeg,

    #[serde(default)]
    pub previous: TripLeg,
}

impl TripRecord {
    /// Absence of every field means "no usable data".
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    pub fn has_current_trip(&self) -> bool {
        !self.current.is_empty()
    }
}

fn populated(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
