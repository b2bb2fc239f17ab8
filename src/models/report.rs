//! Master report rows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{DepartureCandidate, TripRecord, VesselId};
use crate::utils::datetime::{NO_DATA, split_datetime};

/// Column headers of the master report, in output order.
pub const REPORT_COLUMNS: [&str; 15] = [
    "MMSI",
    "Reference Port",
    "Departure Port",
    "Departure Date",
    "Departure Time",
    "Arrival Port",
    "Arrival Date",
    "Arrival Time",
    "Departure Port (Old)",
    "Departure Date (Old)",
    "Departure Time (Old)",
    "Arrival Port (Old)",
    "Arrival Date (Old)",
    "Arrival Time (Old)",
    "Extracted At",
];

/// Format of the extraction timestamp in exported reports.
pub const EXTRACTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One enriched departure, flattened for the master report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub vessel_id: VesselId,
    /// Port the vessel was seen at before it left
    pub reference_port: String,
    /// Departure port as published on the vessel page
    pub departure_port: String,
    pub departure_date: String,
    pub departure_time: String,
    pub arrival_port: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub old_departure_port: String,
    pub old_departure_date: String,
    pub old_departure_time: String,
    pub old_arrival_port: String,
    pub old_arrival_date: String,
    pub old_arrival_time: String,
    pub extracted_at: NaiveDateTime,
}

/// Dedup key of a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NaturalKey<'a> {
    pub vessel_id: &'a VesselId,
    pub departure_date: &'a str,
    pub departure_time: &'a str,
}

impl ReportRow {
    /// Flatten a trip record for a departure candidate.
    pub fn from_trip(
        candidate: &DepartureCandidate,
        trip: &TripRecord,
        extracted_at: NaiveDateTime,
    ) -> Self {
        let (departure_date, departure_time) = split_datetime(trip.current.departure.as_deref());
        let (arrival_date, arrival_time) = split_datetime(trip.current.arrival.as_deref());
        let (old_departure_date, old_departure_time) =
            split_datetime(trip.previous.departure.as_deref());
        let (old_arrival_date, old_arrival_time) =
            split_datetime(trip.previous.arrival.as_deref());

        Self {
            vessel_id: candidate.id.clone(),
            reference_port: candidate.reference_port.clone(),
            departure_port: or_no_data(&trip.current.origin_port),
            departure_date,
            departure_time,
            arrival_port: or_no_data(&trip.current.destination_port),
            arrival_date,
            arrival_time,
            old_departure_port: or_no_data(&trip.previous.origin_port),
            old_departure_date,
            old_departure_time,
            old_arrival_port: or_no_data(&trip.previous.destination_port),
            old_arrival_date,
            old_arrival_time,
            extracted_at,
        }
    }

    pub fn natural_key(&self) -> NaturalKey<'_> {
        NaturalKey {
            vessel_id: &self.vessel_id,
            departure_date: &self.departure_date,
            departure_time: &self.departure_time,
        }
    }

    /// Cell values in `REPORT_COLUMNS` order.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.vessel_id.to_string(),
            self.reference_port.clone(),
            self.departure_port.clone(),
            self.departure_date.clone(),
            self.departure_time.clone(),
            self.arrival_port.clone(),
            self.arrival_date.clone(),
            self.arrival_time.clone(),
            self.old_departure_port.clone(),
            self.old_departure_date.clone(),
            self.old_departure_time.clone(),
            self.old_arrival_port.clone(),
            self.old_arrival_date.clone(),
            self.old_arrival_time.clone(),
            self.extracted_at.format(EXTRACTED_AT_FORMAT).to_string(),
        ]
    }
}

fn or_no_data(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NO_DATA.to_string())
}
