//! Vessel presence snapshots.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Reference port used when a vessel has no recorded port.
pub const UNKNOWN_PORT: &str = "UNKNOWN";

/// Opaque vessel identifier (an MMSI on the tracking site).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VesselId(String);

impl VesselId {
    /// Create an identifier, trimming surrounding whitespace.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VesselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VesselId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for VesselId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// One row of a presence snapshot.
///
/// Serialized with the snapshot column names. Files written before retry
/// tracking existed have no `retryCount` column; it reads as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub id: VesselId,

    pub extraction_date: NaiveDate,

    pub extraction_time: NaiveTime,

    /// Port the vessel was last seen at
    #[serde(default = "unknown_port")]
    pub reference_port: String,

    /// Consecutive cycles in which enrichment of this vessel failed
    #[serde(default)]
    pub retry_count: u32,
}

fn unknown_port() -> String {
    UNKNOWN_PORT.to_string()
}

impl SnapshotEntry {
    /// Create a fresh entry with a zero retry counter.
    pub fn new(id: VesselId, reference_port: impl Into<String>, seen_at: NaiveDateTime) -> Self {
        let reference_port = reference_port.into();
        let reference_port = if reference_port.trim().is_empty() {
            unknown_port()
        } else {
            reference_port.trim().to_string()
        };

        Self {
            id,
            extraction_date: seen_at.date(),
            extraction_time: seen_at.time().with_nanosecond(0).unwrap_or(seen_at.time()),
            reference_port,
            retry_count: 0,
        }
    }

    /// Set the retry counter.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Combined extraction timestamp.
    pub fn extracted_at(&self) -> NaiveDateTime {
        self.extraction_date.and_time(self.extraction_time)
    }
}

/// A point-in-time set of vessels observed at the monitored ports.
///
/// Entries are keyed by id, so an id appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<VesselId, SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for its id, returning the replaced entry.
    pub fn upsert(&mut self, entry: SnapshotEntry) -> Option<SnapshotEntry> {
        self.entries.insert(entry.id.clone(), entry)
    }

    pub fn get(&self, id: &VesselId) -> Option<&SnapshotEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &VesselId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.values()
    }

    /// Number of entries whose retry counter reached `ceiling`.
    pub fn exhausted_count(&self, ceiling: u32) -> usize {
        self.iter().filter(|e| e.retry_count >= ceiling).count()
    }

    /// Consume the snapshot into its entries, in id order.
    pub fn into_entries(self) -> Vec<SnapshotEntry> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<SnapshotEntry> for Snapshot {
    /// Later entries win when ids repeat.
    fn from_iter<I: IntoIterator<Item = SnapshotEntry>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for entry in iter {
            if let Some(old) = snapshot.upsert(entry) {
                log::debug!("Duplicate snapshot row for vessel {}, keeping the later one", old.id);
            }
        }
        snapshot
    }
}

/// A vessel inferred to have left its port since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepartureCandidate {
    pub id: VesselId,
    /// Port recorded for the vessel in the previous snapshot
    pub reference_port: String,
    /// Failed attempts recorded for the vessel in the previous snapshot
    pub retry_count: u32,
}

impl DepartureCandidate {
    pub fn new(id: VesselId, reference_port: impl Into<String>) -> Self {
        Self {
            id,
            reference_port: reference_port.into(),
            retry_count: 0,
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_nano_opt(h, m, 7, 123_456_789)
            .unwrap()
    }

    #[test]
    fn test_vessel_id_is_trimmed() {
        assert_eq!(VesselId::new(" 247123400 ").as_str(), "247123400");
    }

    #[test]
    fn test_entry_truncates_sub_second_time() {
        let entry = SnapshotEntry::new("1".into(), "Genova", at(10, 30));
        assert_eq!(entry.extraction_time, NaiveTime::from_hms_opt(10, 30, 7).unwrap());
        assert_eq!(entry.retry_count, 0);
    }

    #[test]
    fn test_blank_port_becomes_unknown() {
        let entry = SnapshotEntry::new("1".into(), "  ", at(10, 30));
        assert_eq!(entry.reference_port, UNKNOWN_PORT);
    }

    #[test]
    fn test_legacy_row_without_retry_count_reads_as_zero() {
        let json = r#"{
            "id": "247123400",
            "extractionDate": "2026-10-19",
            "extractionTime": "08:15:00",
            "referencePort": "Livorno"
        }"#;
        let entry: SnapshotEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.retry_count, 0);
        assert_eq!(entry.reference_port, "Livorno");
    }

    #[test]
    fn test_serialized_column_names() {
        let entry = SnapshotEntry::new("9".into(), "Napoli", at(9, 0)).with_retry_count(2);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], "9");
        assert_eq!(value["extractionDate"], "2026-10-19");
        assert_eq!(value["extractionTime"], "09:00:07");
        assert_eq!(value["referencePort"], "Napoli");
        assert_eq!(value["retryCount"], 2);
    }

    #[test]
    fn test_from_iter_keeps_last_duplicate() {
        let snapshot: Snapshot = vec![
            SnapshotEntry::new("1".into(), "A", at(8, 0)),
            SnapshotEntry::new("1".into(), "B", at(9, 0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&"1".into()).unwrap().reference_port, "B");
    }

    #[test]
    fn test_exhausted_count() {
        let snapshot: Snapshot = vec![
            SnapshotEntry::new("1".into(), "A", at(8, 0)).with_retry_count(6),
            SnapshotEntry::new("2".into(), "A", at(8, 0)).with_retry_count(5),
            SnapshotEntry::new("3".into(), "A", at(8, 0)).with_retry_count(7),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.exhausted_count(6), 2);
    }
}
