//! Departure detection.
//!
//! Computes the set difference between the previous and current presence
//! snapshots to find vessels that left their port between two collections.

use crate::models::{DepartureCandidate, Snapshot, UNKNOWN_PORT};

/// Result of comparing two snapshot generations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Vessels present before and gone now, in id order
    pub departures: Vec<DepartureCandidate>,
    /// Previous entries excluded for having reached the retry ceiling
    pub skipped: usize,
}

impl Detection {
    pub fn has_departures(&self) -> bool {
        !self.departures.is_empty()
    }
}

/// Detector for departures between two snapshots.
#[derive(Debug, Clone, Copy)]
pub struct DepartureDetector {
    retry_ceiling: u32,
}

impl DepartureDetector {
    pub fn new(retry_ceiling: u32) -> Self {
        Self { retry_ceiling }
    }

    /// Vessels in `previous` that are under the retry ceiling and missing
    /// from `current`. Arrivals are ignored.
    pub fn detect(&self, previous: &Snapshot, current: &Snapshot) -> Detection {
        let mut detection = Detection::default();

        for entry in previous.iter() {
            if entry.retry_count >= self.retry_ceiling {
                detection.skipped += 1;
                continue;
            }
            if current.contains(&entry.id) {
                continue;
            }

            let reference_port = if entry.reference_port.trim().is_empty() {
                UNKNOWN_PORT
            } else {
                entry.reference_port.as_str()
            };
            detection.departures.push(
                DepartureCandidate::new(entry.id.clone(), reference_port)
                    .with_retry_count(entry.retry_count),
            );
        }

        detection
    }
}

/// Convenience function to detect departures.
pub fn detect_departures(previous: &Snapshot, current: &Snapshot, retry_ceiling: u32) -> Detection {
    DepartureDetector::new(retry_ceiling).detect(previous, current)
}
