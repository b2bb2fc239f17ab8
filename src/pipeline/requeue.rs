//! Retry queue: failed vessels are merged back into `current` so the next
//! cycle sees them leave again.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::models::{DepartureCandidate, Snapshot, SnapshotEntry, VesselId};

/// Updated `current` generation after requeueing.
#[derive(Debug, Clone, Default)]
pub struct Requeued {
    pub snapshot: Snapshot,
    /// Requeued vessels whose counter reached the ceiling
    pub permanently_skipped: BTreeSet<VesselId>,
}

/// Upsert every retryable candidate into `current`.
///
/// The new counter is one more than the highest of the counter already in
/// `current` and the one the candidate carried over from `previous`, so a
/// first failure starts at one. The entry is replaced whole, stamped with
/// `now` and the candidate's reference port.
pub fn requeue(
    retryable: &[DepartureCandidate],
    mut current: Snapshot,
    retry_ceiling: u32,
    now: NaiveDateTime,
) -> Requeued {
    let mut permanently_skipped = BTreeSet::new();

    for candidate in retryable {
        let retry_count = current
            .get(&candidate.id)
            .map_or(candidate.retry_count, |entry| {
                entry.retry_count.max(candidate.retry_count)
            })
            .saturating_add(1);

        current.upsert(
            SnapshotEntry::new(candidate.id.clone(), &candidate.reference_port, now)
                .with_retry_count(retry_count),
        );

        if retry_count >= retry_ceiling {
            log::warn!(
                "Vessel {} reached {} failed attempts, it will no longer be looked up",
                candidate.id,
                retry_count
            );
            permanently_skipped.insert(candidate.id.clone());
        } else {
            log::debug!("Vessel {} queued for retry ({})", candidate.id, retry_count);
        }
    }

    Requeued {
        snapshot: current,
        permanently_skipped,
    }
}

/// Put candidates that were never looked up back into `current`.
///
/// No attempt was made, so the counter is kept as it is: the highest of the
/// one already in `current` and the one carried over from `previous`.
pub fn restore_unvisited(
    unvisited: &[DepartureCandidate],
    mut current: Snapshot,
    now: NaiveDateTime,
) -> Snapshot {
    for candidate in unvisited {
        let retry_count = current
            .get(&candidate.id)
            .map_or(candidate.retry_count, |entry| {
                entry.retry_count.max(candidate.retry_count)
            });

        current.upsert(
            SnapshotEntry::new(candidate.id.clone(), &candidate.reference_port, now)
                .with_retry_count(retry_count),
        );
        log::debug!("Vessel {} kept for the next cycle ({})", candidate.id, retry_count);
    }

    current
}
