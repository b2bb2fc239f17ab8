//! Storage abstractions for tracker state and reports.
//!
//! Two snapshot generations are kept, plus a write-once history of every
//! retired `previous` generation and the cumulative master report.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml
//! ├── tracker.lock              # Held while a cycle runs
//! ├── state/
//! │   ├── current.json          # Vessels seen by the latest collection
//! │   ├── previous.json         # Vessels seen by the collection before
//! │   └── history/
//! │       └── previous_20261019_120000_000123.json
//! └── reports/
//!     └── master.json           # Deduplicated departures
//! ```

pub mod export;
pub mod local;
pub mod lock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ReportRow, Snapshot, SnapshotEntry};

// Re-export for convenience
pub use local::LocalStorage;
pub use lock::RunLock;

/// On-disk form of a snapshot generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// ISO 8601 timestamp of the write
    pub updated_at: DateTime<Utc>,
    /// Entry count
    pub count: usize,
    /// One row per vessel
    pub entries: Vec<SnapshotEntry>,
}

impl SnapshotDocument {
    pub fn new(snapshot: &Snapshot) -> Self {
        let entries: Vec<SnapshotEntry> = snapshot.iter().cloned().collect();
        Self {
            updated_at: Utc::now(),
            count: entries.len(),
            entries,
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.entries.into_iter().collect()
    }
}

/// What happened during a generation rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// `current` became `previous`; the retired generation, if any, was
    /// archived at the given location
    Rotated { archived: Option<String> },
    /// No `current` generation existed; state was left untouched
    NoCurrent,
}

/// Trait for tracker storage backends.
#[async_trait]
pub trait TrackerStorage: Send + Sync {
    /// Load the `previous` generation. A missing generation is empty.
    async fn load_previous(&self) -> Result<Snapshot>;

    /// Load the `current` generation, `None` when it does not exist.
    async fn load_current(&self) -> Result<Option<Snapshot>>;

    /// Atomically replace the `current` generation.
    async fn write_current(&self, snapshot: &Snapshot) -> Result<()>;

    /// Archive `previous` and promote `current` in its place.
    async fn rotate(&self) -> Result<RotationOutcome>;

    /// Load the master report. A missing report is empty.
    async fn load_report(&self) -> Result<Vec<ReportRow>>;

    /// Atomically replace the master report.
    async fn write_report(&self, rows: &[ReportRow]) -> Result<()>;
}
