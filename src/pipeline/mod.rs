//! Pipeline entry points for tracker operations.
//!
//! - `run_collector`: List vessels in port and store the `current` snapshot
//! - `run_cycle`: Detect departures, enrich, requeue, merge and rotate

pub mod collect;
pub mod cycle;
pub mod detect;
pub mod enrich;
pub mod merge;
pub mod requeue;

pub use collect::run_collector;
pub use cycle::{CycleSummary, run_cycle};
pub use detect::{DepartureDetector, Detection, detect_departures};
pub use enrich::{Enricher, Enrichment, Verdict, classify};
pub use merge::merge_report;
pub use requeue::{Requeued, requeue, restore_unvisited};
