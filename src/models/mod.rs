// src/models/mod.rs

//! Domain models for the tracker application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod report;
mod trip;
mod vessel;

// Re-export all public types
pub use config::{AcceptancePolicy, Config, PathsConfig, PortInfo, RetryConfig, TrackerConfig};
pub use report::{EXTRACTED_AT_FORMAT, NaturalKey, REPORT_COLUMNS, ReportRow};
pub use trip::{TripLeg, TripRecord};
pub use vessel::{DepartureCandidate, Snapshot, SnapshotEntry, UNKNOWN_PORT, VesselId};
