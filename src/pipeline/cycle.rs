// src/pipeline/cycle.rs

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use chrono::{Local, SubsecRound};

use crate::error::Result;
use crate::models::{Config, VesselId};
use crate::services::TripLookup;
use crate::storage::{RotationOutcome, TrackerStorage};
use crate::utils::log;

use super::detect::DepartureDetector;
use super::enrich::Enricher;
use super::merge::merge_report;
use super::requeue::{requeue, restore_unvisited};

const TOTAL_STEPS: usize = 5;

/// What one elaboration cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// No `current` generation existed, nothing was done
    pub idle: bool,
    pub departures: usize,
    /// Previous entries excluded for having reached the retry ceiling
    pub skipped: usize,
    pub enriched: usize,
    pub retried: usize,
    pub rejected: usize,
    /// Departures left unvisited by an interruption, kept with their counter
    pub unvisited: usize,
    pub permanently_skipped: Vec<VesselId>,
    pub interrupted: bool,
    /// Master report size after the merge, when it was rewritten
    pub report_rows: Option<usize>,
    /// Where the retired `previous` generation was archived
    pub archived: Option<String>,
}

/// Run one elaboration cycle.
///
/// Detect departures, enrich them, requeue the failures into `current`,
/// merge the enriched rows into the master report and rotate generations.
/// An invalid config aborts before any file is touched. Any storage error
/// aborts the cycle before rotation.
pub async fn run_cycle(
    config: &Config,
    storage: &dyn TrackerStorage,
    lookup: &dyn TripLookup,
    shutdown: &AtomicBool,
) -> Result<CycleSummary> {
    config.validate()?;
    log::header("Elaboration cycle");
    let mut summary = CycleSummary::default();

    log::step(1, TOTAL_STEPS, "Detect - Comparing snapshots");
    let Some(current) = storage.load_current().await? else {
        log::warn!("No current snapshot found, run a collection first");
        summary.idle = true;
        return Ok(summary);
    };
    let previous = storage.load_previous().await?;
    log::sub_item(&format!(
        "previous: {} vessels, current: {} vessels",
        previous.len(),
        current.len()
    ));

    let detection = DepartureDetector::new(config.retry.ceiling).detect(&previous, &current);
    summary.departures = detection.departures.len();
    summary.skipped = detection.skipped;
    log::sub_item(&format!(
        "{} departures, {} skipped over the retry ceiling",
        summary.departures, summary.skipped
    ));

    if detection.has_departures() {
        log::step(2, TOTAL_STEPS, "Enrich - Looking up trips");
        let enrichment = Enricher::new(lookup, Duration::from_secs(config.tracker.timeout_secs))
            .with_policy(config.acceptance)
            .with_shutdown(shutdown)
            .enrich(&detection.departures)
            .await;
        summary.enriched = enrichment.rows.len();
        summary.retried = enrichment.retryable.len();
        summary.rejected = enrichment.rejected.len();
        summary.unvisited = enrichment.unvisited.len();
        summary.interrupted = enrichment.interrupted;

        log::step(3, TOTAL_STEPS, "Requeue - Scheduling retries");
        if enrichment.retryable.is_empty() && enrichment.unvisited.is_empty() {
            log::sub_item("nothing to retry");
        } else {
            let now = Local::now().naive_local().trunc_subsecs(0);
            // Re-read so the upsert applies to what is on disk now.
            let on_disk = storage.load_current().await?.unwrap_or(current);
            let requeued = requeue(&enrichment.retryable, on_disk, config.retry.ceiling, now);
            let snapshot = restore_unvisited(&enrichment.unvisited, requeued.snapshot, now);
            storage.write_current(&snapshot).await?;
            log::sub_item(&format!("{} vessels queued for retry", summary.retried));
            if summary.unvisited > 0 {
                log::sub_item(&format!(
                    "{} unvisited vessels kept for the next cycle",
                    summary.unvisited
                ));
            }
            summary.permanently_skipped = requeued.permanently_skipped.into_iter().collect();
        }

        log::step(4, TOTAL_STEPS, "Report - Merging enriched departures");
        if enrichment.rows.is_empty() {
            log::sub_item("no new rows");
        } else {
            let existing = storage.load_report().await?;
            let merged = merge_report(existing, enrichment.rows);
            storage.write_report(&merged).await?;
            log::info!("Master report now holds {} rows", merged.len());
            summary.report_rows = Some(merged.len());
        }
    } else {
        log::info!("No departures detected, skipping enrichment");
    }

    log::step(5, TOTAL_STEPS, "Rotate - Promoting current snapshot");
    match storage.rotate().await? {
        RotationOutcome::Rotated { archived } => {
            if let Some(path) = &archived {
                log::sub_item(&format!("previous archived to {path}"));
            }
            summary.archived = archived;
        }
        RotationOutcome::NoCurrent => log::warn!("Current snapshot vanished before rotation"),
    }

    log::summary(
        "Cycle complete",
        &[
            ("Departures", summary.departures.to_string()),
            ("Skipped", summary.skipped.to_string()),
            ("Enriched", summary.enriched.to_string()),
            ("Retried", summary.retried.to_string()),
            ("Rejected", summary.rejected.to_string()),
            ("Unvisited", summary.unvisited.to_string()),
            (
                "Permanently skipped",
                summary.permanently_skipped.len().to_string(),
            ),
        ],
    );
    if summary.interrupted {
        log::warn!("Cycle was interrupted, partial results were saved");
    }

    Ok(summary)
}
