//! Trip enrichment of departed vessels.
//!
//! Looks up every departure candidate one at a time and routes each one to
//! the report, the retry queue, or (under the strict policy) rejection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, SubsecRound};

use crate::error::LookupError;
use crate::models::{AcceptancePolicy, DepartureCandidate, ReportRow, TripRecord, UNKNOWN_PORT};
use crate::services::TripLookup;

/// Where a lookup outcome sends its candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Usable data: goes to the report
    Accept,
    /// Failure or no data: try again next cycle
    Retry,
    /// Data that does not belong to this departure
    Reject,
}

/// Classify one lookup outcome.
pub fn classify(
    candidate: &DepartureCandidate,
    outcome: &Result<Option<TripRecord>, LookupError>,
    policy: AcceptancePolicy,
) -> Verdict {
    let record = match outcome {
        Ok(Some(record)) if !record.is_empty() => record,
        Ok(_) | Err(_) => return Verdict::Retry,
    };

    match policy {
        AcceptancePolicy::AnyField => Verdict::Accept,
        AcceptancePolicy::MatchReferencePort => {
            if matches_reference_port(candidate, record) {
                Verdict::Accept
            } else {
                Verdict::Reject
            }
        }
    }
}

/// Case-insensitive containment of the reference port in the scraped
/// departure port. An unknown reference port has nothing to compare.
fn matches_reference_port(candidate: &DepartureCandidate, record: &TripRecord) -> bool {
    let reference = candidate.reference_port.trim().to_lowercase();
    if reference.is_empty() || reference == UNKNOWN_PORT.to_lowercase() {
        return true;
    }
    record
        .current
        .origin_port
        .as_deref()
        .is_some_and(|port| port.to_lowercase().contains(&reference))
}

/// Accumulated enrichment results.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub rows: Vec<ReportRow>,
    pub retryable: Vec<DepartureCandidate>,
    pub rejected: Vec<DepartureCandidate>,
    /// Candidates never looked up because enrichment stopped early
    pub unvisited: Vec<DepartureCandidate>,
    pub interrupted: bool,
}

/// Sequential enrichment driver.
pub struct Enricher<'a> {
    lookup: &'a dyn TripLookup,
    timeout: Duration,
    policy: AcceptancePolicy,
    shutdown: Option<&'a AtomicBool>,
}

impl<'a> Enricher<'a> {
    pub fn new(lookup: &'a dyn TripLookup, timeout: Duration) -> Self {
        Self {
            lookup,
            timeout,
            policy: AcceptancePolicy::default(),
            shutdown: None,
        }
    }

    pub fn with_policy(mut self, policy: AcceptancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop between vessels once `flag` is set.
    pub fn with_shutdown(mut self, flag: &'a AtomicBool) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Look up one vessel, turning an overrun into a lookup failure.
    async fn lookup_one(
        &self,
        candidate: &DepartureCandidate,
    ) -> Result<Option<TripRecord>, LookupError> {
        match tokio::time::timeout(self.timeout, self.lookup.lookup(&candidate.id)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(LookupError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn pause(&self) {
        let pacing = self.lookup.pacing();
        if !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }

    /// Enrich `departures` in order.
    pub async fn enrich(&self, departures: &[DepartureCandidate]) -> Enrichment {
        let mut enrichment = Enrichment::default();
        let total = departures.len();

        for (index, candidate) in departures.iter().enumerate() {
            if self.shutdown_requested() {
                let remaining = &departures[index..];
                log::warn!(
                    "Shutdown requested, {} vessels left for the next cycle",
                    remaining.len()
                );
                enrichment.unvisited.extend(remaining.iter().cloned());
                enrichment.interrupted = true;
                break;
            }

            log::info!("[{}/{}] Vessel {}", index + 1, total, candidate.id);
            let outcome = self.lookup_one(candidate).await;
            self.pause().await;

            match classify(candidate, &outcome, self.policy) {
                Verdict::Accept => {
                    if let Ok(Some(record)) = &outcome {
                        log::debug!("Vessel {}: trip data accepted", candidate.id);
                        enrichment
                            .rows
                            .push(ReportRow::from_trip(candidate, record, extraction_time()));
                    }
                }
                Verdict::Retry => {
                    match &outcome {
                        Err(e) => log::warn!("Vessel {}: lookup failed: {}", candidate.id, e),
                        Ok(_) => log::warn!("Vessel {}: no trip data found", candidate.id),
                    }
                    enrichment.retryable.push(candidate.clone());
                }
                Verdict::Reject => {
                    log::warn!(
                        "Vessel {}: departure port does not match {}, discarded",
                        candidate.id,
                        candidate.reference_port
                    );
                    enrichment.rejected.push(candidate.clone());
                }
            }
        }

        enrichment
    }
}

fn extraction_time() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::models::{TripLeg, VesselId};

    fn candidate(id: &str, port: &str) -> DepartureCandidate {
        DepartureCandidate::new(id.into(), port)
    }

    fn current_trip(origin: &str) -> TripRecord {
        TripRecord {
            current: TripLeg::new(
                Some(origin.into()),
                Some("2026-10-19 06:40".into()),
                Some("Olbia".into()),
                None,
            ),
            previous: TripLeg::default(),
        }
    }

    fn history_only() -> TripRecord {
        TripRecord {
            current: TripLeg::default(),
            previous: TripLeg::new(
                Some("Bastia".into()),
                Some("2026-10-17 08:00".into()),
                None,
                None,
            ),
        }
    }

    enum Scripted {
        Found(TripRecord),
        Nothing,
        Fail,
        Hang,
    }

    struct FakeLookup {
        script: HashMap<VesselId, Scripted>,
        pacing: Duration,
    }

    impl FakeLookup {
        fn new(script: Vec<(&str, Scripted)>) -> Self {
            Self {
                script: script.into_iter().map(|(id, s)| (id.into(), s)).collect(),
                pacing: Duration::ZERO,
            }
        }

        fn paced(mut self, pacing: Duration) -> Self {
            self.pacing = pacing;
            self
        }
    }

    #[async_trait]
    impl TripLookup for FakeLookup {
        async fn lookup(&self, id: &VesselId) -> Result<Option<TripRecord>, LookupError> {
            match self.script.get(id) {
                Some(Scripted::Found(record)) => Ok(Some(record.clone())),
                Some(Scripted::Nothing) | None => Ok(None),
                Some(Scripted::Fail) => Err(LookupError::Transport("connection reset".into())),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }

        fn pacing(&self) -> Duration {
            self.pacing
        }
    }

    #[test]
    fn test_classify_routes_tri_state() {
        let c = candidate("1", "Livorno");
        let policy = AcceptancePolicy::AnyField;

        assert_eq!(classify(&c, &Ok(Some(current_trip("Livorno"))), policy), Verdict::Accept);
        assert_eq!(classify(&c, &Ok(None), policy), Verdict::Retry);
        assert_eq!(classify(&c, &Ok(Some(TripRecord::default())), policy), Verdict::Retry);
        assert_eq!(
            classify(&c, &Err(LookupError::Parse("bad page".into())), policy),
            Verdict::Retry
        );
    }

    #[test]
    fn test_classify_accepts_history_only_data() {
        let c = candidate("1", "Livorno");
        assert_eq!(
            classify(&c, &Ok(Some(history_only())), AcceptancePolicy::AnyField),
            Verdict::Accept
        );
    }

    #[test]
    fn test_strict_policy_matches_reference_port() {
        let policy = AcceptancePolicy::MatchReferencePort;

        let c = candidate("1", "livorno");
        assert_eq!(
            classify(&c, &Ok(Some(current_trip("Porto di LIVORNO"))), policy),
            Verdict::Accept
        );
        assert_eq!(classify(&c, &Ok(Some(current_trip("Genova"))), policy), Verdict::Reject);
        assert_eq!(classify(&c, &Ok(Some(history_only())), policy), Verdict::Reject);
        assert_eq!(classify(&c, &Ok(None), policy), Verdict::Retry);

        let unknown = candidate("2", UNKNOWN_PORT);
        assert_eq!(
            classify(&unknown, &Ok(Some(current_trip("Genova"))), policy),
            Verdict::Accept
        );
    }

    #[tokio::test]
    async fn test_enrich_routes_each_candidate() {
        let lookup = FakeLookup::new(vec![
            ("1", Scripted::Found(current_trip("Livorno"))),
            ("2", Scripted::Nothing),
            ("3", Scripted::Fail),
            ("4", Scripted::Found(history_only())),
        ]);
        let departures = vec![
            candidate("1", "Livorno"),
            candidate("2", "Genova"),
            candidate("3", "Olbia"),
            candidate("4", "PortX"),
        ];

        let result = Enricher::new(&lookup, Duration::from_secs(5))
            .enrich(&departures)
            .await;

        let enriched: Vec<&str> = result.rows.iter().map(|r| r.vessel_id.as_str()).collect();
        let retry: Vec<&str> = result.retryable.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(enriched, vec!["1", "4"]);
        assert_eq!(retry, vec!["2", "3"]);
        assert!(result.rejected.is_empty());
        assert!(!result.interrupted);

        assert_eq!(result.rows[1].reference_port, "PortX");
        assert_eq!(result.rows[1].old_departure_port, "Bastia");
    }

    #[tokio::test]
    async fn test_timeout_is_a_retryable_failure() {
        let lookup = FakeLookup::new(vec![("1", Scripted::Hang)]);

        let result = Enricher::new(&lookup, Duration::from_millis(50))
            .enrich(&[candidate("1", "Livorno")])
            .await;

        assert!(result.rows.is_empty());
        assert_eq!(result.retryable.len(), 1);
    }

    #[tokio::test]
    async fn test_pacing_is_not_charged_to_the_timeout() {
        let lookup = FakeLookup::new(vec![
            ("1", Scripted::Found(current_trip("Livorno"))),
            ("2", Scripted::Found(current_trip("Genova"))),
        ])
        .paced(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let result = Enricher::new(&lookup, Duration::from_millis(100))
            .enrich(&[candidate("1", "Livorno"), candidate("2", "Genova")])
            .await;

        assert_eq!(result.rows.len(), 2);
        assert!(result.retryable.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_shutdown_leaves_unvisited_candidates_apart() {
        let lookup = FakeLookup::new(vec![("1", Scripted::Found(current_trip("Livorno")))]);
        let flag = AtomicBool::new(true);

        let result = Enricher::new(&lookup, Duration::from_secs(5))
            .with_shutdown(&flag)
            .enrich(&[
                candidate("1", "Livorno"),
                candidate("2", "Genova").with_retry_count(3),
            ])
            .await;

        assert!(result.interrupted);
        assert!(result.rows.is_empty());
        assert!(result.retryable.is_empty());
        let unvisited: Vec<(&str, u32)> = result
            .unvisited
            .iter()
            .map(|c| (c.id.as_str(), c.retry_count))
            .collect();
        assert_eq!(unvisited, vec![("1", 0), ("2", 3)]);
    }

    #[tokio::test]
    async fn test_order_does_not_change_routing() {
        let lookup = FakeLookup::new(vec![
            ("1", Scripted::Found(current_trip("Livorno"))),
            ("2", Scripted::Fail),
        ]);
        let forward = vec![candidate("1", "Livorno"), candidate("2", "Genova")];
        let backward: Vec<_> = forward.iter().rev().cloned().collect();

        let enricher = Enricher::new(&lookup, Duration::from_secs(5));
        let a = enricher.enrich(&forward).await;
        let b = enricher.enrich(&backward).await;

        assert_eq!(a.rows.len(), b.rows.len());
        assert_eq!(a.retryable, b.retryable);
    }
}
