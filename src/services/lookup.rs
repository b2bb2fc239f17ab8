//! Trip lookup seam.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::models::{TripRecord, VesselId};

/// Fetches trip data for one vessel.
///
/// `Ok(None)` means the lookup worked but found nothing usable yet.
/// The caller bounds `lookup` with its timeout and waits `pacing` after it.
#[async_trait]
pub trait TripLookup: Send + Sync {
    async fn lookup(&self, id: &VesselId) -> Result<Option<TripRecord>, LookupError>;

    /// Pause between two lookups. Not counted against the lookup timeout.
    fn pacing(&self) -> Duration {
        Duration::ZERO
    }
}
