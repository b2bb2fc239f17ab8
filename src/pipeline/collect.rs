// src/pipeline/collect.rs

//! Port collection pipeline.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::Config;
use crate::services::{CollectOutcome, PortCollector};
use crate::storage::TrackerStorage;
use crate::utils::log;

/// Run the port collector and store its result as the `current` generation.
///
/// An empty collection leaves the existing `current` untouched.
pub async fn run_collector(
    config: Arc<Config>,
    storage: &dyn TrackerStorage,
) -> Result<CollectOutcome> {
    config.validate()?;
    let start_time = Utc::now();
    log::header("Port collection");
    log::info!("Monitoring {} ports", config.ports.len());

    let collector = PortCollector::new(Arc::clone(&config))?;
    let outcome = collector.collect().await?;
    store_collection(storage, &outcome).await?;

    log::summary(
        "Collection complete",
        &[
            ("Vessels", outcome.snapshot.len().to_string()),
            (
                "Ports",
                format!(
                    "{}/{} ok",
                    outcome.port_total - outcome.port_failures,
                    outcome.port_total
                ),
            ),
            (
                "Elapsed",
                format!("{}s", (Utc::now() - start_time).num_seconds()),
            ),
        ],
    );

    Ok(outcome)
}

async fn store_collection(storage: &dyn TrackerStorage, outcome: &CollectOutcome) -> Result<()> {
    if outcome.snapshot.is_empty() {
        log::warn!("No vessels found at any port, current snapshot left untouched");
        return Ok(());
    }
    storage.write_current(&outcome.snapshot).await?;
    log::info!("Current snapshot saved with {} vessels", outcome.snapshot.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Snapshot, SnapshotEntry};
    use crate::storage::LocalStorage;

    fn one_vessel() -> Snapshot {
        let seen_at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        std::iter::once(SnapshotEntry::new("1".into(), "Genova", seen_at)).collect()
    }

    #[tokio::test]
    async fn test_store_collection_writes_current() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let outcome = CollectOutcome {
            snapshot: one_vessel(),
            port_total: 1,
            port_failures: 0,
        };

        store_collection(&storage, &outcome).await.unwrap();
        assert_eq!(storage.load_current().await.unwrap(), Some(one_vessel()));
    }

    #[tokio::test]
    async fn test_empty_collection_keeps_existing_current() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_current(&one_vessel()).await.unwrap();

        let outcome = CollectOutcome {
            snapshot: Snapshot::new(),
            port_total: 2,
            port_failures: 2,
        };
        store_collection(&storage, &outcome).await.unwrap();

        assert_eq!(storage.load_current().await.unwrap(), Some(one_vessel()));
    }
}
