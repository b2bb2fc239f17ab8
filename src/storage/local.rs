//! Local filesystem storage implementation.
//!
//! Every write goes to a sibling temp file first and is renamed into place,
//! so a reader never sees a torn snapshot or report.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── {paths.current_snapshot}
//! ├── {paths.previous_snapshot}
//! ├── {paths.history_dir}/previous_YYYYMMDD_HHMMSS_ffffff.json
//! └── {paths.master_report}
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PathsConfig, ReportRow, Snapshot};
use crate::storage::{RotationOutcome, SnapshotDocument, TrackerStorage};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    paths: PathsConfig,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_paths(root_dir, PathsConfig::default())
    }

    /// Create a LocalStorage with custom file locations.
    pub fn with_paths(root_dir: impl Into<PathBuf>, paths: PathsConfig) -> Self {
        Self {
            root_dir: root_dir.into(),
            paths,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write JSON data atomically.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&self.path(key), &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_snapshot(&self, key: &str) -> Result<Option<Snapshot>> {
        Ok(self
            .read_json::<SnapshotDocument>(key)
            .await?
            .map(SnapshotDocument::into_snapshot))
    }

    /// Pick an unused archive path for a rotation happening now.
    async fn archive_path(&self) -> Result<PathBuf> {
        let dir = self.path(&self.paths.history_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let mut candidate = dir.join(format!("previous_{stamp}.json"));
        let mut attempt = 1;
        while tokio::fs::try_exists(&candidate).await? {
            candidate = dir.join(format!("previous_{stamp}_{attempt}.json"));
            attempt += 1;
        }
        Ok(candidate)
    }
}

/// Write bytes atomically (write to temp, then rename).
///
/// The temp file is synced before the rename; on failure the target is
/// left as it was and the temp file is removed.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::Io(e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl TrackerStorage for LocalStorage {
    async fn load_previous(&self) -> Result<Snapshot> {
        match self.read_snapshot(&self.paths.previous_snapshot).await? {
            Some(snapshot) => Ok(snapshot),
            None => {
                log::info!("No previous snapshot found, starting from an empty one");
                Ok(Snapshot::new())
            }
        }
    }

    async fn load_current(&self) -> Result<Option<Snapshot>> {
        self.read_snapshot(&self.paths.current_snapshot).await
    }

    async fn write_current(&self, snapshot: &Snapshot) -> Result<()> {
        let document = SnapshotDocument::new(snapshot);
        self.write_json(&self.paths.current_snapshot, &document)
            .await?;
        log::debug!(
            "Current snapshot written: {} vessels to {}",
            document.count,
            self.paths.current_snapshot
        );
        Ok(())
    }

    async fn rotate(&self) -> Result<RotationOutcome> {
        let current = self.path(&self.paths.current_snapshot);
        let previous = self.path(&self.paths.previous_snapshot);

        if !tokio::fs::try_exists(&current).await? {
            log::warn!(
                "No current snapshot at {}; previous generation left untouched",
                current.display()
            );
            return Ok(RotationOutcome::NoCurrent);
        }

        let archived = if tokio::fs::try_exists(&previous).await? {
            let archive = self.archive_path().await?;
            tokio::fs::copy(&previous, &archive).await?;
            log::info!("Previous snapshot archived to {}", archive.display());
            Some(archive.display().to_string())
        } else {
            None
        };

        if let Some(parent) = previous.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Replaces the retired generation in one step.
        tokio::fs::rename(&current, &previous).await?;
        log::info!("Current snapshot promoted to {}", previous.display());

        Ok(RotationOutcome::Rotated { archived })
    }

    async fn load_report(&self) -> Result<Vec<ReportRow>> {
        match self.read_json(&self.paths.master_report).await? {
            Some(rows) => Ok(rows),
            None => {
                log::info!("No master report yet at {}", self.paths.master_report);
                Ok(Vec::new())
            }
        }
    }

    async fn write_report(&self, rows: &[ReportRow]) -> Result<()> {
        self.write_json(&self.paths.master_report, rows).await?;
        log::info!(
            "Master report written: {} rows to {}",
            rows.len(),
            self.paths.master_report
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotEntry;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn snapshot(ids: &[(&str, &str, u32)]) -> Snapshot {
        let seen_at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        ids.iter()
            .map(|(id, port, retry)| {
                SnapshotEntry::new((*id).into(), *port, seen_at).with_retry_count(*retry)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_write_atomic_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        write_atomic(&storage.path("nested/test.txt"), b"hello")
            .await
            .unwrap();
        let data = storage.read_bytes("nested/test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!storage.path("nested/test.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read_bytes("nope.txt").await.unwrap().is_none());
        assert!(storage.load_current().await.unwrap().is_none());
        assert!(storage.load_previous().await.unwrap().is_empty());
        assert!(storage.load_report().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_current_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let current = snapshot(&[("1", "Genova", 0), ("2", "Livorno", 3)]);

        storage.write_current(&current).await.unwrap();
        let loaded = storage.load_current().await.unwrap().unwrap();

        assert_eq!(loaded, current);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_content() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let current = snapshot(&[("1", "Genova", 0)]);
        storage.write_current(&current).await.unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir_all(storage.path("state/current.json.tmp")).unwrap();
        let replacement = snapshot(&[("2", "Napoli", 0)]);
        assert!(storage.write_current(&replacement).await.is_err());

        let loaded = storage.load_current().await.unwrap().unwrap();
        assert_eq!(loaded, current);
    }

    #[tokio::test]
    async fn test_rotate_first_run_has_nothing_to_archive() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let current = snapshot(&[("1", "Genova", 0)]);
        storage.write_current(&current).await.unwrap();

        let outcome = storage.rotate().await.unwrap();

        assert_eq!(outcome, RotationOutcome::Rotated { archived: None });
        assert!(storage.load_current().await.unwrap().is_none());
        assert_eq!(storage.load_previous().await.unwrap(), current);
    }

    #[tokio::test]
    async fn test_rotate_archives_previous() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let first = snapshot(&[("1", "Genova", 0)]);
        storage.write_current(&first).await.unwrap();
        storage.rotate().await.unwrap();

        let second = snapshot(&[("2", "Livorno", 0)]);
        storage.write_current(&second).await.unwrap();
        let outcome = storage.rotate().await.unwrap();

        let RotationOutcome::Rotated {
            archived: Some(archive),
        } = outcome
        else {
            panic!("expected an archive, got {outcome:?}");
        };
        let archived: SnapshotDocument =
            serde_json::from_slice(&std::fs::read(&archive).unwrap()).unwrap();
        assert_eq!(archived.into_snapshot(), first);
        assert_eq!(storage.load_previous().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_rotate_without_current_keeps_previous() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let first = snapshot(&[("1", "Genova", 0)]);
        storage.write_current(&first).await.unwrap();
        storage.rotate().await.unwrap();

        let outcome = storage.rotate().await.unwrap();

        assert_eq!(outcome, RotationOutcome::NoCurrent);
        assert_eq!(storage.load_previous().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_archive_names_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let a = storage.archive_path().await.unwrap();
        std::fs::write(&a, b"{}").unwrap();
        let b = storage.archive_path().await.unwrap();

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_legacy_snapshot_without_retry_column() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let legacy = r#"{
            "updated_at": "2026-10-19T06:00:00Z",
            "count": 1,
            "entries": [
                {"id": "247123400", "extractionDate": "2026-10-19",
                 "extractionTime": "08:00:00", "referencePort": "Livorno"}
            ]
        }"#;
        std::fs::create_dir_all(storage.path("state")).unwrap();
        std::fs::write(storage.path("state/previous.json"), legacy).unwrap();

        let previous = storage.load_previous().await.unwrap();
        assert_eq!(previous.get(&"247123400".into()).unwrap().retry_count, 0);
    }
}
