//! Exclusive run lock for cycle runners.
//!
//! An advisory OS lock on `tracker.lock`. The file itself stays on disk and
//! only records the last holder's pid and start time; the lock dies with the
//! process that holds it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;

use crate::error::{AppError, Result};

/// A held run lock. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock. Returns `Ok(None)` when another runner holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Option<Self>> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                log::debug!("Run lock {} is held by another runner", path.display());
                return Ok(None);
            }
            Err(e) => return Err(AppError::lock(format!("{}: {e}", path.display()))),
        }

        // Only the holder rewrites the body.
        file.set_len(0)?;
        writeln!(
            file,
            "pid={} ts={}",
            std::process::id(),
            Utc::now().timestamp()
        )?;
        file.sync_all()?;

        Ok(Some(Self { file, path }))
    }

    /// Body of the lock file while some runner holds it, `None` when free.
    pub fn holder(path: &Path) -> Result<Option<String>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };

        match FileExt::try_lock_shared(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                Ok(None)
            }
            Err(e) if is_contended(&e) => Ok(Some(fs::read_to_string(path)?.trim().to_string())),
            Err(e) => Err(AppError::lock(format!("{}: {e}", path.display()))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.file)
            .map_err(|e| AppError::lock(format!("{}: {e}", self.path.display())))
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
