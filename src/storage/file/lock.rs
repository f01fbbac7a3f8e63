//! Per-row advisory file locks with a bounded wait.
//!
//! The counter file itself is the lock: an exclusive `flock` on it is the row
//! lock for one (scope, sequence name). Acquisition polls `try_lock_exclusive`
//! until a deadline instead of blocking a runtime thread.
//! Note: File locks may not work correctly on all network filesystems.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::{Instant, sleep};

use crate::error::{StorageError, StorageResult};
use crate::storage::traits::LockSettings;

/// An exclusively locked file. The lock is released when dropped.
pub struct RowLock {
    file: File,
}

impl RowLock {
    /// Open (creating if needed) and exclusively lock the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LockTimeout`] if the lock is still held elsewhere
    /// after `settings.timeout`.
    pub async fn acquire(path: &Path, settings: LockSettings, label: &str) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Self::lock(file, settings, label).await
    }

    /// Lock the file at `path` only if it already exists.
    ///
    /// # Errors
    ///
    /// Same as [`Self::acquire`].
    pub async fn acquire_existing(
        path: &Path,
        settings: LockSettings,
        label: &str,
    ) -> StorageResult<Option<Self>> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Self::lock(file, settings, label).await.map(Some)
    }

    async fn lock(file: File, settings: LockSettings, label: &str) -> StorageResult<Self> {
        let deadline = Instant::now() + settings.timeout;
        loop {
            match fs2::FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(Self { file }),
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(StorageError::LockFailed(e.to_string())),
            }

            if Instant::now() >= deadline {
                return Err(StorageError::LockTimeout(format!(
                    "'{label}' still locked after {}ms",
                    settings.timeout.as_millis()
                )));
            }
            sleep(settings.retry_interval).await;
        }
    }

    /// Decode the file contents; `None` when the file is empty.
    pub fn read_json<T: DeserializeOwned>(&mut self) -> StorageResult<Option<T>> {
        let mut buf = String::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_string(&mut buf)?;
        if buf.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&buf)?))
    }

    /// Replace the file contents and flush them to disk.
    pub fn write_json<T: Serialize>(&mut self, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.set_len(0)?;
        self.file.write_all(json.as_bytes())?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Empty the file, leaving it in place.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl Drop for RowLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(timeout_ms: u64) -> LockSettings {
        LockSettings {
            timeout: Duration::from_millis(timeout_ms),
            retry_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_acquire_read_write() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rows/a.json");

        let mut lock = RowLock::acquire(&path, settings(100), "a").await.unwrap();
        assert_eq!(lock.read_json::<u64>().unwrap(), None);

        lock.write_json(&42u64).unwrap();
        assert_eq!(lock.read_json::<u64>().unwrap(), Some(42));

        lock.write_json(&7u64).unwrap();
        assert_eq!(lock.read_json::<u64>().unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_times_out_while_held() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.json");

        let _held = RowLock::acquire(&path, settings(100), "a").await.unwrap();
        let result = RowLock::acquire(&path, settings(30), "a").await;
        assert!(matches!(result, Err(StorageError::LockTimeout(_))));
    }

    #[tokio::test]
    async fn test_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.json");

        let held = RowLock::acquire(&path, settings(100), "a").await.unwrap();
        drop(held);
        assert!(RowLock::acquire(&path, settings(30), "a").await.is_ok());
    }

    #[tokio::test]
    async fn test_acquire_existing_does_not_create() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.json");

        assert!(RowLock::acquire_existing(&path, settings(30), "a").await.unwrap().is_none());
        assert!(!path.exists());

        let mut lock = RowLock::acquire(&path, settings(30), "a").await.unwrap();
        lock.write_json(&1u64).unwrap();
        lock.clear().unwrap();
        assert_eq!(lock.read_json::<u64>().unwrap(), None);
        drop(lock);

        let mut lock = RowLock::acquire_existing(&path, settings(30), "a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lock.read_json::<u64>().unwrap(), None);
    }

    #[tokio::test]
    async fn test_rows_do_not_contend() {
        let temp = TempDir::new().unwrap();

        let _a = RowLock::acquire(&temp.path().join("a.json"), settings(100), "a")
            .await
            .unwrap();
        assert!(
            RowLock::acquire(&temp.path().join("b.json"), settings(30), "b")
                .await
                .is_ok()
        );
    }
}
