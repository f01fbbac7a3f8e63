//! File-based counter storage.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::{CounterMutation, CounterState, CounterTransition, SequenceKey};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::LockSettings;

use super::lock::RowLock;
use super::sanitize_name;

/// File-based counter storage implementation.
///
/// Each counter lives in `counters/{scope}/{name}.json` and is only written
/// while that file is exclusively locked. Counter files are never unlinked: a
/// deleted counter is an empty file, so every writer, including one that opened
/// the file before the delete, locks the same inode and sees the deletion.
pub struct FileCounterStorage {
    /// Directory for counter files.
    counters_dir: PathBuf,
    /// Row lock wait.
    lock: LockSettings,
}

impl FileCounterStorage {
    /// Create a new file counter storage.
    #[must_use]
    pub const fn new(counters_dir: PathBuf, lock: LockSettings) -> Self {
        Self { counters_dir, lock }
    }

    fn counter_path(&self, key: &SequenceKey) -> PathBuf {
        self.counters_dir
            .join(sanitize_name(&key.scope_id))
            .join(format!("{}.json", sanitize_name(&key.sequence_name)))
    }

    /// Read a counter without taking its lock.
    ///
    /// Writers replace the whole file under the lock, so a concurrent read can
    /// observe an empty file; that is retried once under the lock.
    pub async fn get(&self, key: &SequenceKey) -> StorageResult<Option<CounterState>> {
        let path = self.counter_path(key);
        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => {
                if let Ok(state) = serde_json::from_slice(&bytes) {
                    return Ok(Some(state));
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match RowLock::acquire_existing(&path, self.lock, &key.to_string()).await? {
            Some(mut row) => row.read_json(),
            None => Ok(None),
        }
    }

    /// Create a zero counter unless one exists.
    pub async fn init(&self, key: &SequenceKey, now: DateTime<Utc>) -> StorageResult<()> {
        let mut row = RowLock::acquire(&self.counter_path(key), self.lock, &key.to_string()).await?;
        if row.read_json::<CounterState>()?.is_none() {
            row.write_json(&CounterState::initial(now))?;
        }
        Ok(())
    }

    /// Lock, read, apply `mutation`, write, unlock.
    ///
    /// Fails with [`StorageError::Missing`] when there is no counter; nothing is
    /// created.
    pub async fn apply(
        &self,
        key: &SequenceKey,
        mutation: CounterMutation,
        now: DateTime<Utc>,
    ) -> StorageResult<CounterTransition> {
        let missing = || StorageError::Missing(key.to_string());
        let mut row = RowLock::acquire_existing(&self.counter_path(key), self.lock, &key.to_string())
            .await?
            .ok_or_else(missing)?;

        let previous: CounterState = row.read_json()?.ok_or_else(missing)?;
        let transition = mutation
            .apply(&previous, now)
            .map_err(|_| StorageError::Exhausted(key.to_string()))?;
        row.write_json(&transition.current)?;

        Ok(transition)
    }

    /// Empty a counter under its lock. Returns whether it existed.
    pub async fn remove(&self, key: &SequenceKey) -> StorageResult<bool> {
        let Some(mut row) =
            RowLock::acquire_existing(&self.counter_path(key), self.lock, &key.to_string()).await?
        else {
            return Ok(false);
        };

        let existed = row.read_json::<CounterState>()?.is_some();
        row.clear()?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdvanceRule, ResetPeriod};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn storage(temp: &TempDir) -> FileCounterStorage {
        FileCounterStorage::new(
            temp.path().to_path_buf(),
            LockSettings {
                timeout: Duration::from_secs(5),
                retry_interval: Duration::from_millis(1),
            },
        )
    }

    fn key() -> SequenceKey {
        SequenceKey::new("acme", "invoice").unwrap()
    }

    fn advance() -> CounterMutation {
        CounterMutation::Advance(AdvanceRule {
            step_size: 1,
            reset_base: 0,
            reset_period: ResetPeriod::Never,
            reset_limit: None,
        })
    }

    #[tokio::test]
    async fn test_missing_counter() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        assert!(storage.get(&key()).await.unwrap().is_none());
        assert!(!storage.remove(&key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        let now = Utc::now();

        storage.init(&key(), now).await.unwrap();
        storage.apply(&key(), advance(), now).await.unwrap();
        storage.init(&key(), now).await.unwrap();

        assert_eq!(storage.get(&key()).await.unwrap().unwrap().counter, 1);
    }

    #[tokio::test]
    async fn test_apply_persists() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        let now = Utc::now();

        storage.init(&key(), now).await.unwrap();
        let t = storage.apply(&key(), advance(), now).await.unwrap();
        assert_eq!(t.previous.counter, 0);
        assert_eq!(t.current.counter, 1);

        let t = storage
            .apply(&key(), CounterMutation::Set { value: 41 }, now)
            .await
            .unwrap();
        assert_eq!(t.previous.counter, 1);

        let t = storage.apply(&key(), advance(), now).await.unwrap();
        assert_eq!(t.current.counter, 42);
        assert_eq!(storage.get(&key()).await.unwrap().unwrap().counter, 42);

        assert!(storage.remove(&key()).await.unwrap());
        assert!(storage.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_never_creates() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        let now = Utc::now();

        for mutation in [
            advance(),
            CounterMutation::Reset { base: 0 },
            CounterMutation::Set { value: 5 },
        ] {
            let result = storage.apply(&key(), mutation, now).await;
            assert!(matches!(result, Err(StorageError::Missing(_))));
        }
        assert!(!temp.path().join("acme/invoice.json").exists());
        assert!(storage.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writer_after_remove_does_not_revive_counter() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        let now = Utc::now();

        storage.init(&key(), now).await.unwrap();
        storage.apply(&key(), advance(), now).await.unwrap();
        storage.apply(&key(), advance(), now).await.unwrap();

        // Opened before the removal, locked after it.
        let path = temp.path().join("acme/invoice.json");
        let stale = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();

        assert!(storage.remove(&key()).await.unwrap());
        let result = storage.apply(&key(), advance(), now).await;
        assert!(matches!(result, Err(StorageError::Missing(_))));

        fs2::FileExt::lock_exclusive(&stale).unwrap();
        assert_eq!(stale.metadata().unwrap().len(), 0);
        fs2::FileExt::unlock(&stale).unwrap();

        // Configured again: starts from zero.
        storage.init(&key(), now).await.unwrap();
        let t = storage.apply(&key(), advance(), now).await.unwrap();
        assert_eq!(t.current.counter, 1);
        assert!(!storage.remove(&SequenceKey::new("acme", "other").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_overflow_leaves_counter_unchanged() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        let now = Utc::now();

        storage.init(&key(), now).await.unwrap();
        storage
            .apply(&key(), CounterMutation::Set { value: u64::MAX }, now)
            .await
            .unwrap();
        let result = storage.apply(&key(), advance(), now).await;
        assert!(matches!(result, Err(StorageError::Exhausted(_))));
        assert_eq!(
            storage.get(&key()).await.unwrap().unwrap().counter,
            u64::MAX
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_apply_no_duplicates() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(storage(&temp));
        storage.init(&key(), Utc::now()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .apply(&key(), advance(), Utc::now())
                    .await
                    .unwrap()
                    .current
                    .counter
            }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort_unstable();
        assert_eq!(values, (1..=32).collect::<Vec<u64>>());
    }
}
