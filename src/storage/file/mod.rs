//! File-based storage backend.
//!
//! This backend stores data as JSON files with file locking for atomic operations.
//! Suitable for development and single-node deployments.
//!
//! Directory structure:
//! ```text
//! data/
//! ├── configs/
//! │   └── {scope}/
//! │       └── {name}.json
//! ├── counters/
//! │   └── {scope}/
//! │       └── {name}.json      (locked per row, emptied on delete)
//! ├── history/
//! │   └── {scope}/
//! │       └── {name}.jsonl
//! └── audit.jsonl
//! ```

mod config;
mod counter;
mod history;
mod lock;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::FileStorageConfig;
use crate::domain::{
    AuditEntry, CounterMutation, CounterState, CounterTransition, GeneratedNumber, SequenceConfig,
    SequenceKey,
};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{ConfigStorage, CounterStorage, HistoryStorage, LockSettings, Storage};

pub use config::FileConfigStorage;
pub use counter::FileCounterStorage;
pub use history::FileHistoryStorage;
pub use lock::RowLock;

/// File-based storage implementation.
pub struct FileStorage {
    /// Base data directory.
    base_dir: PathBuf,
    /// Config storage.
    config_storage: FileConfigStorage,
    /// Counter storage.
    counter_storage: FileCounterStorage,
    /// History and audit storage.
    history_storage: FileHistoryStorage,
}

impl FileStorage {
    /// Create a new file storage instance.
    ///
    /// # Arguments
    ///
    /// * `config` - File storage configuration
    /// * `lock` - Bounded wait for counter row locks
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created.
    pub fn new(config: &FileStorageConfig, lock: LockSettings) -> StorageResult<Self> {
        let base_dir = config.data_dir.clone();

        // Create directory structure
        Self::ensure_directories(&base_dir)?;

        Ok(Self {
            config_storage: FileConfigStorage::new(base_dir.join("configs")),
            counter_storage: FileCounterStorage::new(base_dir.join("counters"), lock),
            history_storage: FileHistoryStorage::new(base_dir.clone()),
            base_dir,
        })
    }

    /// Ensure all required directories exist.
    fn ensure_directories(base_dir: &Path) -> StorageResult<()> {
        let dirs = [
            base_dir.to_path_buf(),
            base_dir.join("configs"),
            base_dir.join("counters"),
            base_dir.join("history"),
        ];

        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::FileIO(format!("Failed to create directory {}: {e}", dir.display()))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl ConfigStorage for FileStorage {
    async fn save_config(&self, config: &SequenceConfig) -> StorageResult<()> {
        self.config_storage.save(config)
    }

    async fn insert_config_if_absent(
        &self,
        config: &SequenceConfig,
    ) -> StorageResult<Option<SequenceConfig>> {
        self.config_storage.insert_if_absent(config)
    }

    async fn get_config(&self, key: &SequenceKey) -> StorageResult<Option<SequenceConfig>> {
        self.config_storage.get(key)
    }

    async fn list_configs(&self, scope_id: &str) -> StorageResult<Vec<SequenceConfig>> {
        self.config_storage.list(scope_id)
    }

    async fn delete_config(&self, key: &SequenceKey) -> StorageResult<bool> {
        let existed = self.config_storage.delete(key)?;
        self.counter_storage.remove(key).await?;
        Ok(existed)
    }
}

#[async_trait]
impl CounterStorage for FileStorage {
    async fn get_counter(&self, key: &SequenceKey) -> StorageResult<Option<CounterState>> {
        self.counter_storage.get(key).await
    }

    async fn init_counter(&self, key: &SequenceKey, now: DateTime<Utc>) -> StorageResult<()> {
        if self.config_storage.get(key)?.is_none() {
            return Ok(());
        }
        self.counter_storage.init(key, now).await
    }

    async fn apply(
        &self,
        key: &SequenceKey,
        mutation: CounterMutation,
        now: DateTime<Utc>,
    ) -> StorageResult<CounterTransition> {
        self.counter_storage.apply(key, mutation, now).await
    }
}

#[async_trait]
impl HistoryStorage for FileStorage {
    async fn record_generated(&self, number: &GeneratedNumber) -> StorageResult<()> {
        self.history_storage.record_generated(number)
    }

    async fn record_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        self.history_storage.record_audit(entry)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn health_check(&self) -> StorageResult<()> {
        // Check if base directory is accessible
        if !self.base_dir.exists() {
            return Err(StorageError::Unavailable);
        }

        // Try to create a test file
        let test_file = self.base_dir.join(".health_check");
        tokio::fs::write(&test_file, b"ok")
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check failed: {e}")))?;
        tokio::fs::remove_file(&test_file)
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check cleanup failed: {e}")))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// Sanitize a name for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdvanceRule, ResetPeriod};
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = FileStorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
        };
        let storage = FileStorage::new(&config, LockSettings::default()).unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.health_check().await.is_ok());
        assert_eq!(storage.backend_name(), "file");
    }

    #[tokio::test]
    async fn test_delete_removes_config_and_counter() {
        let (storage, _temp) = create_test_storage();
        let key = SequenceKey::new("acme", "invoice").unwrap();
        let now = Utc::now();

        storage
            .save_config(&SequenceConfig::new(&key, "INV-{COUNTER}", now))
            .await
            .unwrap();
        storage.init_counter(&key, now).await.unwrap();
        storage
            .apply(
                &key,
                CounterMutation::Advance(AdvanceRule {
                    step_size: 1,
                    reset_base: 0,
                    reset_period: ResetPeriod::Never,
                    reset_limit: None,
                }),
                now,
            )
            .await
            .unwrap();

        assert!(storage.delete_config(&key).await.unwrap());
        assert!(storage.get_config(&key).await.unwrap().is_none());
        assert!(storage.get_counter(&key).await.unwrap().is_none());
        assert!(!storage.delete_config(&key).await.unwrap());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("po_number-1"), "po_number-1");
        assert_eq!(sanitize_name("../etc"), "___etc");
    }
}
