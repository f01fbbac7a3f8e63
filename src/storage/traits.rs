//! Storage trait definitions.
//!
//! These traits define the interface for storage backends, enabling swapping
//! between different implementations without changing business logic.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AuditEntry, CounterMutation, CounterState, CounterTransition, GeneratedNumber, SequenceConfig,
    SequenceKey,
};
use crate::error::StorageResult;

/// Configuration storage operations.
#[async_trait]
pub trait ConfigStorage: Send + Sync {
    /// Create or replace the configuration for `config.key()`.
    ///
    /// An existing row keeps its `created_at`.
    async fn save_config(&self, config: &SequenceConfig) -> StorageResult<()>;

    /// Insert `config` unless one already exists for its key.
    ///
    /// Returns `None` if `config` was inserted, or the configuration that was
    /// already stored. Of concurrent callers exactly one inserts.
    async fn insert_config_if_absent(
        &self,
        config: &SequenceConfig,
    ) -> StorageResult<Option<SequenceConfig>>;

    /// Get a configuration by key.
    async fn get_config(&self, key: &SequenceKey) -> StorageResult<Option<SequenceConfig>>;

    /// List all configurations of a scope, sorted by sequence name.
    async fn list_configs(&self, scope_id: &str) -> StorageResult<Vec<SequenceConfig>>;

    /// Delete a configuration and its counter.
    ///
    /// Returns `false` if no configuration existed.
    async fn delete_config(&self, key: &SequenceKey) -> StorageResult<bool>;
}

/// Counter storage operations.
///
/// Every write goes through [`CounterStorage::apply`], which holds an exclusive
/// lock on exactly one counter row for the read-compute-write window.
#[async_trait]
pub trait CounterStorage: Send + Sync {
    /// Read the counter without locking.
    async fn get_counter(&self, key: &SequenceKey) -> StorageResult<Option<CounterState>>;

    /// Create a zero counter for a configured sequence unless one exists.
    ///
    /// Does nothing when `key` has no configuration.
    async fn init_counter(&self, key: &SequenceKey, now: DateTime<Utc>) -> StorageResult<()>;

    /// Atomically apply `mutation` to the counter of `key`.
    ///
    /// Never creates a counter: fails with [`StorageError::Missing`] if there is
    /// none, including when it was deleted while this call waited for the lock.
    /// Waits at most the backend's configured lock timeout for the row lock and
    /// fails with [`StorageError::LockTimeout`] otherwise, leaving the counter
    /// untouched.
    ///
    /// [`StorageError::Missing`]: crate::error::StorageError::Missing
    /// [`StorageError::LockTimeout`]: crate::error::StorageError::LockTimeout
    async fn apply(
        &self,
        key: &SequenceKey,
        mutation: CounterMutation,
        now: DateTime<Utc>,
    ) -> StorageResult<CounterTransition>;
}

/// Append-only history of generated numbers and administrative actions.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Record one generated number.
    async fn record_generated(&self, number: &GeneratedNumber) -> StorageResult<()>;

    /// Record one audit entry.
    async fn record_audit(&self, entry: &AuditEntry) -> StorageResult<()>;
}

/// Combined storage trait for all storage operations.
#[async_trait]
pub trait Storage: ConfigStorage + CounterStorage + HistoryStorage {
    /// Check if the storage backend is healthy and reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend name.
    fn backend_name(&self) -> &'static str;
}

/// Bounded wait for a counter row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Give up after this long.
    pub timeout: Duration,
    /// Pause between attempts, for backends that poll.
    pub retry_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            retry_interval: Duration::from_millis(5),
        }
    }
}
