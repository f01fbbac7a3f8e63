//! Storage backend factory.
//!
//! Creates the appropriate storage backend based on configuration.

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::AppError;
use crate::storage::file::FileStorage;
use crate::storage::postgres::PgStorage;
use crate::storage::traits::{LockSettings, Storage};

/// Create a storage backend based on configuration.
///
/// # Arguments
///
/// * `config` - Storage configuration
/// * `lock` - Bounded wait for counter row locks
///
/// # Returns
///
/// An `Arc<dyn Storage>` pointing to the configured storage backend.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be initialized.
pub async fn create_storage(
    config: &StorageConfig,
    lock: LockSettings,
) -> Result<Arc<dyn Storage>, AppError> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::File => Arc::new(FileStorage::new(&config.file, lock)?),
        StorageBackend::PostgreSQL => Arc::new(PgStorage::connect(&config.postgresql, lock).await?),
    };

    // Verify storage is healthy
    storage.health_check().await?;

    Ok(storage)
}
