//! Audit sinks for administrative actions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::AuditEntry;
use crate::error::StorageResult;
use crate::storage::Storage;

/// Receives audit entries for resets, overrides and configuration changes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one entry.
    async fn record(&self, entry: &AuditEntry) -> StorageResult<()>;
}

/// Persists audit entries to the storage backend's audit log.
pub struct StorageAuditSink {
    storage: Arc<dyn Storage>,
}

impl StorageAuditSink {
    /// Create a sink writing to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl AuditSink for StorageAuditSink {
    async fn record(&self, entry: &AuditEntry) -> StorageResult<()> {
        self.storage.record_audit(entry).await
    }
}

/// Emits audit entries as log events only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, entry: &AuditEntry) -> StorageResult<()> {
        info!(
            action = %entry.action,
            scope_id = %entry.scope_id,
            sequence_name = %entry.sequence_name,
            old_value = ?entry.old_value,
            new_value = ?entry.new_value,
            actor = %entry.actor,
            reason = %entry.reason,
            "Audit"
        );
        Ok(())
    }
}

/// Record `entry`, logging instead of failing.
///
/// The action being audited has already been committed.
pub async fn record_best_effort(sink: &dyn AuditSink, entry: &AuditEntry) {
    if let Err(e) = sink.record(entry).await {
        metrics::counter!("sequencing_history_failures_total", "kind" => "audit").increment(1);
        warn!(
            action = %entry.action,
            scope_id = %entry.scope_id,
            sequence_name = %entry.sequence_name,
            error = %e,
            "Failed to record audit entry"
        );
    }
}
