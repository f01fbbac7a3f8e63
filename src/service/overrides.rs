//! Administrative counter changes: reset and override.

use std::sync::Arc;

use tracing::info;

use crate::domain::{AuditAction, AuditEntry, CounterTransition, SequenceKey};
use crate::error::{AppError, Result};
use crate::storage::Storage;

use super::audit::{AuditSink, record_best_effort};
use super::clock::Clock;
use super::config::{ConfigService, SYSTEM_ACTOR};
use super::counter::CounterStore;

/// Resets and overrides counters under the same row lock as generation.
///
/// Overriding does not check whether the resulting numbers were issued before.
#[derive(Clone)]
pub struct OverrideService {
    configs: ConfigService,
    counters: CounterStore,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl OverrideService {
    /// Create a new override service.
    #[must_use]
    pub fn new(
        configs: ConfigService,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configs,
            counters: CounterStore::new(storage),
            audit,
            clock,
        }
    }

    /// Return the counter of `key` to its configured base and start a new epoch.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty reason,
    /// [`AppError::SequenceNotConfigured`] for an unknown sequence and
    /// [`AppError::ConcurrencyTimeout`] if the row lock was not obtained in time.
    pub async fn reset(
        &self,
        key: &SequenceKey,
        reason: &str,
        actor: Option<String>,
    ) -> Result<CounterTransition> {
        require_reason(reason)?;
        let config = self.configs.get(key).await?;

        let now = self.clock.now();
        let transition = self.counters.reset(key, config.reset_base, now).await?;

        metrics::counter!("sequencing_resets_total", "cause" => "manual").increment(1);
        let actor = actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        info!(
            sequence = %key,
            old_value = transition.previous.counter,
            new_value = transition.current.counter,
            %actor,
            reason,
            "Counter reset"
        );

        let entry = AuditEntry::new(AuditAction::Reset, key, actor, reason, now)
            .with_values(transition.previous.counter, transition.current.counter);
        record_best_effort(self.audit.as_ref(), &entry).await;

        Ok(transition)
    }

    /// Force the counter of `key` to `value`. The next number uses `value + step`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::reset`].
    pub async fn override_value(
        &self,
        key: &SequenceKey,
        value: u64,
        reason: &str,
        actor: Option<String>,
    ) -> Result<CounterTransition> {
        require_reason(reason)?;
        self.configs.get(key).await?;

        let now = self.clock.now();
        let transition = self.counters.set(key, value, now).await?;

        metrics::counter!("sequencing_overrides_total").increment(1);
        let actor = actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        info!(
            sequence = %key,
            old_value = transition.previous.counter,
            new_value = value,
            %actor,
            reason,
            "Counter overridden"
        );

        let entry = AuditEntry::new(AuditAction::Override, key, actor, reason, now)
            .with_values(transition.previous.counter, value);
        record_best_effort(self.audit.as_ref(), &entry).await;

        Ok(transition)
    }
}

fn require_reason(reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(AppError::Validation("reason cannot be empty".to_string()));
    }
    Ok(())
}
