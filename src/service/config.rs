//! Sequence configuration management.

use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::domain::{AuditAction, AuditEntry, SequenceConfig, SequenceKey, UpsertConfigRequest};
use crate::domain::config::validate_identifier;
use crate::error::{AppError, Result};
use crate::storage::Storage;

use super::audit::{AuditSink, record_best_effort};
use super::clock::Clock;
use super::counter::CounterStore;
use super::validation::ValidationService;

/// Actor recorded when a request names none.
pub const SYSTEM_ACTOR: &str = "system";

/// Create, read, list and delete sequence configurations.
#[derive(Clone)]
pub struct ConfigService {
    storage: Arc<dyn Storage>,
    counters: CounterStore,
    validation: ValidationService,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    engine: EngineConfig,
}

impl ConfigService {
    /// Create a new config service.
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        validation: ValidationService,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
        engine: EngineConfig,
    ) -> Self {
        Self {
            counters: CounterStore::new(Arc::clone(&storage)),
            storage,
            validation,
            clock,
            audit,
            engine,
        }
    }

    /// Create or replace the configuration of `key`.
    ///
    /// The pattern and fields are validated before anything is written. Creation
    /// is an insert-if-absent, so of concurrent first writers exactly one creates
    /// and the others update, keeping its `created_at`. The counter is created at
    /// zero for a new sequence and kept for an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidPattern`] or [`AppError::Validation`] for bad
    /// input, or a storage error.
    pub async fn create_or_update(
        &self,
        key: &SequenceKey,
        request: UpsertConfigRequest,
    ) -> Result<SequenceConfig> {
        let now = self.clock.now();
        let mut config = SequenceConfig::new(key, request.pattern, now);
        config.reset_period = request.reset_period;
        config.reset_limit = request.reset_limit;
        if let Some(reset_base) = request.reset_base {
            config.reset_base = reset_base;
        }
        if let Some(padding) = request.padding {
            config.padding = padding;
        }
        if let Some(step_size) = request.step_size {
            config.step_size = step_size;
        }
        if let Some(evaluator) = request.evaluator {
            config.evaluator = evaluator;
        }

        self.validation.validate_config(&config)?;

        let created = match self.storage.insert_config_if_absent(&config).await? {
            None => true,
            Some(existing) => {
                config.created_at = existing.created_at;
                self.storage.save_config(&config).await?;
                false
            }
        };
        self.counters.ensure(key, now).await?;

        info!(
            sequence = %key,
            pattern = %config.pattern,
            reset_period = %config.reset_period,
            created,
            "Sequence configured"
        );

        let actor = request.actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        let reason = if created { "created" } else { "updated" };
        let entry = AuditEntry::new(AuditAction::ConfigUpserted, key, actor, reason, now);
        record_best_effort(self.audit.as_ref(), &entry).await;

        Ok(config)
    }

    /// Configuration of `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read.
    pub async fn find(&self, key: &SequenceKey) -> Result<Option<SequenceConfig>> {
        Ok(self.storage.get_config(key).await?)
    }

    /// Configuration of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SequenceNotConfigured`] if there is none.
    pub async fn get(&self, key: &SequenceKey) -> Result<SequenceConfig> {
        self.find(key)
            .await?
            .ok_or_else(|| AppError::SequenceNotConfigured(key.to_string()))
    }

    /// All configurations of a scope, sorted by sequence name.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a malformed scope id.
    pub async fn list(&self, scope_id: &str) -> Result<Vec<SequenceConfig>> {
        validate_identifier("scope_id", scope_id).map_err(AppError::Validation)?;
        Ok(self.storage.list_configs(scope_id).await?)
    }

    /// Delete the configuration and counter of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SequenceNotConfigured`] if there was nothing to delete.
    pub async fn delete(&self, key: &SequenceKey, actor: Option<String>) -> Result<()> {
        if !self.storage.delete_config(key).await? {
            return Err(AppError::SequenceNotConfigured(key.to_string()));
        }

        info!(sequence = %key, "Sequence deleted");

        let actor = actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        let entry = AuditEntry::new(AuditAction::ConfigDeleted, key, actor, "deleted", self.clock.now());
        record_best_effort(self.audit.as_ref(), &entry).await;
        Ok(())
    }

    /// Whether unknown sequences are created on first generate.
    #[must_use]
    pub const fn lazy_create(&self) -> bool {
        self.engine.lazy_create
    }

    /// The configuration a lazily created sequence would get.
    #[must_use]
    pub fn default_for(&self, key: &SequenceKey) -> SequenceConfig {
        let mut config = SequenceConfig::new(key, self.engine.default_pattern.clone(), self.clock.now());
        config.padding = self.engine.default_padding;
        config.evaluator.clone_from(&self.engine.default_evaluator);
        config
    }

    /// Configuration of `key`, creating the default one if lazy creation is on.
    ///
    /// Creation is an insert-if-absent: concurrent first callers all end up with
    /// the same stored configuration and counter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SequenceNotConfigured`] if absent and lazy creation is off.
    pub async fn resolve(&self, key: &SequenceKey) -> Result<SequenceConfig> {
        if let Some(config) = self.find(key).await? {
            return Ok(config);
        }
        if !self.engine.lazy_create {
            return Err(AppError::SequenceNotConfigured(key.to_string()));
        }

        let candidate = self.default_for(key);
        self.validation.validate_config(&candidate)?;

        let stored = match self.storage.insert_config_if_absent(&candidate).await? {
            None => {
                info!(sequence = %key, pattern = %candidate.pattern, "Sequence created on first use");
                candidate
            }
            Some(existing) => existing,
        };
        self.counters.ensure(key, self.clock.now()).await?;
        Ok(stored)
    }
}
