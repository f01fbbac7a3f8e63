//! The sequence engine: one entry point for every sequence operation.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::domain::{
    CounterTransition, GeneratedNumber, GenerationContext, PreviewResponse, SequenceConfig,
    SequenceKey, SequenceStateResponse, UpsertConfigRequest,
};
use crate::error::Result;
use crate::pattern::{Evaluators, PatternTemplate};
use crate::storage::Storage;

use super::audit::{AuditSink, StorageAuditSink};
use super::clock::{Clock, SystemClock};
use super::config::ConfigService;
use super::generation::GenerationService;
use super::overrides::OverrideService;
use super::preview::PreviewService;
use super::validation::ValidationService;

/// Facade over the configuration, generation, preview and override services.
///
/// Cheap to clone; holds no counter state of its own.
#[derive(Clone)]
pub struct SequenceEngine {
    storage: Arc<dyn Storage>,
    validation: ValidationService,
    configs: ConfigService,
    generation: GenerationService,
    preview: PreviewService,
    overrides: OverrideService,
}

/// Builder for [`SequenceEngine`].
pub struct SequenceEngineBuilder {
    storage: Arc<dyn Storage>,
    engine: EngineConfig,
    evaluators: Evaluators,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SequenceEngineBuilder {
    /// Engine settings (lazy creation and its defaults).
    #[must_use]
    pub fn engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Variable registries available to sequences.
    #[must_use]
    pub fn evaluators(mut self, evaluators: Evaluators) -> Self {
        self.evaluators = evaluators;
        self
    }

    /// Time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Audit sink; defaults to the storage backend's audit log.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Wire up the services.
    #[must_use]
    pub fn build(self) -> SequenceEngine {
        let storage = self.storage;
        let clock = self.clock;
        let audit: Arc<dyn AuditSink> = match self.audit {
            Some(audit) => audit,
            None => Arc::new(StorageAuditSink::new(Arc::clone(&storage))),
        };

        let validation = ValidationService::new(Arc::new(self.evaluators));
        let configs = ConfigService::new(
            Arc::clone(&storage),
            validation.clone(),
            Arc::clone(&clock),
            Arc::clone(&audit),
            self.engine,
        );
        let generation = GenerationService::new(
            configs.clone(),
            validation.clone(),
            Arc::clone(&storage),
            Arc::clone(&clock),
        );
        let preview = PreviewService::new(
            configs.clone(),
            validation.clone(),
            Arc::clone(&storage),
            Arc::clone(&clock),
        );
        let overrides = OverrideService::new(configs.clone(), Arc::clone(&storage), audit, clock);

        SequenceEngine {
            storage,
            validation,
            configs,
            generation,
            preview,
            overrides,
        }
    }
}

impl SequenceEngine {
    /// Start building an engine over `storage`.
    #[must_use]
    pub fn builder(storage: Arc<dyn Storage>) -> SequenceEngineBuilder {
        SequenceEngineBuilder {
            storage,
            engine: EngineConfig::default(),
            evaluators: Evaluators::default(),
            clock: Arc::new(SystemClock),
            audit: None,
        }
    }

    /// Issue the next number of a sequence.
    ///
    /// # Errors
    ///
    /// See [`GenerationService::generate`].
    pub async fn generate(
        &self,
        key: &SequenceKey,
        context: &GenerationContext,
    ) -> Result<GeneratedNumber> {
        self.generation.generate(key, context).await
    }

    /// Preview the next number without consuming it.
    ///
    /// # Errors
    ///
    /// See [`PreviewService::preview`].
    pub async fn preview(
        &self,
        key: &SequenceKey,
        context: &GenerationContext,
    ) -> Result<PreviewResponse> {
        self.preview.preview(key, context).await
    }

    /// Create or replace a sequence configuration.
    ///
    /// # Errors
    ///
    /// See [`ConfigService::create_or_update`].
    pub async fn create_or_update_config(
        &self,
        key: &SequenceKey,
        request: UpsertConfigRequest,
    ) -> Result<SequenceConfig> {
        self.configs.create_or_update(key, request).await
    }

    /// Configuration of a sequence.
    ///
    /// # Errors
    ///
    /// See [`ConfigService::get`].
    pub async fn get_config(&self, key: &SequenceKey) -> Result<SequenceConfig> {
        self.configs.get(key).await
    }

    /// All configurations of a scope.
    ///
    /// # Errors
    ///
    /// See [`ConfigService::list`].
    pub async fn list_configs(&self, scope_id: &str) -> Result<Vec<SequenceConfig>> {
        self.configs.list(scope_id).await
    }

    /// Delete a sequence and its counter.
    ///
    /// # Errors
    ///
    /// See [`ConfigService::delete`].
    pub async fn delete_config(&self, key: &SequenceKey, actor: Option<String>) -> Result<()> {
        self.configs.delete(key, actor).await
    }

    /// Current counter and reset status.
    ///
    /// # Errors
    ///
    /// See [`PreviewService::state`].
    pub async fn state(&self, key: &SequenceKey) -> Result<SequenceStateResponse> {
        self.preview.state(key).await
    }

    /// Reset a counter to its base.
    ///
    /// # Errors
    ///
    /// See [`OverrideService::reset`].
    pub async fn reset(
        &self,
        key: &SequenceKey,
        reason: &str,
        actor: Option<String>,
    ) -> Result<CounterTransition> {
        self.overrides.reset(key, reason, actor).await
    }

    /// Force a counter to a value.
    ///
    /// # Errors
    ///
    /// See [`OverrideService::override_value`].
    pub async fn override_value(
        &self,
        key: &SequenceKey,
        value: u64,
        reason: &str,
        actor: Option<String>,
    ) -> Result<CounterTransition> {
        self.overrides.override_value(key, value, reason, actor).await
    }

    /// Validate a pattern against the default evaluator.
    ///
    /// # Errors
    ///
    /// See [`ValidationService::validate_pattern`].
    pub fn validate_pattern(&self, pattern: &str) -> Result<PatternTemplate> {
        self.validation.validate_pattern(pattern)
    }

    /// The storage backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}
