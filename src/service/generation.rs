//! Number generation: reset check, atomic increment, formatting.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{GeneratedNumber, GenerationContext, SequenceKey};
use crate::error::{AppError, Result};
use crate::pattern::RenderInput;
use crate::storage::Storage;

use super::clock::Clock;
use super::config::ConfigService;
use super::counter::CounterStore;
use super::validation::ValidationService;

/// Issues numbers.
#[derive(Clone)]
pub struct GenerationService {
    configs: ConfigService,
    counters: CounterStore,
    validation: ValidationService,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl GenerationService {
    /// Create a new generation service.
    #[must_use]
    pub fn new(
        configs: ConfigService,
        validation: ValidationService,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configs,
            counters: CounterStore::new(Arc::clone(&storage)),
            validation,
            storage,
            clock,
        }
    }

    /// Issue the next number of `key`.
    ///
    /// The reset decision and the increment happen under the counter's row
    /// lock, so concurrent callers see distinct counters in commit order. The
    /// pattern is compiled before the lock is taken; a compile failure consumes
    /// no value. History is written after commit and its failure is only logged.
    ///
    /// # Errors
    ///
    /// - [`AppError::SequenceNotConfigured`] for an unknown sequence without lazy creation
    /// - [`AppError::ConcurrencyTimeout`] if the row lock was not obtained in time
    /// - [`AppError::Format`] if the stored pattern no longer matches its evaluator
    pub async fn generate(
        &self,
        key: &SequenceKey,
        context: &GenerationContext,
    ) -> Result<GeneratedNumber> {
        let config = self.configs.resolve(key).await?;
        let (template, registry) = self.validation.compile(&config)?;

        let now = self.clock.now();
        let transition = self.counters.lock_and_increment(&config, now).await?;
        let counter = transition.current.counter;

        let value = registry
            .render(
                &template,
                &RenderInput {
                    counter,
                    timestamp: now,
                    context,
                    padding: config.padding,
                },
            )
            .map_err(|e| {
                warn!(sequence = %key, counter, error = %e, "Counter committed but rendering failed");
                AppError::Format(e.to_string())
            })?;

        if let Some(cause) = transition.reset {
            metrics::counter!("sequencing_resets_total", "cause" => cause.to_string()).increment(1);
            info!(sequence = %key, %cause, previous = transition.previous.counter, "Counter reset");
        }
        metrics::counter!("sequencing_generated_total", "scope" => key.scope_id.clone())
            .increment(1);

        let number = GeneratedNumber::new(key, value, counter, now, transition.reset);
        debug!(sequence = %key, value = %number.value, counter, "Number generated");

        if let Err(e) = self.storage.record_generated(&number).await {
            metrics::counter!("sequencing_history_failures_total", "kind" => "generated")
                .increment(1);
            warn!(sequence = %key, value = %number.value, error = %e, "Failed to record history");
        }

        Ok(number)
    }
}
