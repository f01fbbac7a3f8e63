//! Read-only preview of the next number.
//!
//! A preview runs the same reset and increment arithmetic as generation against
//! an unlocked snapshot of the counter and writes nothing. It is advisory: a
//! concurrent generate can make the real next number differ.

use std::sync::Arc;

use crate::domain::{
    AdvanceRule, CounterMutation, CounterState, GenerationContext, PreviewResponse, ResetPolicy,
    SequenceConfig, SequenceKey, SequenceStateResponse,
};
use crate::error::{AppError, Result};
use crate::pattern::RenderInput;
use crate::storage::Storage;

use super::clock::Clock;
use super::config::ConfigService;
use super::counter::CounterStore;
use super::validation::ValidationService;

/// Computes what the next generation would return.
#[derive(Clone)]
pub struct PreviewService {
    configs: ConfigService,
    counters: CounterStore,
    validation: ValidationService,
    clock: Arc<dyn Clock>,
}

impl PreviewService {
    /// Create a new preview service.
    #[must_use]
    pub fn new(
        configs: ConfigService,
        validation: ValidationService,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configs,
            counters: CounterStore::new(storage),
            validation,
            clock,
        }
    }

    /// Configuration to preview against; the would-be default under lazy creation.
    async fn config_for(&self, key: &SequenceKey) -> Result<SequenceConfig> {
        match self.configs.find(key).await? {
            Some(config) => Ok(config),
            None if self.configs.lazy_create() => Ok(self.configs.default_for(key)),
            None => Err(AppError::SequenceNotConfigured(key.to_string())),
        }
    }

    /// Preview the next number of `key` without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SequenceNotConfigured`] for an unknown sequence without
    /// lazy creation, and [`AppError::SequenceExhausted`] if the next value would
    /// overflow.
    pub async fn preview(
        &self,
        key: &SequenceKey,
        context: &GenerationContext,
    ) -> Result<PreviewResponse> {
        let config = self.config_for(key).await?;
        let (template, registry) = self.validation.compile(&config)?;

        let now = self.clock.now();
        let snapshot = self
            .counters
            .find(key)
            .await?
            .unwrap_or_else(|| CounterState::initial(now));
        let transition = CounterMutation::Advance(AdvanceRule::from(&config))
            .apply(&snapshot, now)
            .map_err(|_| AppError::SequenceExhausted(key.to_string()))?;

        let formatted = registry
            .render(
                &template,
                &RenderInput {
                    counter: transition.current.counter,
                    timestamp: now,
                    context,
                    padding: config.padding,
                },
            )
            .map_err(|e| AppError::Format(e.to_string()))?;

        Ok(PreviewResponse {
            formatted,
            current_value: transition.previous.counter,
            next_value: transition.current.counter,
            step_size: config.step_size,
            reset_info: ResetPolicy::reset_info(&transition.previous, &config, now),
        })
    }

    /// Current counter and reset status of a configured sequence.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SequenceNotConfigured`] for an unknown sequence.
    pub async fn state(&self, key: &SequenceKey) -> Result<SequenceStateResponse> {
        let config = self.configs.get(key).await?;
        let now = self.clock.now();
        let state: CounterState = self.counters.get_current_state(key, now).await;

        Ok(SequenceStateResponse {
            scope_id: key.scope_id.clone(),
            sequence_name: key.sequence_name.clone(),
            current_value: state.counter,
            updated_at: state.updated_at,
            last_reset_at: state.last_reset_at,
            reset_info: ResetPolicy::reset_info(&state, &config, now),
        })
    }
}
