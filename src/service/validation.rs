//! Pattern and configuration validation.

use std::sync::Arc;

use crate::domain::SequenceConfig;
use crate::domain::config::DEFAULT_EVALUATOR;
use crate::error::{AppError, Result};
use crate::pattern::{Evaluators, PatternTemplate, VariableRegistry};

/// Validates patterns against the registered evaluators.
#[derive(Debug, Clone)]
pub struct ValidationService {
    evaluators: Arc<Evaluators>,
}

impl ValidationService {
    /// Create a validation service over `evaluators`.
    #[must_use]
    pub const fn new(evaluators: Arc<Evaluators>) -> Self {
        Self { evaluators }
    }

    /// Parse `pattern` and check every variable against the default evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidPattern`] for syntax errors, unknown variables
    /// and out-of-range options.
    pub fn validate_pattern(&self, pattern: &str) -> Result<PatternTemplate> {
        self.validate_pattern_with(pattern, DEFAULT_EVALUATOR)
    }

    /// Parse `pattern` and check every variable against the named evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an unknown evaluator and
    /// [`AppError::InvalidPattern`] for a bad pattern.
    pub fn validate_pattern_with(&self, pattern: &str, evaluator: &str) -> Result<PatternTemplate> {
        let registry = self.evaluators.get(evaluator).ok_or_else(|| {
            AppError::Validation(format!("unknown evaluator '{evaluator}'"))
        })?;
        let template =
            PatternTemplate::parse(pattern).map_err(|e| AppError::InvalidPattern(e.to_string()))?;
        registry
            .check(&template)
            .map_err(|e| AppError::InvalidPattern(e.to_string()))?;
        Ok(template)
    }

    /// Validate every field of `config`, including its pattern.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for bad fields and
    /// [`AppError::InvalidPattern`] for a bad pattern or one without `{COUNTER}`.
    pub fn validate_config(&self, config: &SequenceConfig) -> Result<PatternTemplate> {
        config.validate_fields().map_err(AppError::Validation)?;

        let template = self.validate_pattern_with(&config.pattern, &config.evaluator)?;
        if !template.has_counter() {
            return Err(AppError::InvalidPattern(
                "pattern must contain {COUNTER}".to_string(),
            ));
        }
        Ok(template)
    }

    /// Compile a stored configuration for rendering.
    ///
    /// Stored configurations were validated when saved, so any failure here is a
    /// registry/pattern mismatch inside the service rather than a caller error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Format`].
    pub fn compile(&self, config: &SequenceConfig) -> Result<(PatternTemplate, Arc<VariableRegistry>)> {
        let registry = self.evaluators.get(&config.evaluator).ok_or_else(|| {
            AppError::Format(format!(
                "evaluator '{}' of '{}' is not registered",
                config.evaluator,
                config.key()
            ))
        })?;
        let template = PatternTemplate::parse(&config.pattern)
            .and_then(|t| registry.check(&t).map(|()| t))
            .map_err(|e| AppError::Format(format!("stored pattern of '{}': {e}", config.key())))?;
        Ok((template, registry))
    }
}
