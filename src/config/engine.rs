//! Sequence engine configuration.

use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

use crate::domain::config::{DEFAULT_EVALUATOR, MAX_PADDING, MIN_PADDING};
use crate::storage::LockSettings;

/// Sequence engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Longest wait for a counter row lock, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Pause between lock attempts for polling backends, in milliseconds.
    #[serde(default = "default_lock_retry_interval_ms")]
    pub lock_retry_interval_ms: u64,

    /// Create a default configuration on first generate of an unknown sequence.
    #[serde(default)]
    pub lazy_create: bool,

    /// Pattern of lazily created sequences.
    #[serde(default = "default_pattern")]
    pub default_pattern: String,

    /// Padding of lazily created sequences.
    #[serde(default = "default_padding")]
    pub default_padding: u8,

    /// Evaluator of lazily created sequences.
    #[serde(default = "default_evaluator")]
    pub default_evaluator: String,
}

const fn default_lock_timeout_ms() -> u64 {
    5000
}

const fn default_lock_retry_interval_ms() -> u64 {
    5
}

fn default_pattern() -> String {
    "{COUNTER}".to_string()
}

const fn default_padding() -> u8 {
    6
}

fn default_evaluator() -> String {
    DEFAULT_EVALUATOR.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_retry_interval_ms: default_lock_retry_interval_ms(),
            lazy_create: false,
            default_pattern: default_pattern(),
            default_padding: default_padding(),
            default_evaluator: default_evaluator(),
        }
    }
}

impl EngineConfig {
    /// Row lock wait settings for the storage backend.
    #[must_use]
    pub const fn lock_settings(&self) -> LockSettings {
        LockSettings {
            timeout: Duration::from_millis(self.lock_timeout_ms),
            retry_interval: Duration::from_millis(self.lock_retry_interval_ms),
        }
    }

    /// Validate the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is zero or the default padding is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "engine.lock_timeout_ms cannot be 0".to_string(),
            ));
        }
        if self.lock_retry_interval_ms == 0 {
            return Err(ConfigError::Message(
                "engine.lock_retry_interval_ms cannot be 0".to_string(),
            ));
        }
        if !(MIN_PADDING..=MAX_PADDING).contains(&self.default_padding) {
            return Err(ConfigError::Message(format!(
                "engine.default_padding must be between {MIN_PADDING} and {MAX_PADDING}"
            )));
        }
        if self.default_pattern.is_empty() {
            return Err(ConfigError::Message(
                "engine.default_pattern cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.lock_timeout_ms, 5000);
        assert!(!config.lazy_create);
        assert_eq!(config.default_pattern, "{COUNTER}");
        assert!(config.validate().is_ok());

        let lock = config.lock_settings();
        assert_eq!(lock.timeout, Duration::from_secs(5));
        assert_eq!(lock.retry_interval, Duration::from_millis(5));
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.lock_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.default_padding = 11;
        assert!(config.validate().is_err());
    }
}
