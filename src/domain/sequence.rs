//! Counter state, counter mutations and generated numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reset_policy::ResetPolicy;
use super::{ResetPeriod, SequenceConfig, SequenceKey};

/// Persistent counter state of one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Last committed counter value.
    pub counter: u64,

    /// When the counter was last written.
    pub updated_at: DateTime<Utc>,

    /// When the counter was last reset, if ever.
    pub last_reset_at: Option<DateTime<Utc>>,
}

impl CounterState {
    /// Zero-initialized state as of `now`.
    #[must_use]
    pub const fn initial(now: DateTime<Utc>) -> Self {
        Self {
            counter: 0,
            updated_at: now,
            last_reset_at: None,
        }
    }

    /// Whether the counter has neither issued a value nor been reset.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        self.counter == 0 && self.last_reset_at.is_none()
    }

    /// Start of the current epoch, as far as the stored state can tell.
    #[must_use]
    pub fn epoch_started_at(&self) -> DateTime<Utc> {
        self.last_reset_at.unwrap_or(self.updated_at)
    }
}

/// Why a counter was returned to its base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    /// The reset period rolled over.
    Time,
    /// The next value would have passed `reset_limit`.
    Count,
    /// An administrator asked for it.
    Manual,
}

impl std::fmt::Display for ResetCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Count => write!(f, "count"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// The parts of a [`SequenceConfig`] that govern how a counter advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceRule {
    /// Amount added per generation.
    pub step_size: u64,
    /// Value a reset returns to.
    pub reset_base: u64,
    /// Time-based reset period.
    pub reset_period: ResetPeriod,
    /// Count-based reset limit.
    pub reset_limit: Option<u64>,
}

impl From<&SequenceConfig> for AdvanceRule {
    fn from(config: &SequenceConfig) -> Self {
        Self {
            step_size: config.step_size,
            reset_base: config.reset_base,
            reset_period: config.reset_period,
            reset_limit: config.reset_limit,
        }
    }
}

/// A change to a counter, applied while the counter's row lock is held.
///
/// Storage backends read the locked state, call [`CounterMutation::apply`], and
/// persist the result before releasing the lock. Keeping the arithmetic here
/// means every backend resets and increments identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMutation {
    /// Apply any due reset, then add the step.
    Advance(AdvanceRule),
    /// Return the counter to `base` and start a new epoch.
    Reset {
        /// Value to reset to.
        base: u64,
    },
    /// Force the counter to `value` without starting a new epoch.
    Set {
        /// New counter value.
        value: u64,
    },
}

/// Raised when advancing would overflow the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("counter overflow")]
pub struct CounterOverflow;

/// Result of applying a [`CounterMutation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterTransition {
    /// State before the mutation.
    pub previous: CounterState,
    /// State after the mutation.
    pub current: CounterState,
    /// Reset that happened as part of the mutation, if any.
    pub reset: Option<ResetCause>,
}

impl CounterMutation {
    /// Compute the state after this mutation of the locked state `previous`.
    ///
    /// There is no variant that creates a counter: a missing row means the
    /// sequence is not configured, and backends report that instead of calling
    /// this.
    ///
    /// # Errors
    ///
    /// Returns [`CounterOverflow`] if advancing would exceed `u64::MAX`.
    pub fn apply(
        &self,
        previous: &CounterState,
        now: DateTime<Utc>,
    ) -> Result<CounterTransition, CounterOverflow> {
        let previous = *previous;
        let (current, reset) = match *self {
            Self::Advance(rule) => {
                let reset = ResetPolicy::decide(&previous, &rule, now);
                let start = if reset.is_some() {
                    rule.reset_base
                } else {
                    previous.counter
                };
                let counter = start.checked_add(rule.step_size).ok_or(CounterOverflow)?;
                let last_reset_at = if reset.is_some() {
                    Some(now)
                } else {
                    previous.last_reset_at
                };
                (
                    CounterState {
                        counter,
                        updated_at: now,
                        last_reset_at,
                    },
                    reset,
                )
            }
            Self::Reset { base } => (
                CounterState {
                    counter: base,
                    updated_at: now,
                    last_reset_at: Some(now),
                },
                Some(ResetCause::Manual),
            ),
            Self::Set { value } => (
                CounterState {
                    counter: value,
                    updated_at: now,
                    last_reset_at: previous.last_reset_at,
                },
                None,
            ),
        };

        Ok(CounterTransition {
            previous,
            current,
            reset,
        })
    }
}

/// Metadata attached to a generated number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Scope the number was issued in.
    pub scope_id: String,
    /// Sequence that issued it.
    pub sequence_name: String,
    /// Reset applied just before this number, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetCause>,
}

/// An issued identifier. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedNumber {
    /// Unique id of this issuance (history row id).
    pub id: Uuid,
    /// Formatted identifier.
    pub value: String,
    /// Counter value that produced it.
    pub counter: u64,
    /// When it was generated.
    pub generated_at: DateTime<Utc>,
    /// Where it came from.
    pub metadata: GenerationMetadata,
}

impl GeneratedNumber {
    /// Create a generated number for `key`.
    #[must_use]
    pub fn new(
        key: &SequenceKey,
        value: String,
        counter: u64,
        generated_at: DateTime<Utc>,
        reset: Option<ResetCause>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            value,
            counter,
            generated_at,
            metadata: GenerationMetadata {
                scope_id: key.scope_id.clone(),
                sequence_name: key.sequence_name.clone(),
                reset,
            },
        }
    }
}
