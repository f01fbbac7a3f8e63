//! Counter store: the only path to counter state.
//!
//! Counter values are never cached in process; every read goes to storage and
//! every write is one locked read-modify-write on a single counter row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{AdvanceRule, CounterMutation, CounterState, CounterTransition, SequenceConfig, SequenceKey};
use crate::error::{Result, StorageError, StorageResult};
use crate::storage::Storage;

/// Atomic access to persisted counters.
#[derive(Clone)]
pub struct CounterStore {
    storage: Arc<dyn Storage>,
}

impl CounterStore {
    /// Create a counter store over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Stored counter state, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read.
    pub async fn find(&self, key: &SequenceKey) -> Result<Option<CounterState>> {
        Ok(self.storage.get_counter(key).await?)
    }

    /// Stored counter state, or a zero state if absent or unreadable.
    pub async fn get_current_state(&self, key: &SequenceKey, now: DateTime<Utc>) -> CounterState {
        match self.storage.get_counter(key).await {
            Ok(Some(state)) => state,
            Ok(None) => CounterState::initial(now),
            Err(e) => {
                warn!(sequence = %key, error = %e, "Counter read failed, reporting zero state");
                CounterState::initial(now)
            }
        }
    }

    /// Create a zero counter for `key` unless one exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend write fails.
    pub async fn ensure(&self, key: &SequenceKey, now: DateTime<Utc>) -> Result<()> {
        Ok(self.storage.init_counter(key, now).await?)
    }

    /// Apply any due reset and add the step, as one locked unit.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConcurrencyTimeout`] if the row lock is not obtained in
    /// time (no value consumed) and [`AppError::SequenceExhausted`] on overflow.
    ///
    /// [`AppError::ConcurrencyTimeout`]: crate::error::AppError::ConcurrencyTimeout
    /// [`AppError::SequenceExhausted`]: crate::error::AppError::SequenceExhausted
    pub async fn lock_and_increment(
        &self,
        config: &SequenceConfig,
        now: DateTime<Utc>,
    ) -> Result<CounterTransition> {
        let key = config.key();
        let mutation = CounterMutation::Advance(AdvanceRule::from(config));
        self.apply(&key, mutation, now).await
    }

    /// Return the counter to `base` and start a new epoch.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lock_and_increment`].
    pub async fn reset(
        &self,
        key: &SequenceKey,
        base: u64,
        now: DateTime<Utc>,
    ) -> Result<CounterTransition> {
        self.apply(key, CounterMutation::Reset { base }, now).await
    }

    /// Force the counter to `value`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lock_and_increment`].
    pub async fn set(
        &self,
        key: &SequenceKey,
        value: u64,
        now: DateTime<Utc>,
    ) -> Result<CounterTransition> {
        self.apply(key, CounterMutation::Set { value }, now).await
    }

    async fn apply(
        &self,
        key: &SequenceKey,
        mutation: CounterMutation,
        now: DateTime<Utc>,
    ) -> Result<CounterTransition> {
        let result: StorageResult<CounterTransition> = self.storage.apply(key, mutation, now).await;
        if let Err(StorageError::LockTimeout(reason)) = &result {
            metrics::counter!("sequencing_lock_timeouts_total").increment(1);
            warn!(sequence = %key, %reason, "Counter lock timed out");
        }
        Ok(result?)
    }
}
