//! Reset policy: a pure decision over (counter state, config, now).
//!
//! Two orthogonal rules can return a counter to its base:
//!
//! - **time**: the calendar day/month/year (UTC) of `now` is later than that of
//!   the start of the current epoch (`last_reset_at`, or `updated_at` for a
//!   counter that was never reset). A counter that has never issued a value is
//!   never due;
//! - **count**: adding the step would take the counter past `reset_limit`.
//!
//! When both apply on the same call the time rule is reported.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::{
    AdvanceRule, CounterState, ResetCause, ResetInfo, ResetPeriod, ResetType, SequenceConfig,
};

/// Whether the count reset fires on the call that would reach the limit exactly.
///
/// `false`: the counter may equal `reset_limit`; the reset fires on the call that
/// would exceed it.
pub const COUNT_RESET_INCLUSIVE: bool = false;

/// Reset decision functions. Stateless.
pub struct ResetPolicy;

impl ResetPolicy {
    /// Which reset, if any, the next advance of `state` under `rule` performs at `now`.
    #[must_use]
    pub fn decide(state: &CounterState, rule: &AdvanceRule, now: DateTime<Utc>) -> Option<ResetCause> {
        if Self::time_reset_due(state, rule.reset_period, now) {
            return Some(ResetCause::Time);
        }
        if Self::count_reset_due(state, rule) {
            return Some(ResetCause::Count);
        }
        None
    }

    /// [`Self::decide`] for a full configuration.
    #[must_use]
    pub fn evaluate(state: &CounterState, config: &SequenceConfig, now: DateTime<Utc>) -> Option<ResetCause> {
        Self::decide(state, &AdvanceRule::from(config), now)
    }

    /// Whether `now` lies in a later period than the start of the current epoch.
    #[must_use]
    pub fn time_reset_due(state: &CounterState, period: ResetPeriod, now: DateTime<Utc>) -> bool {
        if state.is_fresh() {
            return false;
        }
        let since = state.epoch_started_at();
        match period {
            ResetPeriod::Never => false,
            ResetPeriod::Daily => since.date_naive() < now.date_naive(),
            ResetPeriod::Monthly => (since.year(), since.month()) < (now.year(), now.month()),
            ResetPeriod::Yearly => since.year() < now.year(),
        }
    }

    /// Whether adding the step would cross `reset_limit`.
    #[must_use]
    pub fn count_reset_due(state: &CounterState, rule: &AdvanceRule) -> bool {
        let Some(limit) = rule.reset_limit else {
            return false;
        };
        match state.counter.checked_add(rule.step_size) {
            Some(next) if COUNT_RESET_INCLUSIVE => next >= limit,
            Some(next) => next > limit,
            None => true,
        }
    }

    /// Values left before the count limit: `max(limit - counter, 0)`.
    #[must_use]
    pub fn remaining_count(state: &CounterState, config: &SequenceConfig) -> Option<u64> {
        config
            .reset_limit
            .map(|limit| limit.saturating_sub(state.counter))
    }

    /// Whether the next generation at `now` would reset first.
    #[must_use]
    pub fn will_reset_next(state: &CounterState, config: &SequenceConfig, now: DateTime<Utc>) -> bool {
        Self::evaluate(state, config, now).is_some()
    }

    /// Start (UTC midnight) of the period after the one containing `now`.
    #[must_use]
    pub fn next_reset_date(period: ResetPeriod, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let next: NaiveDate = match period {
            ResetPeriod::Never => return None,
            ResetPeriod::Daily => today.succ_opt()?,
            ResetPeriod::Monthly => {
                if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
                }
            }
            ResetPeriod::Yearly => NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
        };
        Some(next.and_hms_opt(0, 0, 0)?.and_utc())
    }

    /// Which reset rules a configuration has.
    #[must_use]
    pub const fn reset_type(config: &SequenceConfig) -> ResetType {
        let timed = !matches!(config.reset_period, ResetPeriod::Never);
        match (timed, config.reset_limit.is_some()) {
            (false, false) => ResetType::None,
            (true, false) => ResetType::Time,
            (false, true) => ResetType::Count,
            (true, true) => ResetType::Both,
        }
    }

    /// Full reset status of a sequence.
    #[must_use]
    pub fn reset_info(state: &CounterState, config: &SequenceConfig, now: DateTime<Utc>) -> ResetInfo {
        ResetInfo {
            reset_type: Self::reset_type(config),
            period: config.reset_period,
            limit: config.reset_limit,
            remaining_count: Self::remaining_count(state, config),
            next_reset_date: Self::next_reset_date(config.reset_period, now),
            will_reset_next: Self::will_reset_next(state, config, now),
        }
    }
}
