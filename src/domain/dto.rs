//! Data Transfer Objects for API requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CounterTransition, GenerationContext, ResetPeriod, SequenceConfig};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (0 = success, non-zero = error).
    pub code: i32,

    /// Human-readable message.
    pub message: String,

    /// Response data (null on error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a success response.
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// Create an error response.
    pub fn error(code: i32, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// Create a success response with no data.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: None,
        }
    }
}

/// Request body for creating or updating a sequence configuration.
///
/// Omitted optional fields take the same defaults as a new configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertConfigRequest {
    /// Pattern string.
    pub pattern: String,

    /// Time-based reset period.
    #[serde(default)]
    pub reset_period: ResetPeriod,

    /// `{COUNTER}` padding width.
    #[serde(default)]
    pub padding: Option<u8>,

    /// Step per generation.
    #[serde(default)]
    pub step_size: Option<u64>,

    /// Count-based reset limit.
    #[serde(default)]
    pub reset_limit: Option<u64>,

    /// Value a reset returns to.
    #[serde(default)]
    pub reset_base: Option<u64>,

    /// Evaluator (variable registry) name.
    #[serde(default)]
    pub evaluator: Option<String>,

    /// Who is making the change.
    #[serde(default)]
    pub actor: Option<String>,
}

/// Request body for generate and preview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Values available to the pattern for this call only.
    #[serde(default)]
    pub context: GenerationContext,
}

/// Request body for an administrative reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    /// Why the reset is happening.
    pub reason: String,

    /// Who is resetting.
    #[serde(default)]
    pub actor: Option<String>,
}

/// Request body for an administrative override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Counter value to force.
    pub value: u64,

    /// Why the override is happening.
    pub reason: String,

    /// Who is overriding.
    #[serde(default)]
    pub actor: Option<String>,
}

/// Which reset rules a sequence has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetType {
    /// No reset rule.
    None,
    /// Time-based only.
    Time,
    /// Count-based only.
    Count,
    /// Both time- and count-based.
    Both,
}

/// Reset status of a sequence, derived from its config and counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetInfo {
    /// Which reset rules apply.
    #[serde(rename = "type")]
    pub reset_type: ResetType,

    /// Time-based period.
    pub period: ResetPeriod,

    /// Count-based limit.
    pub limit: Option<u64>,

    /// Values left before the count-based reset.
    pub remaining_count: Option<u64>,

    /// Start of the next time-based period.
    pub next_reset_date: Option<DateTime<Utc>>,

    /// Whether the next generation will reset first.
    pub will_reset_next: bool,
}

/// Non-mutating preview of the next generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// What the next number would look like.
    pub formatted: String,

    /// Counter as currently stored.
    pub current_value: u64,

    /// Counter the next generation would commit.
    pub next_value: u64,

    /// Step per generation.
    pub step_size: u64,

    /// Reset status.
    pub reset_info: ResetInfo,
}

/// Current counter state of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStateResponse {
    /// Scope of the sequence.
    pub scope_id: String,

    /// Sequence name.
    pub sequence_name: String,

    /// Counter as currently stored (0 if never generated).
    pub current_value: u64,

    /// When the counter was last written.
    pub updated_at: DateTime<Utc>,

    /// When the counter was last reset.
    pub last_reset_at: Option<DateTime<Utc>>,

    /// Reset status.
    pub reset_info: ResetInfo,
}

/// Counter values before and after a reset or override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterChangeResponse {
    /// Counter before the change.
    pub old_value: u64,

    /// Counter after the change.
    pub new_value: u64,
}

impl From<CounterTransition> for CounterChangeResponse {
    fn from(transition: CounterTransition) -> Self {
        Self {
            old_value: transition.previous.counter,
            new_value: transition.current.counter,
        }
    }
}

/// Summary of one configured sequence in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    /// Sequence name.
    pub sequence_name: String,

    /// Pattern string.
    pub pattern: String,

    /// Time-based reset period.
    pub reset_period: ResetPeriod,
}

impl From<&SequenceConfig> for ConfigSummary {
    fn from(config: &SequenceConfig) -> Self {
        Self {
            sequence_name: config.sequence_name.clone(),
            pattern: config.pattern.clone(),
            reset_period: config.reset_period,
        }
    }
}

/// Response for listing configurations of a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfigResponse {
    /// Scope listed.
    pub scope_id: String,

    /// Sequences in the scope, sorted by name.
    pub items: Vec<ConfigSummary>,
}
