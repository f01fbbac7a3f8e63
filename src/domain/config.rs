//! Sequence configuration types.
//!
//! A sequence is identified by a [`SequenceKey`] (scope plus name) and described
//! by a [`SequenceConfig`]: the pattern it renders, how its counter advances and
//! when the counter returns to its base value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a scope identifier or sequence name.
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// Smallest allowed `{COUNTER}` padding width.
pub const MIN_PADDING: u8 = 1;

/// Largest allowed `{COUNTER}` padding width.
pub const MAX_PADDING: u8 = 10;

/// Name of the evaluator every engine provides.
pub const DEFAULT_EVALUATOR: &str = "default";

/// Identity of one sequence: unique per scope.
///
/// This is also the granularity of counter locking; two keys never contend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceKey {
    /// Tenant/organization namespace.
    pub scope_id: String,
    /// Sequence name, unique within the scope.
    pub sequence_name: String,
}

impl SequenceKey {
    /// Build a key, validating both parts.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending part if either is empty, too long,
    /// or contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(scope_id: impl Into<String>, sequence_name: impl Into<String>) -> Result<Self, String> {
        let scope_id = scope_id.into();
        let sequence_name = sequence_name.into();
        validate_identifier("scope_id", &scope_id)?;
        validate_identifier("sequence_name", &sequence_name)?;
        Ok(Self {
            scope_id,
            sequence_name,
        })
    }
}

impl std::fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.scope_id, self.sequence_name)
    }
}

/// Check a scope id or sequence name against the identifier charset.
///
/// # Errors
///
/// Returns a human-readable message when the identifier is invalid.
pub fn validate_identifier(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "{field} cannot exceed {MAX_IDENTIFIER_LEN} characters"
        ));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!("{field} contains invalid character '{bad}'"));
    }
    Ok(())
}

/// Time-based reset period for a sequence counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPeriod {
    /// Never reset on time.
    #[default]
    Never,
    /// Reset on the first generation of each calendar day.
    Daily,
    /// Reset on the first generation of each calendar month.
    Monthly,
    /// Reset on the first generation of each calendar year.
    Yearly,
}

impl std::fmt::Display for ResetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl std::str::FromStr for ResetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown reset period '{other}'")),
        }
    }
}

/// Configuration of one sequence.
///
/// Pattern syntax:
/// - `{NAME}` / `{NAME:N}` - variable with an optional numeric option
///   (`{COUNTER:4}` pads to four digits, `{YEAR:2}` renders a two-digit year)
/// - `{?KEY=VALUE?THEN:ELSE}` - conditional on a context value
/// - `{{` / `}}` - literal braces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Tenant/organization namespace.
    pub scope_id: String,

    /// Sequence name, unique within the scope.
    pub sequence_name: String,

    /// Pattern string.
    /// Example: "INV-{YEAR}-{COUNTER:4}"
    pub pattern: String,

    /// Time-based reset period.
    #[serde(default)]
    pub reset_period: ResetPeriod,

    /// Count-based reset: the counter never exceeds this value.
    #[serde(default)]
    pub reset_limit: Option<u64>,

    /// Value the counter returns to on reset.
    #[serde(default)]
    pub reset_base: u64,

    /// Default `{COUNTER}` width when the pattern gives none.
    #[serde(default = "default_padding")]
    pub padding: u8,

    /// Amount added to the counter on each generation.
    #[serde(default = "default_step_size")]
    pub step_size: u64,

    /// Name of the variable registry that renders this pattern.
    #[serde(default = "default_evaluator")]
    pub evaluator: String,

    /// When the configuration was first created.
    pub created_at: DateTime<Utc>,

    /// When the configuration was last changed.
    pub updated_at: DateTime<Utc>,
}

const fn default_padding() -> u8 {
    6
}

const fn default_step_size() -> u64 {
    1
}

fn default_evaluator() -> String {
    DEFAULT_EVALUATOR.to_string()
}

impl SequenceConfig {
    /// Create a configuration with defaults for everything but the pattern.
    #[must_use]
    pub fn new(key: &SequenceKey, pattern: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            scope_id: key.scope_id.clone(),
            sequence_name: key.sequence_name.clone(),
            pattern: pattern.into(),
            reset_period: ResetPeriod::Never,
            reset_limit: None,
            reset_base: 0,
            padding: default_padding(),
            step_size: default_step_size(),
            evaluator: default_evaluator(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The key this configuration belongs to.
    #[must_use]
    pub fn key(&self) -> SequenceKey {
        SequenceKey {
            scope_id: self.scope_id.clone(),
            sequence_name: self.sequence_name.clone(),
        }
    }

    /// Validate the numeric and identifier fields.
    ///
    /// The pattern itself is checked separately against a variable registry.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate_fields(&self) -> Result<(), String> {
        validate_identifier("scope_id", &self.scope_id)?;
        validate_identifier("sequence_name", &self.sequence_name)?;
        if !(MIN_PADDING..=MAX_PADDING).contains(&self.padding) {
            return Err(format!(
                "padding must be between {MIN_PADDING} and {MAX_PADDING}, got {}",
                self.padding
            ));
        }
        if self.step_size == 0 {
            return Err("step_size must be greater than zero".to_string());
        }
        if let Some(limit) = self.reset_limit {
            if limit == 0 {
                return Err("reset_limit must be greater than zero".to_string());
            }
            if self.reset_base.saturating_add(self.step_size) > limit {
                return Err(format!(
                    "reset_base + step_size must not exceed reset_limit ({limit})"
                ));
            }
        }
        if self.evaluator.is_empty() {
            return Err("evaluator cannot be empty".to_string());
        }
        Ok(())
    }
}
