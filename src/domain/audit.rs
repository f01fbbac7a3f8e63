//! Audit records for administrative sequence operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SequenceKey;

/// Administrative action on a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Counter reset to its base.
    Reset,
    /// Counter forced to a value.
    Override,
    /// Configuration created or updated.
    ConfigUpserted,
    /// Configuration and counter removed.
    ConfigDeleted,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Override => write!(f, "override"),
            Self::ConfigUpserted => write!(f, "config_upserted"),
            Self::ConfigDeleted => write!(f, "config_deleted"),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened.
    pub action: AuditAction,
    /// Scope of the sequence.
    pub scope_id: String,
    /// Sequence name.
    pub sequence_name: String,
    /// Counter before the action.
    pub old_value: Option<u64>,
    /// Counter after the action.
    pub new_value: Option<u64>,
    /// Who did it.
    pub actor: String,
    /// Why.
    pub reason: String,
    /// When.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry without counter values.
    #[must_use]
    pub fn new(
        action: AuditAction,
        key: &SequenceKey,
        actor: impl Into<String>,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            scope_id: key.scope_id.clone(),
            sequence_name: key.sequence_name.clone(),
            old_value: None,
            new_value: None,
            actor: actor.into(),
            reason: reason.into(),
            timestamp,
        }
    }

    /// Attach the counter values before and after the action.
    #[must_use]
    pub const fn with_values(mut self, old_value: u64, new_value: u64) -> Self {
        self.old_value = Some(old_value);
        self.new_value = Some(new_value);
        self
    }
}
