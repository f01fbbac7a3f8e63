//! Domain models for the sequencing worker.
//!
//! This module contains the core domain types representing sequence
//! configurations, counter state, the reset policy, generated numbers and API
//! contracts.

pub mod audit;
pub mod config;
pub mod context;
pub mod dto;
pub mod reset_policy;
pub mod sequence;

pub use audit::{AuditAction, AuditEntry};
pub use config::{ResetPeriod, SequenceConfig, SequenceKey};
pub use context::GenerationContext;
pub use dto::{
    ApiResponse, ConfigSummary, CounterChangeResponse, GenerateRequest, ListConfigResponse,
    OverrideRequest, PreviewResponse, ResetInfo, ResetRequest, ResetType, SequenceStateResponse,
    UpsertConfigRequest,
};
pub use reset_policy::{COUNT_RESET_INCLUSIVE, ResetPolicy};
pub use sequence::{
    AdvanceRule, CounterMutation, CounterOverflow, CounterState, CounterTransition,
    GeneratedNumber, GenerationMetadata, ResetCause,
};
