//! Service layer module.
//!
//! Business logic for sequence configuration, number generation, preview and
//! administrative counter changes. [`SequenceEngine`] ties the services together.

pub mod audit;
pub mod clock;
pub mod config;
pub mod counter;
pub mod engine;
pub mod generation;
pub mod overrides;
pub mod preview;
pub mod validation;

pub use audit::{AuditSink, LogAuditSink, StorageAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ConfigService;
pub use counter::CounterStore;
pub use engine::{SequenceEngine, SequenceEngineBuilder};
pub use generation::GenerationService;
pub use overrides::OverrideService;
pub use preview::PreviewService;
pub use validation::ValidationService;
