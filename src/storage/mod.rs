//! Storage layer module.
//!
//! This module provides trait-based storage abstraction allowing different backends
//! to be used without changing business logic.

pub mod factory;
pub mod file;
pub mod postgres;
pub mod traits;

pub use factory::create_storage;
pub use traits::{ConfigStorage, CounterStorage, HistoryStorage, LockSettings, Storage};
