//! Pattern engine.
//!
//! A pattern such as `INV-{YEAR}-{COUNTER:4}` is compiled once into a
//! [`PatternTemplate`] (a token list) and rendered by a [`VariableRegistry`]
//! against a counter value, a timestamp and a [`GenerationContext`].
//!
//! ```text
//! "PO{?priority=high?-URG}-{COUNTER:5}"
//!     │ parse
//!     ▼
//! [Literal "PO", Conditional, Literal "-", Variable COUNTER:5]
//!     │ render(counter, now, context)
//!     ▼
//! "PO-URG-00042"
//! ```
//!
//! [`GenerationContext`]: crate::domain::GenerationContext

pub mod conditional;
pub mod registry;
pub mod template;

use std::collections::HashMap;
use std::sync::Arc;

pub use conditional::Conditional;
pub use registry::{FormatError, OptionRule, RenderInput, Resolution, Resolver, VariableRegistry};
pub use template::{MAX_PATTERN_LEN, PatternError, PatternTemplate, Token, Variable};

use crate::domain::config::DEFAULT_EVALUATOR;

/// Named variable registries a sequence can select through its `evaluator` field.
///
/// The [`DEFAULT_EVALUATOR`] entry is always present.
#[derive(Debug, Clone)]
pub struct Evaluators {
    registries: HashMap<String, Arc<VariableRegistry>>,
}

impl Default for Evaluators {
    fn default() -> Self {
        Self::new(VariableRegistry::with_builtins())
    }
}

impl Evaluators {
    /// Create a table whose default evaluator is `default_registry`.
    #[must_use]
    pub fn new(default_registry: VariableRegistry) -> Self {
        let mut registries = HashMap::new();
        registries.insert(DEFAULT_EVALUATOR.to_string(), Arc::new(default_registry));
        Self { registries }
    }

    /// Add or replace a named registry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, registry: VariableRegistry) -> Self {
        self.insert(name, registry);
        self
    }

    /// Add or replace a named registry.
    pub fn insert(&mut self, name: impl Into<String>, registry: VariableRegistry) {
        self.registries.insert(name.into(), Arc::new(registry));
    }

    /// Look up a registry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<VariableRegistry>> {
        self.registries.get(name).cloned()
    }

    /// Registered evaluator names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_evaluator_always_present() {
        let evaluators = Evaluators::default();
        assert!(evaluators.get(DEFAULT_EVALUATOR).is_some());
        assert!(evaluators.get("missing").is_none());
    }

    #[test]
    fn test_named_evaluator() {
        let mut custom = VariableRegistry::with_builtins();
        custom.register("SITE", |_| "HQ".to_string());

        let evaluators = Evaluators::default().with("site", custom);
        assert_eq!(evaluators.names(), vec!["default", "site"]);

        let registry = evaluators.get("site").unwrap();
        assert!(registry.contains("SITE"));
        assert!(!evaluators.get("default").unwrap().contains("SITE"));
    }
}
