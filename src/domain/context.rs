//! Caller-supplied generation context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key/value pairs supplied by the caller for exactly one generation.
///
/// Never persisted. Keys are looked up exactly first, then in lowercase, so a
/// `{TENANT_CODE}` variable finds a `tenant_code` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationContext(BTreeMap<String, String>);

impl GenerationContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, replacing any previous one under the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a key exactly, falling back to its lowercase form.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .or_else(|| self.0.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    /// Look up a key ignoring ASCII case.
    #[must_use]
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Whether the context holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for GenerationContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order() {
        let ctx = GenerationContext::new()
            .with("tenant_code", "ACME")
            .with("Region", "EU");

        assert_eq!(ctx.get("tenant_code"), Some("ACME"));
        assert_eq!(ctx.get("TENANT_CODE"), Some("ACME"));
        assert_eq!(ctx.get("REGION"), None);
        assert_eq!(ctx.get_ignore_case("REGION"), Some("EU"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_deserialize_from_map() {
        let ctx: GenerationContext =
            serde_json::from_str(r#"{"department_code":"IT"}"#).unwrap();
        assert_eq!(ctx.get("department_code"), Some("IT"));
        assert!(!ctx.is_empty());
    }
}
