//! Conditional segments: `{?KEY=VALUE?THEN:ELSE}`.
//!
//! The segment compares the context value under `KEY` with `VALUE`, ignoring
//! case, and renders `THEN` on a match and `ELSE` (or nothing) otherwise. A
//! missing context key compares as the empty string. Both branches are literal
//! text; `THEN` ends at the first `:`.

use crate::domain::GenerationContext;

/// A parsed conditional segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    key: String,
    value: String,
    when_true: String,
    when_false: Option<String>,
}

impl Conditional {
    /// Parse the text between `{?` and `}`.
    ///
    /// # Errors
    ///
    /// Returns a description of what is missing when the body is malformed.
    pub fn parse(body: &str) -> Result<Self, String> {
        let (key, rest) = body
            .split_once('=')
            .ok_or_else(|| "missing '=' after key".to_string())?;
        if key.is_empty() {
            return Err("missing key".to_string());
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid key '{key}'"));
        }

        let (value, branches) = rest
            .split_once('?')
            .ok_or_else(|| "missing '?' before branches".to_string())?;

        let (when_true, when_false) = match branches.split_once(':') {
            Some((t, f)) => (t.to_string(), Some(f.to_string())),
            None => (branches.to_string(), None),
        };

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            when_true,
            when_false,
        })
    }

    /// Context key compared by this segment.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Pick the branch for `context`.
    #[must_use]
    pub fn evaluate(&self, context: &GenerationContext) -> &str {
        let actual = context.get_ignore_case(&self.key).unwrap_or_default();
        if actual.to_lowercase() == self.value.to_lowercase() {
            &self.when_true
        } else {
            self.when_false.as_deref().unwrap_or_default()
        }
    }
}

impl std::fmt::Display for Conditional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{?{}={}?{}", self.key, self.value, self.when_true)?;
        if let Some(when_false) = &self.when_false {
            write!(f, ":{when_false}")?;
        }
        write!(f, "}}")
    }
}
