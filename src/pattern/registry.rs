//! Variable registry: the strategy table that renders pattern variables.
//!
//! Every variable name maps to a pure resolver function of
//! `(counter, timestamp, context, option)`. Registering a name that already
//! exists replaces the previous resolver.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use super::template::{COUNTER, COUNTER_WIDTH, PatternError, PatternTemplate, Token, YEAR, YEAR_DIGITS};
use crate::domain::GenerationContext;

/// Inputs available to a resolver.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    /// Counter value being rendered.
    pub counter: u64,
    /// Generation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Caller context.
    pub context: &'a GenerationContext,
    /// Option given in the pattern, if any.
    pub option: Option<u32>,
    /// Sequence default `{COUNTER}` width.
    pub padding: u8,
}

/// A variable resolver.
pub type Resolver = Arc<dyn Fn(&Resolution<'_>) -> String + Send + Sync>;

/// Which options a variable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRule {
    /// No option allowed.
    NoOption,
    /// An integer within the inclusive range.
    Range(u32, u32),
    /// One of the listed integers.
    OneOf(&'static [u32]),
}

impl OptionRule {
    fn accepts(self, option: Option<u32>) -> bool {
        match (self, option) {
            (_, None) => true,
            (Self::NoOption, Some(_)) => false,
            (Self::Range(min, max), Some(value)) => (min..=max).contains(&value),
            (Self::OneOf(allowed), Some(value)) => allowed.contains(&value),
        }
    }
}

/// Everything needed to render a template once.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// Counter value.
    pub counter: u64,
    /// Generation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Caller context.
    pub context: &'a GenerationContext,
    /// Default `{COUNTER}` width.
    pub padding: u8,
}

/// Rendering failed on a template the registry should have accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Template references a variable with no resolver.
    #[error("no resolver registered for variable '{0}'")]
    Unregistered(String),

    /// Template passes an option the resolver does not accept.
    #[error("option {option} not accepted by variable '{name}'")]
    RejectedOption {
        /// Variable name.
        name: String,
        /// Option given.
        option: u32,
    },
}

#[derive(Clone)]
struct Entry {
    resolver: Resolver,
    options: OptionRule,
}

/// Name → resolver table.
#[derive(Clone)]
pub struct VariableRegistry {
    entries: HashMap<String, Entry>,
}

impl std::fmt::Debug for VariableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("VariableRegistry")
            .field("variables", &names)
            .finish()
    }
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl VariableRegistry {
    /// A registry with no variables at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A registry with the built-in date, counter and context variables.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register_with_options(YEAR, OptionRule::OneOf(&YEAR_DIGITS), |r| {
            if r.option == Some(2) {
                format!("{:02}", r.timestamp.year().rem_euclid(100))
            } else {
                format!("{:04}", r.timestamp.year())
            }
        });
        registry.register("MONTH", |r| format!("{:02}", r.timestamp.month()));
        registry.register("DAY", |r| format!("{:02}", r.timestamp.day()));
        registry.register("WEEK", |r| format!("{:02}", r.timestamp.iso_week().week()));
        registry.register("QUARTER", |r| format!("Q{}", quarter(r.timestamp.month())));
        registry.register_with_options(
            COUNTER,
            OptionRule::Range(*COUNTER_WIDTH.start(), *COUNTER_WIDTH.end()),
            |r| {
                let width = r.option.map_or(usize::from(r.padding), |w| w as usize);
                format!("{:0width$}", r.counter)
            },
        );

        registry.register_context("PREFIX", "prefix");
        registry.register_context("TENANT", "tenant_code");
        registry.register_context("DEPARTMENT", "department_code");

        registry
    }

    /// Register a variable that takes no option. Replaces any existing entry.
    pub fn register<F>(&mut self, name: impl Into<String>, resolver: F)
    where
        F: Fn(&Resolution<'_>) -> String + Send + Sync + 'static,
    {
        self.register_with_options(name, OptionRule::NoOption, resolver);
    }

    /// Register a variable with an option rule. Replaces any existing entry.
    pub fn register_with_options<F>(&mut self, name: impl Into<String>, options: OptionRule, resolver: F)
    where
        F: Fn(&Resolution<'_>) -> String + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            Entry {
                resolver: Arc::new(resolver),
                options,
            },
        );
    }

    /// Register a variable that renders a context value, or nothing when absent.
    ///
    /// The value is looked up under `context_key` first, then under the
    /// variable's own name.
    pub fn register_context(&mut self, name: impl Into<String>, context_key: impl Into<String>) {
        let name = name.into();
        let context_key = context_key.into();
        let own_key = name.clone();
        self.register(name, move |r| {
            r.context
                .get(&context_key)
                .or_else(|| r.context.get(&own_key))
                .unwrap_or_default()
                .to_string()
        });
    }

    /// Whether `name` has a resolver.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check that every variable in `template` is registered and accepts its option.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownVariable`] or [`PatternError::OptionOutOfRange`].
    pub fn check(&self, template: &PatternTemplate) -> Result<(), PatternError> {
        for token in template.tokens() {
            if let Token::Variable(var) = token {
                let entry = self
                    .entries
                    .get(&var.name)
                    .ok_or_else(|| PatternError::UnknownVariable(var.name.clone()))?;
                if !entry.options.accepts(var.option) {
                    return Err(PatternError::OptionOutOfRange {
                        name: var.name.clone(),
                        option: var.option.unwrap_or_default(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Render `template`.
    ///
    /// Tokens are evaluated left to right; each resolver sees the same input.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if the template was not checked against this registry.
    pub fn render(&self, template: &PatternTemplate, input: &RenderInput<'_>) -> Result<String, FormatError> {
        let mut out = String::with_capacity(template.raw().len() + 8);

        for token in template.tokens() {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Conditional(conditional) => out.push_str(conditional.evaluate(input.context)),
                Token::Variable(var) => {
                    let entry = self
                        .entries
                        .get(&var.name)
                        .ok_or_else(|| FormatError::Unregistered(var.name.clone()))?;
                    if let Some(option) = var.option.filter(|_| !entry.options.accepts(var.option)) {
                        return Err(FormatError::RejectedOption {
                            name: var.name.clone(),
                            option,
                        });
                    }
                    let resolution = Resolution {
                        counter: input.counter,
                        timestamp: input.timestamp,
                        context: input.context,
                        option: var.option,
                        padding: input.padding,
                    };
                    out.push_str(&(entry.resolver)(&resolution));
                }
            }
        }

        Ok(out)
    }
}

/// Calendar quarter (1-4) of a month (1-12).
const fn quarter(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(counter: u64, context: &GenerationContext) -> RenderInput<'_> {
        RenderInput {
            counter,
            timestamp: Utc.with_ymd_and_hms(2025, 11, 7, 9, 30, 0).unwrap(),
            context,
            padding: 6,
        }
    }

    fn render(pattern: &str, counter: u64, context: &GenerationContext) -> String {
        let registry = VariableRegistry::with_builtins();
        let template = PatternTemplate::parse(pattern).unwrap();
        registry.check(&template).unwrap();
        registry.render(&template, &input(counter, context)).unwrap()
    }

    #[test]
    fn test_date_variables() {
        let ctx = GenerationContext::new();
        assert_eq!(render("{YEAR}", 1, &ctx), "2025");
        assert_eq!(render("{YEAR:2}", 1, &ctx), "25");
        assert_eq!(render("{MONTH}{DAY}", 1, &ctx), "1107");
        assert_eq!(render("W{WEEK}", 1, &ctx), "W45");
        assert_eq!(render("{QUARTER}", 1, &ctx), "Q4");
    }

    #[test]
    fn test_quarter_boundaries() {
        assert_eq!(quarter(1), 1);
        assert_eq!(quarter(3), 1);
        assert_eq!(quarter(4), 2);
        assert_eq!(quarter(9), 3);
        assert_eq!(quarter(10), 4);
        assert_eq!(quarter(12), 4);
    }

    #[test]
    fn test_counter_padding() {
        let ctx = GenerationContext::new();
        assert_eq!(render("INV-{COUNTER:4}", 12, &ctx), "INV-0012");
        assert_eq!(render("{COUNTER}", 12, &ctx), "000012");
        assert_eq!(render("{COUNTER:2}", 12345, &ctx), "12345");
    }

    #[test]
    fn test_context_variables() {
        let ctx = GenerationContext::new()
            .with("tenant_code", "ACME")
            .with("department_code", "IT");
        assert_eq!(
            render("{TENANT}-{DEPARTMENT}-{COUNTER:3}", 1, &ctx),
            "ACME-IT-001"
        );
        assert_eq!(render("{PREFIX}{COUNTER:1}", 7, &ctx), "7");
    }

    #[test]
    fn test_conditional_rendering() {
        let ctx = GenerationContext::new().with("priority", "HIGH");
        assert_eq!(
            render("PO{?priority=high?-URG:-STD}-{COUNTER:2}", 3, &ctx),
            "PO-URG-03"
        );
        assert_eq!(
            render("PO{?priority=low?-LOW:-STD}-{COUNTER:2}", 3, &ctx),
            "PO-STD-03"
        );
    }

    #[test]
    fn test_check_unknown_variable() {
        let registry = VariableRegistry::with_builtins();
        let template = PatternTemplate::parse("INV-{UNKNOWN}").unwrap();
        assert_eq!(
            registry.check(&template),
            Err(PatternError::UnknownVariable("UNKNOWN".to_string()))
        );
    }

    #[test]
    fn test_check_rejects_option_on_plain_variable() {
        let registry = VariableRegistry::with_builtins();
        let template = PatternTemplate::parse("{MONTH:2}").unwrap();
        assert!(matches!(
            registry.check(&template),
            Err(PatternError::OptionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_register_custom_and_overwrite() {
        let mut registry = VariableRegistry::with_builtins();
        registry.register_context("BRANCH", "branch_code");
        assert!(registry.contains("BRANCH"));

        let ctx = GenerationContext::new().with("branch_code", "NYC");
        let template = PatternTemplate::parse("{BRANCH}-{COUNTER:2}").unwrap();
        assert!(registry.check(&template).is_ok());
        assert_eq!(
            registry.render(&template, &input(5, &ctx)).unwrap(),
            "NYC-05"
        );

        // Last registration wins.
        registry.register("BRANCH", |_| "FIXED".to_string());
        assert_eq!(
            registry.render(&template, &input(5, &ctx)).unwrap(),
            "FIXED-05"
        );
    }

    #[test]
    fn test_render_unregistered_is_format_error() {
        let registry = VariableRegistry::empty();
        let template = PatternTemplate::parse("{COUNTER}").unwrap();
        let ctx = GenerationContext::new();
        assert_eq!(
            registry.render(&template, &input(1, &ctx)),
            Err(FormatError::Unregistered("COUNTER".to_string()))
        );
    }
}
