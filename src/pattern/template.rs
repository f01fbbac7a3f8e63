//! Pattern tokenizer and parser.
//!
//! Compiles pattern strings like `"INV-{YEAR}-{COUNTER:4}"` into a token list.
//! Parsing is purely syntactic apart from the option ranges of the two
//! built-ins whose options are fixed (`COUNTER` and `YEAR`); checking that every
//! variable exists is the registry's job.

use std::str::FromStr;

use super::conditional::Conditional;

/// Maximum pattern length in characters.
pub const MAX_PATTERN_LEN: usize = 255;

/// Name of the counter variable.
pub const COUNTER: &str = "COUNTER";

/// Name of the year variable.
pub const YEAR: &str = "YEAR";

/// Allowed `{COUNTER:N}` widths.
pub const COUNTER_WIDTH: std::ops::RangeInclusive<u32> = 1..=10;

/// Allowed `{YEAR:N}` digit counts.
pub const YEAR_DIGITS: [u32; 2] = [2, 4];

/// Why a pattern failed to parse or validate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Pattern is empty.
    #[error("pattern cannot be empty")]
    Empty,

    /// Pattern is longer than [`MAX_PATTERN_LEN`].
    #[error("pattern cannot exceed {MAX_PATTERN_LEN} characters, got {0}")]
    TooLong(usize),

    /// A `{` is never closed.
    #[error("unclosed '{{' at position {0}")]
    Unclosed(usize),

    /// A `}` has no opening brace.
    #[error("unmatched '}}' at position {0}")]
    UnmatchedClose(usize),

    /// A `{` appears inside a placeholder.
    #[error("nested '{{' at position {0}")]
    Nested(usize),

    /// `{}`.
    #[error("empty placeholder at position {0}")]
    EmptyPlaceholder(usize),

    /// Variable name outside `[A-Z][A-Z0-9_]*`.
    #[error("invalid variable name '{0}'")]
    InvalidName(String),

    /// Option is not a non-negative integer.
    #[error("invalid option '{option}' for {name}")]
    InvalidOption {
        /// Variable name.
        name: String,
        /// Raw option text.
        option: String,
    },

    /// Option is an integer the variable does not accept.
    #[error("option {option} out of range for {name}")]
    OptionOutOfRange {
        /// Variable name.
        name: String,
        /// Parsed option.
        option: u32,
    },

    /// Variable is not registered.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Malformed conditional body.
    #[error("malformed conditional at position {position}: {reason}")]
    MalformedConditional {
        /// Position of the opening brace.
        position: usize,
        /// What is wrong.
        reason: String,
    },
}

/// A `{NAME}` or `{NAME:OPTION}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Numeric option.
    pub option: Option<u32>,
}

/// One element of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, with escaped braces already unescaped.
    Literal(String),
    /// Variable placeholder.
    Variable(Variable),
    /// Conditional segment.
    Conditional(Conditional),
}

/// A compiled pattern. Immutable; a pure function of the raw string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternTemplate {
    raw: String,
    tokens: Vec<Token>,
    variables: Vec<String>,
}

impl PatternTemplate {
    /// Parse a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] on an empty or over-long pattern, unmatched
    /// braces, malformed names or options, or a malformed conditional.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let len = pattern.chars().count();
        if len > MAX_PATTERN_LEN {
            return Err(PatternError::TooLong(len));
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if chars.next_if(|&(_, next)| next == '{').is_some() {
                        literal.push('{');
                        continue;
                    }

                    let mut body = String::new();
                    let mut closed = false;
                    for (inner_pos, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(PatternError::Nested(inner_pos)),
                            _ => body.push(inner),
                        }
                    }
                    if !closed {
                        return Err(PatternError::Unclosed(pos));
                    }

                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(parse_placeholder(&body, pos)?);
                }
                '}' => {
                    if chars.next_if(|&(_, next)| next == '}').is_some() {
                        literal.push('}');
                    } else {
                        return Err(PatternError::UnmatchedClose(pos));
                    }
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        let mut variables: Vec<String> = Vec::new();
        for token in &tokens {
            if let Token::Variable(var) = token {
                if !variables.contains(&var.name) {
                    variables.push(var.name.clone());
                }
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            tokens,
            variables,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed tokens in order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Variable names in first-occurrence order, without duplicates.
    #[must_use]
    pub fn extract_variables(&self) -> &[String] {
        &self.variables
    }

    /// Whether the pattern renders the same text for every call.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Literal(_)))
    }

    /// Whether the pattern contains `{COUNTER}`.
    #[must_use]
    pub fn has_counter(&self) -> bool {
        self.variables.iter().any(|v| v == COUNTER)
    }
}

impl FromStr for PatternTemplate {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => {
                    for c in text.chars() {
                        match c {
                            '{' => f.write_str("{{")?,
                            '}' => f.write_str("}}")?,
                            _ => write!(f, "{c}")?,
                        }
                    }
                }
                Token::Variable(Variable { name, option: None }) => write!(f, "{{{name}}}")?,
                Token::Variable(Variable {
                    name,
                    option: Some(option),
                }) => write!(f, "{{{name}:{option}}}")?,
                Token::Conditional(conditional) => write!(f, "{conditional}")?,
            }
        }
        Ok(())
    }
}

/// Parse the text between `{` and `}`.
fn parse_placeholder(body: &str, position: usize) -> Result<Token, PatternError> {
    if body.is_empty() {
        return Err(PatternError::EmptyPlaceholder(position));
    }

    if let Some(conditional) = body.strip_prefix('?') {
        return Conditional::parse(conditional)
            .map(Token::Conditional)
            .map_err(|reason| PatternError::MalformedConditional { position, reason });
    }

    let (name, option) = match body.split_once(':') {
        Some((name, option)) => (name, Some(option)),
        None => (body, None),
    };

    if !is_valid_name(name) {
        return Err(PatternError::InvalidName(name.to_string()));
    }

    let option = option.map(|raw| parse_option(name, raw)).transpose()?;

    if let Some(value) = option {
        let in_range = match name {
            COUNTER => COUNTER_WIDTH.contains(&value),
            YEAR => YEAR_DIGITS.contains(&value),
            _ => true,
        };
        if !in_range {
            return Err(PatternError::OptionOutOfRange {
                name: name.to_string(),
                option: value,
            });
        }
    }

    Ok(Token::Variable(Variable {
        name: name.to_string(),
        option,
    }))
}

/// Parse an option: decimal digits with no leading zero.
fn parse_option(name: &str, raw: &str) -> Result<u32, PatternError> {
    let invalid = || PatternError::InvalidOption {
        name: name.to_string(),
        option: raw.to_string(),
    };
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}

/// Variable names are `[A-Z][A-Z0-9_]*`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
