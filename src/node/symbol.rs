//! Symbol names (definition sites) and symbol references (use sites).

use std::fmt;
use std::ops::Deref;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{IrError, Result};

/// Identifier-like pattern used when a field does not declare its own.
pub const DEFAULT_SYMBOL_PATTERN: &str = r"[a-zA-Z_]\w*";

static DEFAULT_PATTERN: Lazy<SymbolPattern> = Lazy::new(|| {
    SymbolPattern::new(DEFAULT_SYMBOL_PATTERN).expect("default symbol pattern is a valid regex")
});

/// A compiled, fully-anchored pattern that symbol names must match.
#[derive(Clone, Debug)]
pub struct SymbolPattern {
    source: String,
    regex: Regex,
}

impl SymbolPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            IrError::Config(format!("invalid symbol pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The shared default pattern (`[a-zA-Z_]\w*`).
    pub fn default_pattern() -> &'static SymbolPattern {
        &DEFAULT_PATTERN
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl Default for SymbolPattern {
    fn default() -> Self {
        DEFAULT_PATTERN.clone()
    }
}

impl PartialEq for SymbolPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for SymbolPattern {}

/// Name of a symbol at its definition site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolName(String);

impl SymbolName {
    /// Validate `name` against the default identifier pattern.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_pattern(name, SymbolPattern::default_pattern())
    }

    pub fn with_pattern(name: impl Into<String>, pattern: &SymbolPattern) -> Result<Self> {
        let name = name.into();
        if !pattern.matches(&name) {
            return Err(IrError::validation(
                "SymbolName",
                "name",
                format!(
                    "'{}' does not match pattern '{}'",
                    name,
                    pattern.as_str()
                ),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SymbolName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a symbol at a use site. Any string is accepted; resolution
/// against a [`SymbolTable`](crate::symtab::SymbolTable) may fail later.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolRef(String);

impl SymbolRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SymbolRef {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&SymbolName> for SymbolRef {
    fn from(name: &SymbolName) -> Self {
        Self(name.0.clone())
    }
}
