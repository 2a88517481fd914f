//! `$name` substitution templates.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{read_source, Template};
use crate::codegen::context::Scope;
use crate::error::{IrError, Result};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$(?:(\$)|([_a-z][_a-z0-9]*)|\{([_a-z][_a-z0-9]*)\}|())")
        .expect("placeholder regex is valid")
});

/// Replaces `$name` and `${name}` with the named value's text; `$$` is a
/// literal dollar. Any other `$` is an error.
#[derive(Clone, Debug)]
pub struct SubstitutionTemplate {
    source: String,
}

impl SubstitutionTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        read_source(path).map(Self::new)
    }
}

impl Template for SubstitutionTemplate {
    fn render(&self, scope: &dyn Scope) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&self.source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&self.source[last..whole.start()]);
            last = whole.end();

            if caps.get(1).is_some() {
                out.push('$');
                continue;
            }
            let Some(name) = caps.get(2).or_else(|| caps.get(3)) else {
                return Err(IrError::Template(format!(
                    "invalid placeholder at offset {}",
                    whole.start()
                )));
            };
            let slot = scope.lookup(name.as_str()).ok_or_else(|| {
                IrError::Template(format!("no value for placeholder '{}'", name.as_str()))
            })?;
            out.push_str(&slot.text());
        }
        out.push_str(&self.source[last..]);
        Ok(out)
    }
}
