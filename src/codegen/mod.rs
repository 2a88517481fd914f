//! Template-based code generation.
//!
//! A [`TemplatedGenerator`] walks a tree and renders each node through the
//! template registered for its kind (or the closest ancestor kind).
//! Children are rendered first and handed to the template by field name,
//! next to the node's raw attributes, the node itself, the generator and
//! the caller's keyword context.
//!
//! Templates come in several backends behind the [`Template`] trait.
//! Rendered source can be post-processed by a [`FormatterRegistry`].

mod context;
mod format;
mod generator;
mod template;
mod text;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::node::Value;

pub use context::{RenderContext, Scope, Slot};
pub use format::{CommandFormatter, FormatterRegistry, SourceFormatter};
pub use generator::{GeneratorBuilder, Handler, LeafDumper, MissingTemplate, TemplatedGenerator};
pub use template::{FnTemplate, FormatTemplate, SubstitutionTemplate, Template, TeraTemplate};
pub use text::{CaseStyle, Name, TextBlock};

/// Output of code generation: node and leaf text, or collections of it
/// shaped like the input collections.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    Text(String),
    List(Vec<Rendered>),
    Map(BTreeMap<String, Rendered>),
}

impl Rendered {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Rendered::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Rendered]> {
        match self {
            Rendered::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Rendered>> {
        match self {
            Rendered::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Flatten to one string (see the `Display` impl).
    pub fn into_text(self) -> String {
        match self {
            Rendered::Text(s) => s,
            other => other.to_string(),
        }
    }
}

impl Default for Rendered {
    fn default() -> Self {
        Rendered::Text(String::new())
    }
}

/// Lists print one item per line; maps print `key: value` lines.
impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Text(s) => f.write_str(s),
            Rendered::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Rendered::Map(entries) => {
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                Ok(())
            }
        }
    }
}

impl From<String> for Rendered {
    fn from(s: String) -> Self {
        Rendered::Text(s)
    }
}

impl From<&str> for Rendered {
    fn from(s: &str) -> Self {
        Rendered::Text(s.to_string())
    }
}

impl From<Rendered> for Value {
    fn from(r: Rendered) -> Self {
        match r {
            Rendered::Text(s) => Value::Str(s),
            Rendered::List(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Rendered::Map(entries) => {
                Value::Map(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
