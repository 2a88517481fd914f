//! Source positions for diagnostics.
//!
//! Dialects attach a location as an attribute, so it never takes part in
//! traversal or content hashing:
//!
//! ```text
//! .field("loc_", FieldType::source_location())
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::schema::{Constraint, FieldDef, FieldType, NodeType};
use super::value::Value;
use super::Node;
use crate::error::Result;

pub const SOURCE_LOCATION_KIND: &str = "SourceLocation";

static SOURCE_LOCATION: Lazy<Arc<NodeType>> = Lazy::new(|| {
    NodeType::new(SOURCE_LOCATION_KIND)
        .field_def(FieldDef::new("line", FieldType::Int).constraint(Constraint::min(1.0)))
        .field_def(FieldDef::new("column", FieldType::Int).constraint(Constraint::min(1.0)))
        .field("source", FieldType::Str)
        .frozen()
        .build()
        .expect("source location schema is valid")
});

/// The frozen `SourceLocation { line, column, source }` node type.
/// Lines and columns start at 1.
pub fn source_location_type() -> &'static Arc<NodeType> {
    &SOURCE_LOCATION
}

/// Build a location node; fails when `line` or `column` is below 1.
pub fn source_location(line: i64, column: i64, source: &str) -> Result<Node> {
    Node::build(&SOURCE_LOCATION)
        .set("line", line)
        .set("column", column)
        .set("source", source)
        .finish()
}

impl FieldType {
    /// Optional location field type, for `loc_` attributes.
    pub fn source_location() -> Self {
        FieldType::optional(FieldType::node(SOURCE_LOCATION_KIND))
    }
}

impl Node {
    /// `<source: Line l, Col c>` for location nodes, `None` for any other kind.
    pub fn describe_location(&self) -> Option<String> {
        if !self.is_a(SOURCE_LOCATION_KIND) {
            return None;
        }
        let line = self.get("line").and_then(Value::as_int)?;
        let column = self.get("column").and_then(Value::as_int)?;
        let source = self.get("source").and_then(Value::as_str).unwrap_or_default();
        Some(format!("<{}: Line {}, Col {}>", source, line, column))
    }
}
