//! Node type declarations: fields, their roles, types and constraints.
//!
//! A field's role comes from its name when the type is declared:
//! a trailing `__` marks an internal field, a trailing `_` an attribute,
//! anything else a child. Every generic algorithm reads roles from here,
//! so new dialect types need no further registration.

use std::sync::Arc;

use regex::Regex;

use super::symbol::{SymbolName, SymbolPattern, SymbolRef};
use super::value::{dedup, Value};
use crate::error::{IrError, Result};
use crate::symtab::DuplicatePolicy;

/// Kind name at the root of every node type hierarchy.
pub const BASE_KIND: &str = "Node";

/// Name of the attribute caching a scope's symbol table.
pub const SYMTABLE_FIELD: &str = "symtable_";

const INTERNAL_SUFFIX: &str = "__";
const ATTRIBUTE_SUFFIX: &str = "_";

// ─── Field roles ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Part of the tree structure; traversed, visited and rendered.
    Child,
    /// Implementation metadata carried by the node but never traversed.
    Attribute,
    /// Framework bookkeeping, hidden from traversal and field iteration.
    Internal,
}

impl FieldRole {
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(INTERNAL_SUFFIX) {
            FieldRole::Internal
        } else if name.ends_with(ATTRIBUTE_SUFFIX) {
            FieldRole::Attribute
        } else {
            FieldRole::Child
        }
    }
}

// ─── Field types ──────────────────────────────────────────────────

/// A closed enumeration usable as a field type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, variants: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        })
    }

    /// Member value for `variant`, if it belongs to this enumeration.
    pub fn value(&self, variant: &str) -> Option<Value> {
        self.variants
            .iter()
            .any(|v| v == variant)
            .then(|| Value::Enum(super::value::EnumValue::new(&self.name, variant)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Any,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Enum(Arc<EnumType>),
    /// A symbol definition whose name must match the pattern.
    Symbol(SymbolPattern),
    SymbolRef,
    /// A node of the named kind or any of its subtypes.
    Node(String),
    AnyNode,
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>),
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn node(kind: &str) -> Self {
        FieldType::Node(kind.to_string())
    }

    /// Symbol definition with the default identifier pattern.
    pub fn symbol() -> Self {
        FieldType::Symbol(SymbolPattern::default())
    }

    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn set(inner: FieldType) -> Self {
        FieldType::Set(Box::new(inner))
    }

    pub fn map(inner: FieldType) -> Self {
        FieldType::Map(Box::new(inner))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    /// Whether values of this type define symbols.
    pub fn defines_symbol(&self) -> bool {
        match self {
            FieldType::Symbol(_) => true,
            FieldType::Optional(inner) => inner.defines_symbol(),
            _ => false,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_) | FieldType::Any)
    }

    pub fn describe(&self) -> String {
        match self {
            FieldType::Any => "any".into(),
            FieldType::Bool => "bool".into(),
            FieldType::Int => "int".into(),
            FieldType::Float => "float".into(),
            FieldType::Str => "str".into(),
            FieldType::Bytes => "bytes".into(),
            FieldType::Enum(e) => format!("enum {}", e.name),
            FieldType::Symbol(_) => "symbol".into(),
            FieldType::SymbolRef => "symbol ref".into(),
            FieldType::Node(kind) => kind.clone(),
            FieldType::AnyNode => "node".into(),
            FieldType::List(inner) => format!("list of {}", inner.describe()),
            FieldType::Set(inner) => format!("set of {}", inner.describe()),
            FieldType::Map(inner) => format!("map of {}", inner.describe()),
            FieldType::Optional(inner) => format!("optional {}", inner.describe()),
        }
    }

    /// Check `value` against this type, converting strings into symbol
    /// names/refs and de-duplicating sets. Returns the accepted value.
    pub fn coerce(&self, value: Value) -> std::result::Result<Value, String> {
        match (self, value) {
            (FieldType::Any, v) => Ok(v),
            (FieldType::Optional(_), Value::None) => Ok(Value::None),
            (FieldType::Optional(inner), v) => inner.coerce(v),
            (FieldType::Bool, v @ Value::Bool(_)) => Ok(v),
            (FieldType::Int, v @ Value::Int(_)) => Ok(v),
            (FieldType::Float, v @ Value::Float(_)) => Ok(v),
            (FieldType::Str, v @ Value::Str(_)) => Ok(v),
            (FieldType::Bytes, v @ Value::Bytes(_)) => Ok(v),
            (FieldType::Enum(ty), Value::Enum(e)) => {
                if e.enum_name == ty.name && ty.variants.contains(&e.variant) {
                    Ok(Value::Enum(e))
                } else {
                    Err(format!(
                        "'{}::{}' is not a member of enum {}",
                        e.enum_name, e.variant, ty.name
                    ))
                }
            }
            (FieldType::Symbol(pattern), Value::Symbol(name)) => {
                if pattern.matches(name.as_str()) {
                    Ok(Value::Symbol(name))
                } else {
                    Err(format!(
                        "'{}' does not match pattern '{}'",
                        name,
                        pattern.as_str()
                    ))
                }
            }
            (FieldType::Symbol(pattern), Value::Str(s)) => SymbolName::with_pattern(s, pattern)
                .map(Value::Symbol)
                .map_err(|_| format!("symbol name does not match pattern '{}'", pattern.as_str())),
            (FieldType::SymbolRef, v @ Value::Ref(_)) => Ok(v),
            (FieldType::SymbolRef, Value::Str(s)) => Ok(Value::Ref(SymbolRef::new(s))),
            (FieldType::Node(kind), Value::Node(n)) => {
                if n.is_a(kind) {
                    Ok(Value::Node(n))
                } else {
                    Err(format!("expected {}, found {}", kind, n.kind()))
                }
            }
            (FieldType::AnyNode, v @ Value::Node(_)) => Ok(v),
            (FieldType::List(inner), Value::List(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| inner.coerce(item).map_err(|e| format!("[{}]: {}", i, e)))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::List),
            (FieldType::Set(inner), Value::Set(items) | Value::List(items)) => items
                .into_iter()
                .map(|item| inner.coerce(item))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(|items| Value::Set(dedup(items))),
            (FieldType::Map(inner), Value::Map(entries)) => entries
                .into_iter()
                .map(|(k, v)| {
                    inner
                        .coerce(v)
                        .map(|v| (k.clone(), v))
                        .map_err(|e| format!("['{}']: {}", k, e))
                })
                .collect::<std::result::Result<_, _>>()
                .map(Value::Map),
            (ty, v) => Err(format!(
                "expected {}, found {}",
                ty.describe(),
                v.type_name()
            )),
        }
    }
}

// ─── Constraints ──────────────────────────────────────────────────

/// Field-level constraints checked after the type check.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// Inclusive numeric bounds.
    Range { min: Option<f64>, max: Option<f64> },
    /// Strings must fully match.
    Pattern(Regex),
    /// Strings and collections must not be empty.
    NonEmpty,
}

impl Constraint {
    pub fn min(min: f64) -> Self {
        Constraint::Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn max(max: f64) -> Self {
        Constraint::Range {
            min: None,
            max: Some(max),
        }
    }

    /// Full-match pattern constraint.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{})$", pattern))
            .map(Constraint::Pattern)
            .map_err(|e| IrError::Config(format!("invalid pattern '{}': {}", pattern, e)))
    }

    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            Constraint::Range { min, max } => {
                let Some(x) = value.as_float() else {
                    return Ok(());
                };
                if let Some(min) = min {
                    if x < *min {
                        return Err(format!("{} is less than the minimum {}", value, min));
                    }
                }
                if let Some(max) = max {
                    if x > *max {
                        return Err(format!("{} is greater than the maximum {}", value, max));
                    }
                }
                Ok(())
            }
            Constraint::Pattern(regex) => match value.as_str() {
                Some(s) if !regex.is_match(s) => {
                    Err(format!("'{}' does not match '{}'", s, regex.as_str()))
                }
                _ => Ok(()),
            },
            Constraint::NonEmpty => {
                let empty = match value {
                    Value::Str(s) => s.is_empty(),
                    Value::List(items) | Value::Set(items) => items.is_empty(),
                    Value::Map(entries) => entries.is_empty(),
                    _ => false,
                };
                if empty {
                    Err("must not be empty".into())
                } else {
                    Ok(())
                }
            }
        }
    }
}

// ─── Field definitions ────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct FieldDef {
    name: String,
    role: FieldRole,
    ty: FieldType,
    default: Option<Value>,
    constraints: Vec<Constraint>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        Self {
            role: FieldRole::from_name(&name),
            name,
            ty,
            default: None,
            constraints: Vec::new(),
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> FieldRole {
        self.role
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Type check plus constraints. `kind` names the owning node type in errors.
    pub fn validate(&self, kind: &str, value: Value) -> Result<Value> {
        let value = self
            .ty
            .coerce(value)
            .map_err(|msg| IrError::validation(kind, &self.name, msg))?;
        if !value.is_none() {
            for constraint in &self.constraints {
                constraint
                    .check(&value)
                    .map_err(|msg| IrError::validation(kind, &self.name, msg))?;
            }
        }
        Ok(value)
    }

    /// Value used when construction does not supply the field.
    pub(crate) fn initial(&self) -> Option<Value> {
        match &self.default {
            Some(v) => Some(v.clone()),
            None if self.ty.is_optional() => Some(Value::None),
            None => None,
        }
    }
}

// ─── Node types ───────────────────────────────────────────────────

/// Schema of a node kind: its name, declared supertype, and fields
/// (inherited fields first, in declaration order).
#[derive(Debug)]
pub struct NodeType {
    name: String,
    parent: Option<Arc<NodeType>>,
    fields: Vec<FieldDef>,
    frozen: bool,
    scope: Option<DuplicatePolicy>,
}

impl NodeType {
    /// Start declaring a node type named `name`.
    pub fn new(name: impl Into<String>) -> NodeTypeBuilder {
        NodeTypeBuilder {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            frozen: None,
            scope: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<NodeType>> {
        self.parent.as_ref()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Duplicate policy when this type owns a symbol table.
    pub fn symbol_scope(&self) -> Option<DuplicatePolicy> {
        self.scope
    }

    /// Kind names from this type up through its parents, ending at
    /// [`BASE_KIND`]. This is the lookup order for handlers and templates.
    pub fn ancestry(&self) -> impl Iterator<Item = &str> {
        let mut current = Some(self);
        let mut chain = Vec::new();
        while let Some(ty) = current {
            chain.push(ty.name.as_str());
            current = ty.parent.as_deref();
        }
        if chain.last() != Some(&BASE_KIND) {
            chain.push(BASE_KIND);
        }
        chain.into_iter()
    }

    pub fn is_a(&self, kind: &str) -> bool {
        self.ancestry().any(|k| k == kind)
    }
}

pub struct NodeTypeBuilder {
    name: String,
    parent: Option<Arc<NodeType>>,
    fields: Vec<FieldDef>,
    frozen: Option<bool>,
    scope: Option<DuplicatePolicy>,
}

impl NodeTypeBuilder {
    /// Declare the supertype; its fields, frozen flag and scope are inherited.
    pub fn extends(mut self, parent: &Arc<NodeType>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Add a field; its role follows from the name.
    pub fn field(self, name: &str, ty: FieldType) -> Self {
        self.field_def(FieldDef::new(name, ty))
    }

    pub fn field_def(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Reject every assignment after construction.
    pub fn frozen(mut self) -> Self {
        self.frozen = Some(true);
        self
    }

    /// Allow assignment even if the parent type is frozen.
    pub fn mutable(mut self) -> Self {
        self.frozen = Some(false);
        self
    }

    /// Collect a symbol table into the `symtable_` attribute at construction.
    pub fn symbol_scope(mut self, policy: DuplicatePolicy) -> Self {
        self.scope = Some(policy);
        self
    }

    pub fn build(self) -> Result<Arc<NodeType>> {
        let schema_err = |message: String| IrError::Schema {
            kind: self.name.clone(),
            message,
        };

        if !SymbolPattern::default_pattern().matches(&self.name) {
            return Err(schema_err("type name is not an identifier".into()));
        }

        let mut fields: Vec<FieldDef> = self
            .parent
            .as_ref()
            .map(|p| p.fields.clone())
            .unwrap_or_default();

        let mut own_names: Vec<&str> = Vec::new();
        for def in &self.fields {
            if own_names.contains(&def.name.as_str()) {
                return Err(schema_err(format!("field '{}' declared twice", def.name)));
            }
            own_names.push(&def.name);
            if !SymbolPattern::default_pattern().matches(&def.name) {
                return Err(schema_err(format!(
                    "field name '{}' is not an identifier",
                    def.name
                )));
            }
            if let Some(default) = &def.default {
                def.validate(&self.name, default.clone())
                    .map_err(|e| schema_err(format!("bad default: {}", e)))?;
            }
            match fields.iter().position(|f| f.name == def.name) {
                Some(i) => fields[i] = def.clone(),
                None => fields.push(def.clone()),
            }
        }

        let parent_frozen = self.parent.as_ref().is_some_and(|p| p.frozen);
        let scope = self.scope.or_else(|| self.parent.as_ref().and_then(|p| p.scope));

        if scope.is_some() && !fields.iter().any(|f| f.name == SYMTABLE_FIELD) {
            fields.push(
                FieldDef::new(SYMTABLE_FIELD, FieldType::map(FieldType::AnyNode))
                    .default_value(Value::Map(Default::default())),
            );
        }

        Ok(Arc::new(NodeType {
            frozen: self.frozen.unwrap_or(parent_frozen),
            name: self.name,
            parent: self.parent,
            fields,
            scope,
        }))
    }
}
