//! The generic tree-node model.
//!
//! A [`Node`] is a typed record built from a [`NodeType`] schema. Its
//! fields are stored in declaration order; the schema's naming convention
//! decides which of them are children (traversed), attributes (metadata)
//! or internal (framework bookkeeping).
//!
//! ```text
//! let literal = NodeType::new("Literal")
//!     .field("value", FieldType::Str)
//!     .field("loc_", FieldType::optional(FieldType::Str))
//!     .build()?;
//! let node = Node::build(&literal).set("value", "42").finish()?;
//! ```

pub mod hash;
pub mod id;
pub mod location;
pub mod schema;
pub mod symbol;
pub mod value;


use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{IrError, Result};
use crate::symtab::SymbolTable;

pub use hash::ContentHash;
pub use id::{IdGenerator, IdStrategy};
pub use location::{source_location, source_location_type, SOURCE_LOCATION_KIND};
pub use schema::{
    Constraint, EnumType, FieldDef, FieldRole, FieldType, NodeType, NodeTypeBuilder, BASE_KIND,
    SYMTABLE_FIELD,
};
pub use symbol::{SymbolName, SymbolPattern, SymbolRef, DEFAULT_SYMBOL_PATTERN};
pub use value::{EnumValue, Value};

// ─── Node ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Node {
    ty: Arc<NodeType>,
    id: String,
    pub(crate) fields: Vec<Value>,
}

impl Node {
    /// Start constructing a node of type `ty`.
    pub fn build(ty: &Arc<NodeType>) -> NodeBuilder<'_> {
        NodeBuilder {
            ty,
            id: None,
            ids: None,
            values: Vec::new(),
        }
    }

    /// The kind tag: the name of the node's type. There is no setter.
    pub fn kind(&self) -> &str {
        self.ty.name()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node_type(&self) -> &Arc<NodeType> {
        &self.ty
    }

    /// True if this node's type is `kind` or a subtype of it.
    pub fn is_a(&self, kind: &str) -> bool {
        self.ty.is_a(kind)
    }

    pub fn is_frozen(&self) -> bool {
        self.ty.is_frozen()
    }

    /// Value of any declared field, including attributes and internals.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).map(|i| &self.fields[i])
    }

    /// Assign a field after validating it against the schema.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if self.is_frozen() {
            return Err(IrError::ImmutableMutation {
                kind: self.kind().to_string(),
                field: name.to_string(),
            });
        }
        let index = self.ty.field_index(name).ok_or_else(|| {
            IrError::validation(self.kind(), name, "no such field")
        })?;
        self.assign(index, value.into())
    }

    /// Child fields in declaration order.
    pub fn iter_children(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter_role(FieldRole::Child)
    }

    /// Attribute fields in declaration order.
    pub fn iter_attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter_role(FieldRole::Attribute)
    }

    fn iter_role(&self, role: FieldRole) -> impl Iterator<Item = (&str, &Value)> {
        self.ty
            .fields()
            .iter()
            .zip(&self.fields)
            .filter(move |(def, _)| def.role() == role)
            .map(|(def, value)| (def.name(), value))
    }

    /// Field positions of the child fields.
    pub(crate) fn child_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ty
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, def)| def.role() == FieldRole::Child)
            .map(|(i, _)| i)
    }

    /// Structural hash of kind and children; ids and attributes are ignored.
    pub fn content_hash(&self) -> ContentHash {
        hash::hash_node(self)
    }

    // ─── Symbol scopes ────────────────────────────────────────────

    /// Recompute the cached symbol table of a scope node.
    /// Does nothing for node types that are not scopes.
    pub fn collect_symbols(&mut self) -> Result<()> {
        let Some(policy) = self.ty.symbol_scope() else {
            return Ok(());
        };
        let table = SymbolTable::collect(self.child_values(), policy, self.kind())?;
        if let Some(i) = self.ty.field_index(SYMTABLE_FIELD) {
            self.fields[i] = table.to_value();
        }
        Ok(())
    }

    /// The cached symbol table, if this node is a scope.
    pub fn symbol_table(&self) -> Option<SymbolTable> {
        self.ty.symbol_scope()?;
        self.get(SYMTABLE_FIELD).map(SymbolTable::from_value)
    }

    /// Definition of `name` in this scope's symbol table.
    pub fn lookup(&self, name: &str) -> Option<&Arc<Node>> {
        self.get(SYMTABLE_FIELD)?.as_map()?.get(name)?.as_node()
    }

    fn child_values(&self) -> impl Iterator<Item = &Value> {
        self.iter_children().map(|(_, v)| v)
    }

    // ─── Crate-internal mutation ──────────────────────────────────

    /// Validate and store a value, bypassing the frozen check.
    pub(crate) fn assign(&mut self, index: usize, value: Value) -> Result<()> {
        let def = &self.ty.fields()[index];
        let value = def.validate(self.ty.name(), value)?;
        self.fields[index] = value;
        Ok(())
    }

    /// A copy of this node with some fields replaced, keeping the id.
    /// Every replacement is validated and a scope recollects its symbols.
    pub(crate) fn rebuild(&self, changes: Vec<(usize, Value)>) -> Result<Node> {
        let mut node = self.clone();
        for (index, value) in changes {
            node.assign(index, value)?;
        }
        node.collect_symbols()?;
        Ok(node)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id == other.id && self.fields == other.fields
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.kind());
        s.field("id", &self.id);
        for (def, value) in self.ty.fields().iter().zip(&self.fields) {
            if def.name() != SYMTABLE_FIELD {
                s.field(def.name(), value);
            }
        }
        s.finish()
    }
}

/// Serializes as a map: `kind`, `id`, then child and attribute fields.
/// Internal fields and the cached symbol table are left out.
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", self.kind())?;
        map.serialize_entry("id", &self.id)?;
        for (def, value) in self.ty.fields().iter().zip(&self.fields) {
            if def.role() == FieldRole::Internal || def.name() == SYMTABLE_FIELD {
                continue;
            }
            map.serialize_entry(def.name(), value)?;
        }
        map.end()
    }
}

// ─── Construction ─────────────────────────────────────────────────

/// Collects field values for a new node; [`NodeBuilder::finish`] validates.
pub struct NodeBuilder<'a> {
    ty: &'a Arc<NodeType>,
    id: Option<String>,
    ids: Option<&'a IdGenerator>,
    values: Vec<(String, Value)>,
}

impl<'a> NodeBuilder<'a> {
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.push((name.to_string(), value.into()));
        self
    }

    /// Use an explicit identity instead of generating one.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Generate the identity from `ids` instead of the global generator.
    pub fn ids(mut self, ids: &'a IdGenerator) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn finish(self) -> Result<Node> {
        let ty = self.ty;
        let kind = ty.name();

        let mut supplied: BTreeMap<String, Value> = BTreeMap::new();
        for (name, value) in self.values {
            if ty.field_index(&name).is_none() {
                return Err(IrError::validation(kind, &name, "no such field"));
            }
            supplied.insert(name, value);
        }

        let mut fields = Vec::with_capacity(ty.fields().len());
        for def in ty.fields() {
            let value = match supplied.remove(def.name()) {
                Some(v) => v,
                None => def
                    .initial()
                    .ok_or_else(|| IrError::validation(kind, def.name(), "field required"))?,
            };
            fields.push(def.validate(kind, value)?);
        }

        let id = match self.id {
            Some(id) => id,
            None => {
                let ids: &IdGenerator = match self.ids {
                    Some(ids) => ids,
                    None => IdGenerator::global(),
                };
                ids.next_id(Some(kind))
            }
        };

        let mut node = Node {
            ty: Arc::clone(ty),
            id,
            fields,
        };
        node.collect_symbols()?;
        Ok(node)
    }
}
