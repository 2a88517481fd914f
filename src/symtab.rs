//! Tree-wide symbol collection.
//!
//! A scope node owns a table mapping every symbol name defined anywhere
//! below it to the node that defines it. The table is filled by a single
//! pre-order scan, so a definition is always recorded before any node
//! that follows it in document order.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{IrError, Result};
use crate::node::{Node, SymbolRef, Value};
use crate::traverse::{traverse, TraversalOrder};

/// What to do when a scope collects two definitions of one name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The definition found last in pre-order wins.
    #[default]
    Overwrite,
    /// Fail with [`IrError::DuplicateSymbol`].
    Reject,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTable {
    entries: BTreeMap<String, Arc<Node>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `values` in pre-order and record each symbol-typed child field.
    /// `scope` names the owning node kind in logs and errors.
    pub fn collect<'a>(
        values: impl IntoIterator<Item = &'a Value>,
        policy: DuplicatePolicy,
        scope: &str,
    ) -> Result<Self> {
        let mut table = Self::new();
        for value in values {
            for (_, tree) in traverse(value, TraversalOrder::Pre) {
                let Some(node) = tree.shared_node() else {
                    continue;
                };
                for (def, field) in node.node_type().fields().iter().zip(&node.fields) {
                    if !def.ty().defines_symbol() {
                        continue;
                    }
                    if let Value::Symbol(name) = field {
                        table.insert(name.as_str(), node, policy, scope)?;
                    }
                }
            }
        }
        tracing::trace!(scope, symbols = table.len(), "collected symbols");
        Ok(table)
    }

    /// Table for the subtree below `root`; `root`'s own fields are not entries.
    pub fn of(root: &Node, policy: DuplicatePolicy) -> Result<Self> {
        Self::collect(root.iter_children().map(|(_, v)| v), policy, root.kind())
    }

    pub fn insert(
        &mut self,
        name: &str,
        node: &Arc<Node>,
        policy: DuplicatePolicy,
        scope: &str,
    ) -> Result<()> {
        if let Some(previous) = self.entries.get(name) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(IrError::DuplicateSymbol {
                        name: name.to_string(),
                        scope: scope.to_string(),
                    });
                }
                DuplicatePolicy::Overwrite => {
                    tracing::debug!(
                        symbol = name,
                        scope,
                        previous = previous.id(),
                        current = node.id(),
                        "symbol redefined, keeping the later definition"
                    );
                }
            }
        }
        self.entries.insert(name.to_string(), Arc::clone(node));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Node>> {
        self.entries.get(name)
    }

    /// Definition of `symbol`, or [`IrError::UnboundSymbol`].
    pub fn resolve(&self, symbol: &SymbolRef) -> Result<&Arc<Node>> {
        self.get(symbol.as_str())
            .ok_or_else(|| IrError::UnboundSymbol {
                name: symbol.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Node>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::Node(Arc::clone(v))))
                .collect(),
        )
    }

    pub(crate) fn from_value(value: &Value) -> Self {
        let entries = value
            .as_map()
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_node().map(|n| (k.clone(), Arc::clone(n))))
                    .collect()
            })
            .unwrap_or_default();
        Self { entries }
    }
}

impl SymbolRef {
    /// Look this reference up in `table`.
    pub fn resolve<'t>(&self, table: &'t SymbolTable) -> Result<&'t Arc<Node>> {
        table.resolve(self)
    }
}
