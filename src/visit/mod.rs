//! Visitor and transformer dispatch.
//!
//! Handlers are looked up by kind name along the node type's declared
//! ancestry: the concrete type first, then each parent, then the base
//! `Node`. The first handler that answers wins; when none does, the
//! generic behavior recurses into the children. Context is an explicit
//! keyword map that handlers pass on (or extend) when they recurse.

pub mod transform;


use std::collections::BTreeMap;

use crate::error::Result;
use crate::node::{Node, Value};
use crate::traverse::{generic_children, TreeRef};

pub use transform::{rewrite_children, Rewrite, Transformer, Transformed, DELETE};

// ─── Context ──────────────────────────────────────────────────────

/// Keyword arguments carried through a visit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this context with one more entry.
    pub fn with(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.insert(key, value);
        next
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ─── Dispatch ─────────────────────────────────────────────────────

/// First answer of `handler` along `node`'s ancestry.
pub fn resolve<T>(node: &Node, handler: impl FnMut(&str) -> Option<T>) -> Option<T> {
    node.node_type().ancestry().find_map(handler)
}

/// Read-only tree walker.
///
/// Implement [`Visitor::visit_kind`] with a `match` on the kind name;
/// return `None` for kinds you do not handle so lookup continues with the
/// parent type.
pub trait Visitor {
    type Output: Default;

    /// Handler for nodes whose type is, or derives from, `kind`.
    fn visit_kind(
        &mut self,
        _kind: &str,
        _node: &Node,
        _ctx: &Context,
    ) -> Option<Result<Self::Output>> {
        None
    }

    /// Handler for non-node values (leaves and collections).
    fn visit_value(&mut self, _value: &Value, _ctx: &Context) -> Option<Result<Self::Output>> {
        None
    }

    fn visit(&mut self, tree: TreeRef<'_>, ctx: &Context) -> Result<Self::Output> {
        let handled = match (tree.node(), tree.value()) {
            (Some(node), _) => resolve(node, |kind| self.visit_kind(kind, node, ctx)),
            (None, Some(value)) => self.visit_value(value, ctx),
            (None, None) => None,
        };
        match handled {
            Some(result) => result,
            None => self.generic_visit(tree, ctx),
        }
    }

    /// Visit every direct child, discarding their outputs.
    fn generic_visit(&mut self, tree: TreeRef<'_>, ctx: &Context) -> Result<Self::Output> {
        walk_children(self, tree, ctx)?;
        Ok(Self::Output::default())
    }
}

/// Visit each direct child of `tree` with `visitor`.
pub fn walk_children<V: Visitor + ?Sized>(
    visitor: &mut V,
    tree: TreeRef<'_>,
    ctx: &Context,
) -> Result<()> {
    for child in generic_children(tree).values() {
        visitor.visit(child, ctx)?;
    }
    Ok(())
}
