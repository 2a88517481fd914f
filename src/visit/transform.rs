//! Structural rewriting.
//!
//! A transformer consumes a value and answers with a replacement or with
//! [`DELETE`]. Deletion is applied by the container that held the value:
//! lists and sets drop the element, maps drop the entry and a node field is
//! cleared to `None`. Mutable nodes that are not shared are updated in
//! place; frozen or shared nodes are copied, and only when something
//! below them actually changed.
//!
//! A copy keeps the id of the node it was made from, whether it is a
//! rebuilt frozen node or a shared mutable one. Code that still holds the
//! input tree can therefore see two nodes with one id and different
//! content; compare [`Node::content_hash`] rather than ids across a pass.

use std::sync::Arc;

use super::{resolve, Context};
use crate::error::Result;
use crate::node::value::dedup;
use crate::node::{Node, Value};

/// Outcome of transforming one value.
#[derive(Clone, Debug, PartialEq)]
pub enum Rewrite {
    Replace(Value),
    Delete,
}

/// Remove the visited value from its container.
pub const DELETE: Rewrite = Rewrite::Delete;

pub type Transformed = Result<Rewrite>;

impl Rewrite {
    /// The replacement value; `None` for a deletion.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Rewrite::Replace(v) => Some(v),
            Rewrite::Delete => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Rewrite::Delete)
    }
}

/// Tree rewriter. Implement [`Transformer::transform_kind`] with a `match`
/// on the kind name; unhandled kinds fall back to rewriting children.
pub trait Transformer {
    fn transform_kind(
        &mut self,
        _kind: &str,
        _node: &Arc<Node>,
        _ctx: &Context,
    ) -> Option<Transformed> {
        None
    }

    fn visit(&mut self, value: Value, ctx: &Context) -> Transformed {
        if let Value::Node(node) = &value {
            if let Some(result) = resolve(node, |kind| self.transform_kind(kind, node, ctx)) {
                return result;
            }
        }
        self.generic_visit(value, ctx)
    }

    fn generic_visit(&mut self, value: Value, ctx: &Context) -> Transformed {
        rewrite_children(self, value, ctx).map(Rewrite::Replace)
    }
}

/// Transform every direct child of `value` and rebuild it from the results.
pub fn rewrite_children<T: Transformer + ?Sized>(
    transformer: &mut T,
    value: Value,
    ctx: &Context,
) -> Result<Value> {
    match value {
        Value::Node(node) => rewrite_node(transformer, node, ctx).map(Value::Node),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Rewrite::Replace(v) = transformer.visit(item, ctx)? {
                    out.push(v);
                }
            }
            Ok(Value::List(out))
        }
        Value::Set(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Rewrite::Replace(v) = transformer.visit(item, ctx)? {
                    out.push(v);
                }
            }
            Ok(Value::Set(dedup(out)))
        }
        Value::Map(entries) => {
            let mut out = std::collections::BTreeMap::new();
            for (key, item) in entries {
                if let Rewrite::Replace(v) = transformer.visit(item, ctx)? {
                    out.insert(key, v);
                }
            }
            Ok(Value::Map(out))
        }
        leaf => Ok(leaf),
    }
}

fn rewrite_node<T: Transformer + ?Sized>(
    transformer: &mut T,
    mut node: Arc<Node>,
    ctx: &Context,
) -> Result<Arc<Node>> {
    let indices: Vec<usize> = node.child_indices().collect();

    if !node.is_frozen() {
        if let Some(owned) = Arc::get_mut(&mut node) {
            for i in indices {
                let old = std::mem::take(&mut owned.fields[i]);
                let new = transformer.visit(old, ctx)?.into_value().unwrap_or_default();
                owned.assign(i, new)?;
            }
            owned.collect_symbols()?;
            return Ok(node);
        }
    }

    let mut changes = Vec::new();
    for i in indices {
        let old = node.fields[i].clone();
        let new = transformer
            .visit(old.clone(), ctx)?
            .into_value()
            .unwrap_or_default();
        if new != old {
            changes.push((i, new));
        }
    }
    if changes.is_empty() {
        return Ok(node);
    }
    if node.is_frozen() {
        return node.rebuild(changes).map(Arc::new);
    }
    let owned = Arc::make_mut(&mut node);
    for (i, v) in changes {
        owned.assign(i, v)?;
    }
    owned.collect_symbols()?;
    Ok(node)
}
