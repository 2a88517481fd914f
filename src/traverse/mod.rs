//! Generic tree traversal.
//!
//! The tree is whatever is reachable from a node through its child fields
//! and collections. Attribute and internal fields are never entered;
//! strings and bytes are atomic leaves. Traversals are lazy, yield every
//! reachable value (root, nodes, collections and leaves) exactly once per
//! occurrence, and terminate because trees are acyclic.


use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::IrError;
use crate::node::{Node, Value};

// ─── Tree positions ───────────────────────────────────────────────

/// Traversal order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Parents before children, children in declaration order.
    #[default]
    Pre,
    /// Children before parents.
    Post,
    /// Breadth-first, level by level.
    Levels,
}

impl FromStr for TraversalOrder {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" | "preorder" => Ok(TraversalOrder::Pre),
            "post" | "postorder" => Ok(TraversalOrder::Post),
            "levels" | "bfs" => Ok(TraversalOrder::Levels),
            other => Err(IrError::Config(format!(
                "unknown traversal order '{}'",
                other
            ))),
        }
    }
}

/// How a child is reached from its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Key<'a> {
    /// Field name of a node.
    Field(&'a str),
    /// Position in a list.
    Index(usize),
    /// Members of a set are their own keys.
    Member(&'a Value),
    /// Key of a map entry.
    Entry(&'a str),
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) | Key::Entry(name) => f.write_str(name),
            Key::Index(i) => write!(f, "{}", i),
            Key::Member(v) => write!(f, "{}", v),
        }
    }
}

/// A borrowed position in a tree: either a bare node (a traversal root)
/// or a field value.
#[derive(Clone, Copy, Debug)]
pub enum TreeRef<'a> {
    Node(&'a Node),
    Value(&'a Value),
}

impl<'a> TreeRef<'a> {
    /// The node at this position, if it is one.
    pub fn node(&self) -> Option<&'a Node> {
        match self {
            TreeRef::Node(n) => Some(n),
            TreeRef::Value(Value::Node(n)) => Some(n),
            TreeRef::Value(_) => None,
        }
    }

    /// The shared handle of a node reached through a field.
    pub fn shared_node(&self) -> Option<&'a Arc<Node>> {
        match self {
            TreeRef::Value(Value::Node(n)) => Some(n),
            _ => None,
        }
    }

    /// The value at this position; `None` for a bare root node.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            TreeRef::Value(v) => Some(v),
            TreeRef::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool {
        self.node().is_some()
    }
}

impl<'a> From<&'a Node> for TreeRef<'a> {
    fn from(node: &'a Node) -> Self {
        TreeRef::Node(node)
    }
}

impl<'a> From<&'a Arc<Node>> for TreeRef<'a> {
    fn from(node: &'a Arc<Node>) -> Self {
        TreeRef::Node(node)
    }
}

impl<'a> From<&'a Value> for TreeRef<'a> {
    fn from(value: &'a Value) -> Self {
        TreeRef::Value(value)
    }
}

// ─── Single-level iteration ───────────────────────────────────────

/// Direct children of one tree position, with their keys.
pub struct Children<'a> {
    inner: std::vec::IntoIter<(Key<'a>, TreeRef<'a>)>,
}

impl<'a> Children<'a> {
    /// Drop the keys.
    pub fn values(self) -> impl Iterator<Item = TreeRef<'a>> {
        self.inner.map(|(_, tree)| tree)
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = (Key<'a>, TreeRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Direct children of a node (its child fields), a list (by index), a set
/// (by member) or a map (by key). Every other value has none.
pub fn generic_children<'a>(tree: impl Into<TreeRef<'a>>) -> Children<'a> {
    let tree = tree.into();
    let items: Vec<(Key<'a>, TreeRef<'a>)> = if let Some(node) = tree.node() {
        node.iter_children()
            .map(|(name, value)| (Key::Field(name), TreeRef::Value(value)))
            .collect()
    } else {
        match tree.value() {
            Some(Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), TreeRef::Value(v)))
                .collect(),
            Some(Value::Set(items)) => items
                .iter()
                .map(|v| (Key::Member(v), TreeRef::Value(v)))
                .collect(),
            Some(Value::Map(entries)) => entries
                .iter()
                .map(|(k, v)| (Key::Entry(k.as_str()), TreeRef::Value(v)))
                .collect(),
            _ => Vec::new(),
        }
    };
    Children {
        inner: items.into_iter(),
    }
}

// ─── Full traversals ──────────────────────────────────────────────

type Entry<'a> = (Option<Key<'a>>, TreeRef<'a>);

struct Frame<'a> {
    key: Option<Key<'a>>,
    tree: TreeRef<'a>,
    children: Option<Children<'a>>,
}

enum State<'a> {
    Pre(Vec<Entry<'a>>),
    Post(Vec<Frame<'a>>),
    Levels(VecDeque<Entry<'a>>),
}

/// Lazy, one-shot iterator over `(key, position)` pairs. The root comes
/// with key `None`.
pub struct Traversal<'a> {
    state: State<'a>,
}

/// Traverse everything reachable from `root` in the given order.
pub fn traverse<'a>(root: impl Into<TreeRef<'a>>, order: TraversalOrder) -> Traversal<'a> {
    let root = (None, root.into());
    let state = match order {
        TraversalOrder::Pre => State::Pre(vec![root]),
        TraversalOrder::Post => State::Post(vec![Frame {
            key: root.0,
            tree: root.1,
            children: None,
        }]),
        TraversalOrder::Levels => State::Levels(VecDeque::from([root])),
    };
    Traversal { state }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            State::Pre(stack) => {
                let (key, tree) = stack.pop()?;
                let children: Vec<_> = generic_children(tree).collect();
                stack.extend(
                    children
                        .into_iter()
                        .rev()
                        .map(|(k, child)| (Some(k), child)),
                );
                Some((key, tree))
            }
            State::Post(stack) => loop {
                let top = stack.last_mut()?;
                let tree = top.tree;
                let children = top
                    .children
                    .get_or_insert_with(|| generic_children(tree));
                if let Some((k, child)) = children.next() {
                    stack.push(Frame {
                        key: Some(k),
                        tree: child,
                        children: None,
                    });
                    continue;
                }
                let done = stack.pop()?;
                return Some((done.key, done.tree));
            },
            State::Levels(queue) => {
                let (key, tree) = queue.pop_front()?;
                queue.extend(generic_children(tree).map(|(k, child)| (Some(k), child)));
                Some((key, tree))
            }
        }
    }
}

impl<'a> Traversal<'a> {
    /// Only the nodes, in traversal order.
    pub fn nodes(self) -> impl Iterator<Item = &'a Node> {
        self.filter_map(|(_, tree)| tree.node())
    }

    /// Only the positions, without keys.
    pub fn values(self) -> impl Iterator<Item = TreeRef<'a>> {
        self.map(|(_, tree)| tree)
    }
}

/// Nodes below and including `root`, in pre-order, that satisfy `predicate`.
pub fn find_nodes<'a, F>(root: impl Into<TreeRef<'a>>, mut predicate: F) -> Vec<&'a Node>
where
    F: FnMut(&Node) -> bool,
{
    traverse(root, TraversalOrder::Pre)
        .nodes()
        .filter(|n| predicate(n))
        .collect()
}

/// Nodes of `kind` or one of its subtypes, in pre-order.
pub fn find_kind<'a>(root: impl Into<TreeRef<'a>>, kind: &str) -> Vec<&'a Node> {
    find_nodes(root, |n| n.is_a(kind))
}
