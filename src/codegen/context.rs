//! Names visible to a template while it renders one node.

use std::collections::BTreeMap;

use super::generator::TemplatedGenerator;
use super::Rendered;
use crate::node::{Node, Value, SYMTABLE_FIELD};
use crate::visit::Context;

pub const THIS_NODE: &str = "_this_node";
pub const THIS_GENERATOR: &str = "_this_generator";
pub const CHILDREN: &str = "_children";
pub const ATTRS: &str = "_attrs";

// ─── Slots ────────────────────────────────────────────────────────

/// A value a template can reach by name, attribute or index.
#[derive(Clone, Copy)]
pub enum Slot<'a> {
    /// Output of rendering a child.
    Rendered(&'a Rendered),
    /// A raw field value or caller keyword.
    Value(&'a Value),
    /// The node being rendered.
    Node(&'a Node),
    Generator(&'a TemplatedGenerator),
}

impl<'a> Slot<'a> {
    /// `slot.name`: map entry or node field.
    pub fn attr(&self, name: &str) -> Option<Slot<'a>> {
        match *self {
            Slot::Rendered(Rendered::Map(entries)) => entries.get(name).map(Slot::Rendered),
            Slot::Value(Value::Map(entries)) => entries.get(name).map(Slot::Value),
            Slot::Value(Value::Node(node)) => node.as_ref().get(name).map(Slot::Value),
            Slot::Node(node) => node.get(name).map(Slot::Value),
            _ => None,
        }
    }

    /// `slot[i]` on lists and sets.
    pub fn index(&self, i: usize) -> Option<Slot<'a>> {
        match *self {
            Slot::Rendered(Rendered::List(items)) => items.get(i).map(Slot::Rendered),
            Slot::Value(Value::List(items) | Value::Set(items)) => items.get(i).map(Slot::Value),
            _ => None,
        }
    }

    /// `slot[key]`: an index when `key` is numeric and the slot is a
    /// sequence, a map entry or field otherwise.
    pub fn item(&self, key: &str) -> Option<Slot<'a>> {
        key.parse::<usize>()
            .ok()
            .and_then(|i| self.index(i))
            .or_else(|| self.attr(key))
    }

    /// Members of a collection slot (map values for maps).
    pub fn items(&self) -> Option<Vec<Slot<'a>>> {
        match *self {
            Slot::Rendered(Rendered::List(items)) => Some(items.iter().map(Slot::Rendered).collect()),
            Slot::Rendered(Rendered::Map(entries)) => {
                Some(entries.values().map(Slot::Rendered).collect())
            }
            Slot::Value(Value::List(items) | Value::Set(items)) => {
                Some(items.iter().map(Slot::Value).collect())
            }
            Slot::Value(Value::Map(entries)) => Some(entries.values().map(Slot::Value).collect()),
            _ => None,
        }
    }

    /// Default text of the slot.
    pub fn text(&self) -> String {
        match *self {
            Slot::Rendered(r) => r.to_string(),
            Slot::Value(v) => v.to_string(),
            Slot::Node(n) => format!("{}({})", n.kind(), n.id()),
            Slot::Generator(g) => g.name().to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Slot::Rendered(r) => serde_json::to_value(r).unwrap_or_default(),
            Slot::Value(v) => serde_json::to_value(v).unwrap_or_default(),
            Slot::Node(n) => serde_json::to_value(n).unwrap_or_default(),
            Slot::Generator(g) => serde_json::json!({ "name": g.name() }),
        }
    }
}

// ─── Scopes ───────────────────────────────────────────────────────

/// Name lookup for template rendering.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Slot<'_>>;

    /// Every name [`Scope::lookup`] can resolve.
    fn names(&self) -> Vec<String>;

    /// All names as one JSON object.
    fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for name in self.names() {
            if let Some(slot) = self.lookup(&name) {
                object.insert(name, slot.to_json());
            }
        }
        serde_json::Value::Object(object)
    }
}

impl Scope for Context {
    fn lookup(&self, name: &str) -> Option<Slot<'_>> {
        self.get(name).map(Slot::Value)
    }

    fn names(&self) -> Vec<String> {
        self.iter().map(|(k, _)| k.to_string()).collect()
    }
}

/// Everything a template sees when rendering one node.
///
/// Lookup order: the reserved `_this_node`, `_this_generator`,
/// `_children` and `_attrs`, then rendered children, raw attributes and
/// finally caller keywords.
pub struct RenderContext<'a> {
    node: &'a Node,
    generator: &'a TemplatedGenerator,
    children: Rendered,
    attrs: Value,
    kwargs: &'a Context,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        generator: &'a TemplatedGenerator,
        node: &'a Node,
        children: BTreeMap<String, Rendered>,
        kwargs: &'a Context,
    ) -> Self {
        let attrs = node
            .iter_attributes()
            .filter(|(name, _)| *name != SYMTABLE_FIELD)
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Self {
            node,
            generator,
            children: Rendered::Map(children),
            attrs: Value::Map(attrs),
            kwargs,
        }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn generator(&self) -> &'a TemplatedGenerator {
        self.generator
    }

    /// Rendered child fields by name.
    pub fn child(&self, name: &str) -> Option<&Rendered> {
        self.children.as_map()?.get(name)
    }

    /// Raw attribute fields by name.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.as_map()?.get(name)
    }

    pub fn kwargs(&self) -> &'a Context {
        self.kwargs
    }
}

impl Scope for RenderContext<'_> {
    fn lookup(&self, name: &str) -> Option<Slot<'_>> {
        match name {
            THIS_NODE => Some(Slot::Node(self.node)),
            THIS_GENERATOR => Some(Slot::Generator(self.generator)),
            CHILDREN => Some(Slot::Rendered(&self.children)),
            ATTRS => Some(Slot::Value(&self.attrs)),
            _ => self
                .child(name)
                .map(Slot::Rendered)
                .or_else(|| self.attr(name).map(Slot::Value))
                .or_else(|| self.kwargs.get(name).map(Slot::Value)),
        }
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = [THIS_NODE, THIS_GENERATOR, CHILDREN, ATTRS]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let children = self.children.as_map().into_iter().flat_map(|m| m.keys());
        let attrs = self.attrs.as_map().into_iter().flat_map(|m| m.keys());
        for name in children.chain(attrs) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        for (name, _) in self.kwargs.iter() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}
