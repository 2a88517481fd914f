//! The templated generator: per-kind handlers and templates, resolved
//! along the node type's ancestry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::context::RenderContext;
use super::template::Template;
use super::Rendered;
use crate::config::IrConfig;
use crate::error::{IrError, Result};
use crate::node::{Node, Value};
use crate::traverse::TreeRef;
use crate::visit::{resolve, Context};

/// Custom rendering for one kind, bypassing its template.
pub type Handler =
    Arc<dyn Fn(&TemplatedGenerator, &Node, &Context) -> Result<Rendered> + Send + Sync>;

/// Turns a leaf value into text.
pub type LeafDumper = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// What to do with a node whose kind has no template anywhere in its
/// ancestry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTemplate {
    /// Render the node as an empty string.
    #[default]
    Empty,
    /// Fail with [`IrError::UnresolvedTemplate`].
    Error,
}

// ─── Generator ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TemplatedGenerator {
    name: String,
    templates: BTreeMap<String, Arc<dyn Template>>,
    handlers: BTreeMap<String, Handler>,
    dump_leaf: LeafDumper,
    missing: MissingTemplate,
}

impl TemplatedGenerator {
    pub fn builder(name: &str) -> GeneratorBuilder {
        GeneratorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn missing_template(&self) -> MissingTemplate {
        self.missing
    }

    /// Render everything reachable from `root`.
    pub fn apply<'a>(&self, root: impl Into<TreeRef<'a>>, ctx: &Context) -> Result<Rendered> {
        self.visit(root.into(), ctx)
    }

    /// Render independent trees in parallel, results in input order.
    pub fn apply_all(&self, roots: &[Arc<Node>], ctx: &Context) -> Result<Vec<Rendered>> {
        roots
            .par_iter()
            .map(|root| self.apply(root, ctx))
            .collect()
    }

    /// Handler for the closest kind in `node`'s ancestry, else the generic
    /// rendering.
    pub fn visit(&self, tree: TreeRef<'_>, ctx: &Context) -> Result<Rendered> {
        if let Some(node) = tree.node() {
            if let Some(handler) = resolve(node, |kind| self.handlers.get(kind)) {
                return handler(self, node, ctx);
            }
        }
        self.generic_visit(tree, ctx)
    }

    pub fn generic_visit(&self, tree: TreeRef<'_>, ctx: &Context) -> Result<Rendered> {
        if let Some(node) = tree.node() {
            return match self.get_template(node) {
                Some((_, template)) => self.render_template(template.as_ref(), node, ctx),
                None => self.missing(node),
            };
        }
        let Some(value) = tree.value() else {
            return Ok(Rendered::default());
        };
        match value {
            Value::List(items) | Value::Set(items) => items
                .iter()
                .map(|item| self.visit(TreeRef::Value(item), ctx))
                .collect::<Result<Vec<_>>>()
                .map(Rendered::List),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.visit(TreeRef::Value(item), ctx)?)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Rendered::Map),
            leaf => Ok(Rendered::Text((self.dump_leaf)(leaf))),
        }
    }

    /// Template of the closest kind in `node`'s ancestry, with that kind.
    pub fn get_template(&self, node: &Node) -> Option<(&str, &Arc<dyn Template>)> {
        node.node_type()
            .ancestry()
            .find_map(|kind| self.templates.get_key_value(kind))
            .map(|(kind, template)| (kind.as_str(), template))
    }

    /// Render every child field of `node`, keyed by field name.
    pub fn transform_children(
        &self,
        node: &Node,
        ctx: &Context,
    ) -> Result<BTreeMap<String, Rendered>> {
        node.iter_children()
            .map(|(name, value)| Ok((name.to_string(), self.visit(TreeRef::Value(value), ctx)?)))
            .collect()
    }

    /// Render `template` for `node` with its children rendered first.
    pub fn render_template(
        &self,
        template: &dyn Template,
        node: &Node,
        ctx: &Context,
    ) -> Result<Rendered> {
        let children = self.transform_children(node, ctx)?;
        let scope = RenderContext::new(self, node, children, ctx);
        template.render(&scope).map(Rendered::Text)
    }

    fn missing(&self, node: &Node) -> Result<Rendered> {
        match self.missing {
            MissingTemplate::Empty => {
                tracing::debug!(
                    kind = node.kind(),
                    generator = %self.name,
                    "no template, rendering as empty"
                );
                Ok(Rendered::default())
            }
            MissingTemplate::Error => Err(IrError::UnresolvedTemplate {
                kind: node.kind().to_string(),
                generator: self.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for TemplatedGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatedGenerator")
            .field("name", &self.name)
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("missing", &self.missing)
            .finish()
    }
}

// ─── Builder ──────────────────────────────────────────────────────

/// Collects templates and handlers. Registrations made on the builder
/// take precedence over anything inherited through [`extends`].
///
/// [`extends`]: GeneratorBuilder::extends
pub struct GeneratorBuilder {
    name: String,
    inherited_templates: BTreeMap<String, Arc<dyn Template>>,
    inherited_handlers: BTreeMap<String, Handler>,
    templates: BTreeMap<String, Arc<dyn Template>>,
    handlers: BTreeMap<String, Handler>,
    dump_leaf: Option<LeafDumper>,
    missing: Option<MissingTemplate>,
}

impl GeneratorBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inherited_templates: BTreeMap::new(),
            inherited_handlers: BTreeMap::new(),
            templates: BTreeMap::new(),
            handlers: BTreeMap::new(),
            dump_leaf: None,
            missing: None,
        }
    }

    /// Inherit `parent`'s templates, handlers, leaf dumper and missing
    /// template policy. Templates and handlers of later parents override
    /// earlier ones.
    pub fn extends(mut self, parent: &TemplatedGenerator) -> Self {
        self.inherited_templates.extend(
            parent
                .templates
                .iter()
                .map(|(k, t)| (k.clone(), Arc::clone(t))),
        );
        self.inherit_rest(parent)
    }

    /// Like [`GeneratorBuilder::extends`] without the templates.
    pub fn extends_handlers_only(self, parent: &TemplatedGenerator) -> Self {
        self.inherit_rest(parent)
    }

    fn inherit_rest(mut self, parent: &TemplatedGenerator) -> Self {
        self.inherited_handlers.extend(
            parent
                .handlers
                .iter()
                .map(|(k, h)| (k.clone(), Arc::clone(h))),
        );
        self.dump_leaf.get_or_insert_with(|| Arc::clone(&parent.dump_leaf));
        self.missing.get_or_insert(parent.missing);
        self
    }

    pub fn template(self, kind: &str, template: impl Template + 'static) -> Self {
        self.shared_template(kind, Arc::new(template))
    }

    pub fn shared_template(mut self, kind: &str, template: Arc<dyn Template>) -> Self {
        self.templates.insert(kind.to_string(), template);
        self
    }

    pub fn handler<F>(mut self, kind: &str, handler: F) -> Self
    where
        F: Fn(&TemplatedGenerator, &Node, &Context) -> Result<Rendered> + Send + Sync + 'static,
    {
        self.handlers.insert(kind.to_string(), Arc::new(handler));
        self
    }

    pub fn leaf_dumper<F>(mut self, dump: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        let dump: LeafDumper = Arc::new(dump);
        self.dump_leaf = Some(dump);
        self
    }

    /// Fail on nodes without a template instead of rendering `""`.
    pub fn strict(mut self) -> Self {
        self.missing = Some(MissingTemplate::Error);
        self
    }

    pub fn configure(mut self, config: &IrConfig) -> Self {
        self.missing = Some(config.codegen.missing_template);
        self
    }

    pub fn build(self) -> TemplatedGenerator {
        let mut templates = self.inherited_templates;
        templates.extend(self.templates);
        let mut handlers = self.inherited_handlers;
        handlers.extend(self.handlers);
        let dump_leaf: LeafDumper = match self.dump_leaf {
            Some(dump) => dump,
            None => Arc::new(|value: &Value| value.to_string()),
        };
        TemplatedGenerator {
            name: self.name,
            templates,
            handlers,
            dump_leaf,
            missing: self.missing.unwrap_or_default(),
        }
    }
}
