//! Template backends.
//!
//! Every backend renders against a [`Scope`]; the generator does not care
//! which backend a kind's template uses.

mod strfmt;
mod subst;
mod tera;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::context::Scope;
use crate::error::{IrError, Result};

pub use self::tera::TeraTemplate;
pub use strfmt::FormatTemplate;
pub use subst::SubstitutionTemplate;

/// A text blueprint rendered against named values.
pub trait Template: Send + Sync + fmt::Debug {
    fn render(&self, scope: &dyn Scope) -> Result<String>;
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| IrError::io(path, e))
}

type RenderFn = dyn Fn(&dyn Scope) -> Result<String> + Send + Sync;

/// A template implemented by a closure.
#[derive(Clone)]
pub struct FnTemplate {
    render: Arc<RenderFn>,
}

impl FnTemplate {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&dyn Scope) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
        }
    }
}

impl fmt::Debug for FnTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnTemplate")
    }
}

impl Template for FnTemplate {
    fn render(&self, scope: &dyn Scope) -> Result<String> {
        (self.render)(scope)
    }
}
