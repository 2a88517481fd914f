//! Tera-backed templates: a Jinja-like language with expressions, loops,
//! conditionals and filters.

use std::path::Path;

use tera::{Context, Tera};

use super::{read_source, Template};
use crate::codegen::context::Scope;
use crate::error::{IrError, Result};

const TEMPLATE_NAME: &str = "node";

#[derive(Debug)]
pub struct TeraTemplate {
    tera: Tera,
}

impl TeraTemplate {
    /// Parse `source`; syntax errors are reported here, not at render time.
    pub fn new(source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(template_error)?;
        Ok(Self { tera })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(&read_source(path)?)
    }
}

impl Template for TeraTemplate {
    fn render(&self, scope: &dyn Scope) -> Result<String> {
        let context = Context::from_serialize(scope.to_json()).map_err(template_error)?;
        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(template_error)
    }
}

/// Tera nests the useful message in the error's source chain.
fn template_error(err: tera::Error) -> IrError {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    IrError::Template(message)
}
