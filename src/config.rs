//! Framework configuration from `stencil-ir.toml`.
//!
//! ```toml
//! [ids]
//! strategy = "sequential"   # or "random"
//! width = 4
//!
//! [symbols]
//! pattern = "[a-z_][a-z0-9_]*"
//! duplicates = "reject"     # or "overwrite"
//!
//! [codegen]
//! missing_template = "error"  # or "empty"
//! strict_formatting = false
//!
//! [formatters.cpp]
//! command = "clang-format"
//! args = ["--style=LLVM"]
//! ```
//!
//! Every section and key is optional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::codegen::{CommandFormatter, FormatterRegistry, MissingTemplate};
use crate::error::{IrError, Result};
use crate::node::{IdGenerator, IdStrategy, SymbolPattern};
use crate::symtab::DuplicatePolicy;

pub const CONFIG_FILE: &str = "stencil-ir.toml";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IrConfig {
    pub ids: IdsConfig,
    pub symbols: SymbolsConfig,
    pub codegen: CodegenConfig,
    /// External formatter per language name.
    pub formatters: BTreeMap<String, FormatterConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdsConfig {
    pub strategy: IdStrategy,
    /// Zero-padding for sequential ids, hex length for random ones.
    pub width: Option<usize>,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            strategy: IdStrategy::Sequential,
            width: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SymbolsConfig {
    /// Pattern symbol names must match; the identifier pattern if unset.
    pub pattern: Option<String>,
    pub duplicates: DuplicatePolicy,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    pub missing_template: MissingTemplate,
    /// Fail instead of returning unformatted source.
    pub strict_formatting: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl IrConfig {
    /// Load configuration from a `stencil-ir.toml` file.
    pub fn load(path: &Path) -> Result<IrConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| IrError::io(path, e))?;
        Self::from_toml_str(&content)
            .map_err(|e| IrError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<IrConfig> {
        toml::from_str(content).map_err(|e| IrError::Config(e.message().to_string()))
    }

    /// Try to find a `stencil-ir.toml` in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Load the nearest configuration above `start_dir`, or the defaults
    /// when there is none.
    pub fn discover(start_dir: &Path) -> Result<IrConfig> {
        match Self::find(start_dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            None => Ok(IrConfig::default()),
        }
    }

    pub fn id_generator(&self) -> Result<IdGenerator> {
        IdGenerator::with_strategy(self.ids.strategy, self.ids.width)
    }

    pub fn symbol_pattern(&self) -> Result<SymbolPattern> {
        match &self.symbols.pattern {
            Some(pattern) => SymbolPattern::new(pattern),
            None => Ok(SymbolPattern::default()),
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.symbols.duplicates
    }

    /// A registry with one [`CommandFormatter`] per `[formatters.*]` table.
    pub fn formatter_registry(&self) -> Result<FormatterRegistry> {
        let mut registry = FormatterRegistry::new();
        for (language, formatter) in &self.formatters {
            if formatter.command.trim().is_empty() {
                return Err(IrError::Config(format!(
                    "formatter for '{}' has an empty command",
                    language
                )));
            }
            let args: Vec<&str> = formatter.args.iter().map(String::as_str).collect();
            registry.register(
                language,
                CommandFormatter::new(language, &formatter.command, &args),
            )?;
        }
        Ok(registry)
    }
}
