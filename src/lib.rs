//! Typed tree IR framework for stencil compilers.
//!
//! Dialects declare node types ([`NodeType`]) whose fields are children
//! (traversed), attributes (trailing `_`) or internal (trailing `__`).
//! Passes read trees with [`Visitor`]s, rewrite them with
//! [`Transformer`]s, and a final pass renders source text with a
//! [`TemplatedGenerator`].

pub mod codegen;
pub mod config;
pub mod error;
pub mod node;
pub mod symtab;
pub mod traverse;
pub mod visit;

// Re-exports: the types a dialect needs, at the crate root
pub use codegen::{
    FormatTemplate, FormatterRegistry, Rendered, SubstitutionTemplate, Template,
    TemplatedGenerator, TeraTemplate,
};
pub use config::IrConfig;
pub use error::{IrError, Result};
pub use node::{
    source_location, Constraint, EnumType, FieldDef, FieldRole, FieldType, IdGenerator, Node,
    NodeType, SymbolName, SymbolRef, Value,
};
pub use symtab::{DuplicatePolicy, SymbolTable};
pub use traverse::{traverse, TraversalOrder, TreeRef};
pub use visit::{Context, Rewrite, Transformer, Visitor, DELETE};
