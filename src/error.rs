//! Error kinds raised by the IR framework.
//!
//! Traversal and dispatch never fail on their own account. Errors come from
//! node validation, frozen-node mutation, template rendering, symbol
//! resolution, formatters and configuration loading, and they reach the
//! caller unchanged.

/// Crate-wide error type.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    /// A field value does not conform to its declared type or constraints.
    #[error("invalid field '{field}' in '{kind}': {message}")]
    Validation {
        kind: String,
        field: String,
        message: String,
    },

    /// Assignment to a field of a frozen node.
    #[error("cannot assign field '{field}' of frozen node '{kind}'")]
    ImmutableMutation { kind: String, field: String },

    /// Strict code generation found a node kind without any template.
    #[error("no template for node kind '{kind}' in generator '{generator}'")]
    UnresolvedTemplate { kind: String, generator: String },

    /// A symbol reference has no definition in the symbol table.
    #[error("unbound symbol '{name}'")]
    UnboundSymbol { name: String },

    /// A scope collected two definitions of the same name.
    #[error("duplicate definition of symbol '{name}' in scope '{scope}'")]
    DuplicateSymbol { name: String, scope: String },

    /// The source formatter for a language is missing or failed.
    #[error("formatter for '{language}' unavailable: {reason}")]
    FormatterUnavailable { language: String, reason: String },

    /// Template parsing or rendering failed.
    #[error("template error: {0}")]
    Template(String),

    /// A node type declaration is malformed.
    #[error("invalid node type '{kind}': {message}")]
    Schema { kind: String, message: String },

    /// Configuration could not be parsed or applied.
    #[error("config error: {0}")]
    Config(String),

    /// Reading a template or configuration file failed.
    #[error("cannot read '{path}': {message}")]
    Io { path: String, message: String },
}

impl IrError {
    pub fn validation(
        kind: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        IrError::Validation {
            kind: kind.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        IrError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = IrError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = IrError::validation("Literal", "value", "expected str, found int");
        assert_eq!(
            err.to_string(),
            "invalid field 'value' in 'Literal': expected str, found int"
        );
    }

    #[test]
    fn test_immutable_message() {
        let err = IrError::ImmutableMutation {
            kind: "Offset".into(),
            field: "i".into(),
        };
        assert!(err.to_string().contains("frozen node 'Offset'"));
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = IrError::io(
            std::path::Path::new("/nowhere/template.fmt"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        match err {
            IrError::Io { path, .. } => assert_eq!(path, "/nowhere/template.fmt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
