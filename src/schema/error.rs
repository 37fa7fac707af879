use thiserror::Error;

/// Errors produced while compiling SQL schema text into the Model IR.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown column type '{ty}' for column '{column}' in table '{table}'")]
    UnknownType {
        table: String,
        column: String,
        ty: String,
    },

    #[error("view '{view}' cannot resolve '{expr}'")]
    Unresolved { view: String, expr: String },

    #[error("duplicate definition of '{name}' in domain '{domain}'")]
    Duplicate { domain: String, name: String },
}
