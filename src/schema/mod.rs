//! SQL DDL schema compiler.
//!
//! Parses `CREATE TABLE` and `CREATE VIEW` statements (with `-- domain:`
//! markers) and lowers them into the neutral-typed [`ModelIr`].

mod error;
mod grammar;
mod resolve;

use winnow::prelude::*;

pub use self::error::SchemaError;
pub use crate::types::ModelIr;

/// Compile one schema document into a Model IR.
///
/// Statements before the first `-- domain:` marker land in the `core`
/// domain. View definitions may reference tables declared later in the
/// same document.
///
/// # Errors
///
/// Returns [`SchemaError::Syntax`] with a 1-based line number for
/// malformed DDL, and the resolution variants for unknown column types,
/// unresolvable view expressions, or duplicate names within a domain.
pub fn parse_schema(input: &str) -> Result<ModelIr, SchemaError> {
    let statements = grammar::schema_file
        .parse(input)
        .map_err(|e| SchemaError::Syntax {
            line: line_of(input, e.offset()),
            message: e.inner().to_string(),
        })?;
    resolve::build_ir(statements)
}

fn line_of(input: &str, offset: usize) -> usize {
    input[..offset.min(input.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}
