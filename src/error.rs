use thiserror::Error;

use crate::dsl::ParseError;
use crate::schema::SchemaError;
use crate::types::{CompileError, ValidateError};

/// Unified error type covering every pipeline stage plus I/O.
///
/// Returned by convenience methods like
/// [`RuleBook::from_sources()`](crate::RuleBook::from_sources) and
/// [`RuleBook::from_files()`](crate::RuleBook::from_files).
#[derive(Debug, Error)]
pub enum GavelError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("malformed metadata registry: {0}")]
    Registry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
