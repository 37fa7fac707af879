use thiserror::Error;

/// A rule-document parse failure, located by 1-based line number.
#[derive(Debug, Error)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}
