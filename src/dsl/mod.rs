//! Rule DSL frontend.
//!
//! Parses Gherkin-flavoured rule documents into [`RuleDef`] entries. The
//! frontend types literals by lexical shape and normalizes operator phrases;
//! it performs no cross-referencing against the schema, that is the
//! validator's job.

mod error;
mod grammar;

use winnow::prelude::*;

use crate::types::RuleDef;

pub use self::error::ParseError;

/// Parse one rule document into its rule definitions, in document order.
///
/// # Errors
///
/// Returns [`ParseError`] with a 1-based line number for any malformed
/// scenario, unknown operator, or unrecognized literal shape.
pub fn parse_rules(input: &str) -> Result<Vec<RuleDef>, ParseError> {
    grammar::rule_file.parse(input).map_err(|e| ParseError {
        line: line_of(input, e.offset()),
        message: e.inner().to_string(),
    })
}

fn line_of(input: &str, offset: usize) -> usize {
    input[..offset.min(input.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}
