use std::fmt;

use thiserror::Error;

use super::neutral::NeutralType;
use super::rule::{CompareOp, Logic, TargetKind};
use super::value::Value;

/// Fatal cross-reference errors. Any of these aborts compilation; there is
/// no partial rule set.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("rule '{rule}' targets unknown {kind} '{name}' in domain '{domain}'")]
    UnknownTarget {
        rule: String,
        kind: TargetKind,
        name: String,
        domain: String,
    },

    #[error("unknown field '{field}' on target '{target}' in rule '{rule}'")]
    UnknownField {
        rule: String,
        target: String,
        field: String,
    },

    #[error("field '{field}' has non-comparable type {ty} in rule '{rule}'")]
    NonComparableField {
        rule: String,
        field: String,
        ty: NeutralType,
    },

    #[error("literal {value} does not fit field '{field}' of type {ty} in rule '{rule}'")]
    LiteralTypeMismatch {
        rule: String,
        field: String,
        ty: NeutralType,
        value: Value,
    },

    #[error("ordering operator {op} applied to bool field '{field}' in rule '{rule}'")]
    OrderingOnBool {
        rule: String,
        field: String,
        op: CompareOp,
    },

    #[error("compound condition in rule '{rule}' has no clauses")]
    EmptyCompound { rule: String },

    #[error("unknown metadata category '{category}' in rule '{rule}'")]
    UnknownCategory { rule: String, category: String },

    #[error("metadata category '{category}' is disabled (rule '{rule}')")]
    DisabledCategory { rule: String, category: String },

    #[error("unknown metadata field '{field}' in category '{category}' (rule '{rule}')")]
    UnknownMetadataField {
        rule: String,
        category: String,
        field: String,
    },
}

/// Errors from the rule backend compiler.
///
/// After validation these are unreachable, but the backend checks its own
/// inputs so it stays usable on externally supplied IR.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("rule '{rule}' targets unknown {kind} '{name}' in domain '{domain}'")]
    UnknownTarget {
        rule: String,
        kind: TargetKind,
        name: String,
        domain: String,
    },

    #[error("unknown field '{field}' on target of rule '{rule}'")]
    UnknownField { rule: String, field: String },

    #[error("unknown metadata category '{category}' in rule '{rule}'")]
    UnknownCategory { rule: String, category: String },

    #[error("unknown metadata field '{field}' in category '{category}' (rule '{rule}')")]
    UnknownMetadataField {
        rule: String,
        category: String,
        field: String,
    },
}

/// Non-fatal authoring lints. Reported alongside a successful validation,
/// never abort compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticWarning {
    /// A string literal exactly matches another field declared on the same
    /// target. The DSL has no syntax for field-to-field comparison, so this
    /// is very likely an authoring mistake, but it may also be a genuine
    /// literal that happens to collide, so it stays a lint.
    LiteralMatchesField {
        rule: String,
        field: String,
        literal: String,
    },

    /// Two clauses in a compound block compare the same field against the
    /// same literal with complementary `==`/`!=`: a tautology under OR, a
    /// contradiction under AND.
    TautologicalClause {
        rule: String,
        field: String,
        logic: Logic,
    },

    /// Rule or status name too short to be meaningful.
    NonDescriptiveName { rule: String, detail: String },
}

impl fmt::Display for SemanticWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticWarning::LiteralMatchesField {
                rule,
                field,
                literal,
            } => write!(
                f,
                "rule '{rule}': literal \"{literal}\" in condition on '{field}' matches a field \
                 name on the same target; field-to-field comparison is not supported"
            ),
            SemanticWarning::TautologicalClause { rule, field, logic } => match logic {
                Logic::Or => write!(
                    f,
                    "rule '{rule}': OR block on '{field}' combines == and != of the same literal \
                     and is always true"
                ),
                Logic::And => write!(
                    f,
                    "rule '{rule}': AND block on '{field}' combines == and != of the same literal \
                     and is never true"
                ),
            },
            SemanticWarning::NonDescriptiveName { rule, detail } => {
                write!(f, "rule '{rule}': {detail}")
            }
        }
    }
}
