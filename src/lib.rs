//! Gavel compiles SQL DDL schemas, a constrained business-rule DSL, and an
//! authorization-metadata registry into immutable compiled rules, evaluated
//! purely at request time.
//!
//! The pipeline runs strictly forward:
//!
//! 1. [`parse_schema()`] turns `CREATE TABLE` / `CREATE VIEW` text into the
//!    neutral-typed [`ModelIr`].
//! 2. [`parse_rules()`] turns rule documents into [`RuleDef`] entries.
//! 3. [`validate()`] cross-references rules against the registry and the
//!    Model IR, producing the [`RuleIr`] plus authoring lints.
//! 4. [`compile()`] binds each rule to its target's field types once,
//!    producing an immutable [`RuleBook`].
//! 5. [`CompiledRule::evaluate()`] runs a rule against any [`FieldSource`]
//!    and an [`AuthContext`], returning an [`EvaluationResult`].
//!
//! No stage re-reads source text after its own parse, and nothing after
//! step 4 can fail: evaluation is pure and total.
//!
//! ```
//! use gavel::{AuthContext, Entity, MetadataRegistry, RuleBook};
//!
//! let schema = "CREATE TABLE users (id BIGINT PRIMARY KEY, is_active BOOLEAN NOT NULL);";
//! let rules = r#"
//! Feature: core
//!
//! @target(users)
//! Scenario: inactive_check
//!   When is_active is false
//!   Then "INACTIVE"
//!   Else "ACTIVE"
//! "#;
//!
//! let (book, warnings) =
//!     RuleBook::from_sources(&[schema], &[rules], MetadataRegistry::new()).unwrap();
//! assert!(warnings.is_empty());
//!
//! let user = Entity::new().set("is_active", false);
//! let result = book.evaluate("inactive_check", &user, &AuthContext::new()).unwrap();
//! assert_eq!(result.status(), "INACTIVE");
//! ```

mod compile;
mod dsl;
mod error;
mod evaluate;
mod schema;
mod types;
mod validate;

pub use compile::compile;
pub use dsl::{parse_rules, ParseError};
pub use error::GavelError;
pub use schema::{parse_schema, SchemaError};
pub use types::{
    AuthContext, CompareOp, CompileError, CompiledCondition, CompiledConditionExpr,
    CompiledMetadataGroup, CompiledRule, Condition, ConditionExpr, DomainIr, Entity,
    EvaluationResult, Field, FieldSource, Logic, MetadataCategory, MetadataField,
    MetadataRegistry, MetadataRequirement, Model, ModelIr, NeutralType, Outcome, RuleBook,
    RuleDef, RuleIr, SemanticWarning, Target, TargetEntry, TargetKind, ValidateError, Value, View,
};
pub use validate::{validate, Validated};
