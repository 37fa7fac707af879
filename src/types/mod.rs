mod compiled;
mod entity;
mod error;
mod model;
mod neutral;
mod outcome;
mod rule;
mod value;

pub use compiled::{
    CompiledCondition, CompiledConditionExpr, CompiledMetadataGroup, CompiledRule, RuleBook,
};
pub use entity::{AuthContext, Entity, FieldSource};
pub use error::{CompileError, SemanticWarning, ValidateError};
pub use model::{DomainIr, Field, Model, ModelIr, TargetEntry, View};
pub use neutral::NeutralType;
pub use outcome::EvaluationResult;
pub use rule::{
    CompareOp, Condition, ConditionExpr, Logic, MetadataCategory, MetadataField,
    MetadataRegistry, MetadataRequirement, Outcome, RuleDef, RuleIr, Target, TargetKind,
};
pub use value::Value;
