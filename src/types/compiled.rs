use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::entity::{AuthContext, FieldSource};
use super::error::SemanticWarning;
use super::neutral::NeutralType;
use super::outcome::EvaluationResult;
use super::rule::{CompareOp, Logic, MetadataRegistry, Target};
use super::value::Value;
use crate::error::GavelError;

/// A comparison whose field name has been resolved against the target's
/// field set: the engine never consults the schema at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    pub(crate) field: String,
    pub(crate) field_type: NeutralType,
    pub(crate) op: CompareOp,
    pub(crate) value: Value,
}

impl CompiledCondition {
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The neutral type the field resolved to at compile time.
    #[must_use]
    pub fn field_type(&self) -> NeutralType {
        self.field_type
    }

    #[must_use]
    pub fn op(&self) -> CompareOp {
        self.op
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A compiled main condition.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledConditionExpr {
    Simple(CompiledCondition),
    Compound {
        logic: Logic,
        clauses: Vec<CompiledCondition>,
    },
}

/// A metadata requirement group bound to its category's field types.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMetadataGroup {
    pub(crate) category: String,
    pub(crate) conditions: Vec<CompiledCondition>,
}

impl CompiledMetadataGroup {
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn conditions(&self) -> &[CompiledCondition] {
        &self.conditions
    }
}

/// A rule bound to its resolved target's field set, ready for evaluation.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub(crate) name: String,
    pub(crate) target: Target,
    pub(crate) blocking: bool,
    pub(crate) metadata: Vec<CompiledMetadataGroup>,
    pub(crate) condition: CompiledConditionExpr,
    pub(crate) then_status: String,
    pub(crate) else_status: String,
}

impl CompiledRule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    #[must_use]
    pub fn metadata(&self) -> &[CompiledMetadataGroup] {
        &self.metadata
    }

    #[must_use]
    pub fn condition(&self) -> &CompiledConditionExpr {
        &self.condition
    }

    #[must_use]
    pub fn then_status(&self) -> &str {
        &self.then_status
    }

    #[must_use]
    pub fn else_status(&self) -> &str {
        &self.else_status
    }

    /// Evaluate this rule against an entity and an authorization context.
    ///
    /// Pure and total: never mutates its inputs, never fails. Metadata
    /// requirement groups are checked in declared order before the main
    /// condition; a missing or unsatisfied group yields the negative status
    /// without evaluating the main condition at all.
    pub fn evaluate(&self, entity: &dyn FieldSource, auth: &AuthContext) -> EvaluationResult {
        crate::evaluate::evaluate(self, entity, auth)
    }
}

/// The published set of compiled rules. Immutable, `Send + Sync`, designed
/// to live behind `Arc`; republishing a recompiled set is a single atomic
/// swap of the whole book, never in-place mutation.
#[derive(Debug)]
pub struct RuleBook {
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) index: HashMap<String, usize>,
}

impl RuleBook {
    /// Look up a compiled rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CompiledRule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    /// All compiled rules, in Rule IR order.
    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// The rules bound to one target, in Rule IR order.
    pub fn rules_for<'a>(&'a self, target: &'a Target) -> impl Iterator<Item = &'a CompiledRule> {
        self.rules.iter().filter(move |r| r.target == *target)
    }

    /// Evaluate one rule by name. Returns `None` for an unknown name.
    #[must_use]
    pub fn evaluate(
        &self,
        name: &str,
        entity: &dyn FieldSource,
        auth: &AuthContext,
    ) -> Option<EvaluationResult> {
        self.get(name).map(|r| r.evaluate(entity, auth))
    }

    /// Evaluate every rule bound to a target, in Rule IR order.
    #[must_use]
    pub fn evaluate_all(
        &self,
        target: &Target,
        entity: &dyn FieldSource,
        auth: &AuthContext,
    ) -> Vec<EvaluationResult> {
        self.rules_for(target)
            .map(|r| r.evaluate(entity, auth))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the whole pipeline: parse schema files and rule documents,
    /// validate against the registry, compile. Returns the book and any
    /// semantic warnings collected during validation.
    ///
    /// # Errors
    ///
    /// Returns [`GavelError`] on any parse, validation, or compile failure.
    pub fn from_sources(
        schemas: &[&str],
        rule_docs: &[&str],
        registry: MetadataRegistry,
    ) -> Result<(Self, Vec<SemanticWarning>), GavelError> {
        let mut model_ir = crate::schema::ModelIr::new();
        for schema in schemas {
            model_ir = model_ir.merge(crate::schema::parse_schema(schema)?)?;
        }

        let mut defs = Vec::new();
        for doc in rule_docs {
            defs.extend(crate::dsl::parse_rules(doc)?);
        }

        let validated = crate::validate::validate(defs, registry, &model_ir)?;
        let book = crate::compile::compile(&validated.ir, &model_ir)?;
        Ok((book, validated.warnings))
    }

    /// Read schema, rule, and registry files and run the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`GavelError`] on I/O, parse, validation, or compile failure.
    pub fn from_files<P: AsRef<Path>>(
        schema_paths: &[P],
        rule_doc_paths: &[P],
        registry_path: P,
    ) -> Result<(Self, Vec<SemanticWarning>), GavelError> {
        let mut schemas = Vec::new();
        for path in schema_paths {
            schemas.push(std::fs::read_to_string(path)?);
        }
        let mut docs = Vec::new();
        for path in rule_doc_paths {
            docs.push(std::fs::read_to_string(path)?);
        }
        let registry_text = std::fs::read_to_string(registry_path)?;
        let registry = MetadataRegistry::from_json(&registry_text)
            .map_err(|e| GavelError::Registry(e.to_string()))?;

        let schema_refs: Vec<&str> = schemas.iter().map(String::as_str).collect();
        let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
        Self::from_sources(&schema_refs, &doc_refs, registry)
    }
}

impl fmt::Display for RuleBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleBook({} rules)", self.rules.len())
    }
}
