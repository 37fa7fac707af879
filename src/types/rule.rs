use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::neutral::NeutralType;
use super::value::Value;

/// Comparison operators supported in rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl CompareOp {
    /// Whether this operator imposes an ordering (everything except `==`/`!=`).
    #[must_use]
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Neq)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

/// Connective for compound conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logic {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => write!(f, "AND"),
            Logic::Or => write!(f, "OR"),
        }
    }
}

/// Whether a rule target is a base table model or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Model,
    View,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Model => write!(f, "model"),
            TargetKind::View => write!(f, "view"),
        }
    }
}

/// Reference to exactly one model or view in the Model IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub name: String,
    pub domain: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.kind, self.domain, self.name)
    }
}

/// A single comparison: field, operator, literal.
///
/// The literal is never a dynamic reference; its type was fixed at parse
/// time from lexical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(rename = "operator")]
    pub op: CompareOp,
    pub value: Value,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// A rule's main condition: one comparison, or an AND/OR list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionExpr {
    Simple(Condition),
    Compound { logic: Logic, clauses: Vec<Condition> },
}

impl ConditionExpr {
    /// All comparisons in this expression, in declared order.
    pub fn clauses(&self) -> impl Iterator<Item = &Condition> {
        match self {
            ConditionExpr::Simple(c) => std::slice::from_ref(c).iter(),
            ConditionExpr::Compound { clauses, .. } => clauses.iter(),
        }
    }
}

/// An authorization precondition: an AND block of comparisons evaluated
/// against the context object registered under `category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRequirement {
    pub category: String,
    pub conditions: Vec<Condition>,
}

/// A rule outcome: the status produced on the positive or negative branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: String,
}

/// One validated rule in the Rule IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    pub name: String,
    pub target: Target,
    pub blocking: bool,
    pub metadata_requirements: Vec<MetadataRequirement>,
    pub condition: ConditionExpr,
    #[serde(rename = "then")]
    pub then_outcome: Outcome,
    #[serde(rename = "else")]
    pub else_outcome: Outcome,
}

/// A field declared in a metadata category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NeutralType,
}

/// One category in the authorization-metadata registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCategory {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub fields: Vec<MetadataField>,
}

fn default_enabled() -> bool {
    true
}

impl MetadataCategory {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&MetadataField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The authorization-metadata registry: category name to enabled flag and
/// typed field list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRegistry {
    categories: BTreeMap<String, MetadataCategory>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category with its typed fields.
    #[must_use]
    pub fn with_category(
        mut self,
        name: &str,
        enabled: bool,
        fields: &[(&str, NeutralType)],
    ) -> Self {
        self.categories.insert(
            name.to_owned(),
            MetadataCategory {
                enabled,
                fields: fields
                    .iter()
                    .map(|(n, ty)| MetadataField {
                        name: (*n).to_owned(),
                        ty: *ty,
                    })
                    .collect(),
            },
        );
        self
    }

    #[must_use]
    pub fn category(&self, name: &str) -> Option<&MetadataCategory> {
        self.categories.get(name)
    }

    /// Deserialize a registry from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on malformed input.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// The validated Rule IR: the metadata registry plus every compiled rule
/// definition. This is the complete contract consumed by the rule backend
/// and by downstream generators; it requires no access to source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleIr {
    pub metadata: MetadataRegistry,
    pub rules: Vec<RuleDef>,
}

impl RuleIr {
    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on malformed input.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_wire_names() {
        assert_eq!(serde_json::to_string(&CompareOp::Gte).unwrap(), "\">=\"");
        assert_eq!(
            serde_json::from_str::<CompareOp>("\"!=\"").unwrap(),
            CompareOp::Neq
        );
    }

    #[test]
    fn logic_wire_names() {
        assert_eq!(serde_json::to_string(&Logic::And).unwrap(), "\"AND\"");
        assert_eq!(serde_json::from_str::<Logic>("\"OR\"").unwrap(), Logic::Or);
    }

    #[test]
    fn target_serializes_kind_as_type() {
        let t = Target {
            kind: TargetKind::View,
            name: "course_availability_view".into(),
            domain: "enrollment".into(),
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "view");
        assert_eq!(json["name"], "course_availability_view");
    }

    #[test]
    fn condition_expr_untagged_roundtrip() {
        let simple = ConditionExpr::Simple(Condition {
            field: "is_active".into(),
            op: CompareOp::Eq,
            value: Value::Bool(true),
        });
        let json = serde_json::to_string(&simple).unwrap();
        assert_eq!(serde_json::from_str::<ConditionExpr>(&json).unwrap(), simple);

        let compound = ConditionExpr::Compound {
            logic: Logic::Or,
            clauses: vec![Condition {
                field: "severity_level".into(),
                op: CompareOp::Gte,
                value: Value::Int(7),
            }],
        };
        let json = serde_json::to_string(&compound).unwrap();
        assert_eq!(
            serde_json::from_str::<ConditionExpr>(&json).unwrap(),
            compound
        );
    }

    #[test]
    fn registry_lookup() {
        let reg = MetadataRegistry::new()
            .with_category("roles", true, &[("roleLevel", NeutralType::Int32)])
            .with_category("legacy", false, &[("flag", NeutralType::Bool)]);

        assert!(reg.category("roles").unwrap().enabled);
        assert!(!reg.category("legacy").unwrap().enabled);
        assert!(reg.category("missing").is_none());
        assert_eq!(
            reg.category("roles").unwrap().field("roleLevel").unwrap().ty,
            NeutralType::Int32
        );
    }

    #[test]
    fn registry_from_json_defaults_enabled() {
        let reg = MetadataRegistry::from_json(
            r#"{"roles": {"fields": [{"name": "roleLevel", "type": "int32"}]}}"#,
        )
        .unwrap();
        assert!(reg.category("roles").unwrap().enabled);
    }

    #[test]
    fn clauses_iterates_both_shapes() {
        let c = Condition {
            field: "x".into(),
            op: CompareOp::Eq,
            value: Value::Int(1),
        };
        let simple = ConditionExpr::Simple(c.clone());
        assert_eq!(simple.clauses().count(), 1);

        let compound = ConditionExpr::Compound {
            logic: Logic::And,
            clauses: vec![c.clone(), c],
        };
        assert_eq!(compound.clauses().count(), 2);
    }
}
