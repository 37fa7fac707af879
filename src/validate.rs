//! Cross-reference validator.
//!
//! Consumes parsed rule definitions together with the metadata registry and
//! the Model IR, checks that every reference resolves, and emits the
//! validated Rule IR plus any authoring lints.

use std::collections::HashSet;

use crate::types::{
    CompareOp, Condition, ConditionExpr, Logic, MetadataRegistry, ModelIr, NeutralType, RuleDef,
    RuleIr, SemanticWarning, TargetEntry, ValidateError, Value,
};

/// A successfully validated rule set: the Rule IR plus the non-fatal
/// warnings collected along the way.
#[derive(Debug)]
pub struct Validated {
    pub ir: RuleIr,
    pub warnings: Vec<SemanticWarning>,
}

/// Validate parsed rules against the registry and the Model IR.
///
/// Fatal problems abort with the first [`ValidateError`] found; there is no
/// partial rule set. Lints accumulate in [`Validated::warnings`] and never
/// block compilation.
///
/// # Errors
///
/// See [`ValidateError`] for the full taxonomy.
pub fn validate(
    rules: Vec<RuleDef>,
    registry: MetadataRegistry,
    model_ir: &ModelIr,
) -> Result<Validated, ValidateError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut warnings = Vec::new();

    for rule in &rules {
        if !seen.insert(&rule.name) {
            return Err(ValidateError::DuplicateRule {
                name: rule.name.clone(),
            });
        }

        let entry =
            model_ir
                .resolve(&rule.target)
                .ok_or_else(|| ValidateError::UnknownTarget {
                    rule: rule.name.clone(),
                    kind: rule.target.kind,
                    name: rule.target.name.clone(),
                    domain: rule.target.domain.clone(),
                })?;

        check_names(rule, &mut warnings);

        if let ConditionExpr::Compound { clauses, .. } = &rule.condition {
            if clauses.is_empty() {
                return Err(ValidateError::EmptyCompound {
                    rule: rule.name.clone(),
                });
            }
        }

        for cond in rule.condition.clauses() {
            let field = entry
                .field(&cond.field)
                .ok_or_else(|| ValidateError::UnknownField {
                    rule: rule.name.clone(),
                    target: rule.target.name.clone(),
                    field: cond.field.clone(),
                })?;
            check_condition(&rule.name, field.ty, cond)?;
            lint_literal_matches_field(rule, &entry, cond, &mut warnings);
        }

        if let ConditionExpr::Compound { logic, clauses } = &rule.condition {
            lint_tautology(&rule.name, *logic, clauses, &mut warnings);
        }

        for group in &rule.metadata_requirements {
            let category = registry.category(&group.category).ok_or_else(|| {
                ValidateError::UnknownCategory {
                    rule: rule.name.clone(),
                    category: group.category.clone(),
                }
            })?;
            if !category.enabled {
                return Err(ValidateError::DisabledCategory {
                    rule: rule.name.clone(),
                    category: group.category.clone(),
                });
            }
            for cond in &group.conditions {
                let field = cond.field.as_str();
                let meta_field = category.field(field).ok_or_else(|| {
                    ValidateError::UnknownMetadataField {
                        rule: rule.name.clone(),
                        category: group.category.clone(),
                        field: field.to_owned(),
                    }
                })?;
                check_condition(&rule.name, meta_field.ty, cond)?;
            }
            // Require blocks carry AND semantics, so a ==/!= pair on the
            // same literal leaves the gate permanently unsatisfiable.
            lint_tautology(&rule.name, Logic::And, &group.conditions, &mut warnings);
        }
    }

    Ok(Validated {
        ir: RuleIr {
            metadata: registry,
            rules,
        },
        warnings,
    })
}

/// Type-level checks shared by target fields and metadata fields.
fn check_condition(rule: &str, ty: NeutralType, cond: &Condition) -> Result<(), ValidateError> {
    if !ty.is_comparable() {
        return Err(ValidateError::NonComparableField {
            rule: rule.to_owned(),
            field: cond.field.clone(),
            ty,
        });
    }
    if ty == NeutralType::Bool && cond.op.is_ordering() {
        return Err(ValidateError::OrderingOnBool {
            rule: rule.to_owned(),
            field: cond.field.clone(),
            op: cond.op,
        });
    }
    if !literal_fits(ty, &cond.value) {
        return Err(ValidateError::LiteralTypeMismatch {
            rule: rule.to_owned(),
            field: cond.field.clone(),
            ty,
            value: cond.value.clone(),
        });
    }
    Ok(())
}

fn literal_fits(ty: NeutralType, value: &Value) -> bool {
    match ty {
        NeutralType::String => matches!(value, Value::String(_)),
        NeutralType::Bool => matches!(value, Value::Bool(_)),
        NeutralType::Int32 | NeutralType::Int64 => matches!(value, Value::Int(_)),
        NeutralType::Decimal | NeutralType::Float64 => matches!(
            value,
            Value::Int(_) | Value::Float(_) | Value::Decimal(_)
        ),
        // Unreachable behind the comparability check.
        NeutralType::Date | NeutralType::Datetime => false,
    }
}

/// The DSL has no field-to-field comparison, so a string literal that names
/// a sibling field on the same target is very likely a typo'd reference.
fn lint_literal_matches_field(
    rule: &RuleDef,
    entry: &TargetEntry<'_>,
    cond: &Condition,
    warnings: &mut Vec<SemanticWarning>,
) {
    let Value::String(literal) = &cond.value else {
        return;
    };
    if literal != &cond.field && entry.field(literal).is_some() {
        warnings.push(SemanticWarning::LiteralMatchesField {
            rule: rule.name.clone(),
            field: cond.field.clone(),
            literal: literal.clone(),
        });
    }
}

fn lint_tautology(
    rule: &str,
    logic: Logic,
    clauses: &[Condition],
    warnings: &mut Vec<SemanticWarning>,
) {
    for (i, a) in clauses.iter().enumerate() {
        for b in &clauses[i + 1..] {
            if a.field == b.field
                && a.value == b.value
                && complementary(a.op, b.op)
                && !warnings.iter().any(|w| {
                    matches!(w, SemanticWarning::TautologicalClause { rule: r, field, .. }
                        if r == rule && field == &a.field)
                })
            {
                warnings.push(SemanticWarning::TautologicalClause {
                    rule: rule.to_owned(),
                    field: a.field.clone(),
                    logic,
                });
            }
        }
    }
}

fn complementary(a: CompareOp, b: CompareOp) -> bool {
    matches!(
        (a, b),
        (CompareOp::Eq, CompareOp::Neq) | (CompareOp::Neq, CompareOp::Eq)
    )
}

fn check_names(rule: &RuleDef, warnings: &mut Vec<SemanticWarning>) {
    if rule.name.len() < 3 {
        warnings.push(SemanticWarning::NonDescriptiveName {
            rule: rule.name.clone(),
            detail: "name shorter than three characters".into(),
        });
    }
    for (branch, outcome) in [("then", &rule.then_outcome), ("else", &rule.else_outcome)] {
        if outcome.status.is_empty() {
            warnings.push(SemanticWarning::NonDescriptiveName {
                rule: rule.name.clone(),
                detail: format!("empty {branch} status literal"),
            });
        }
    }
}
