//! Rule backend compiler.
//!
//! Binds each validated Rule IR entry to its Model IR target, resolving
//! every field name to a NeutralType exactly once so the evaluation engine
//! never consults the schema at request time.

use std::collections::HashMap;

use crate::types::{
    CompiledCondition, CompiledConditionExpr, CompiledMetadataGroup, CompiledRule, CompileError,
    Condition, ConditionExpr, ModelIr, NeutralType, RuleBook, RuleDef, RuleIr,
};

/// Compile a validated Rule IR against a Model IR into an immutable
/// [`RuleBook`].
///
/// # Errors
///
/// Validation makes these unreachable for IR produced by
/// [`validate()`](crate::validate::validate), but the backend re-checks its
/// own references so it stays safe on externally supplied IR documents.
pub fn compile(ir: &RuleIr, model_ir: &ModelIr) -> Result<RuleBook, CompileError> {
    let mut rules = Vec::with_capacity(ir.rules.len());
    let mut index = HashMap::with_capacity(ir.rules.len());

    for def in &ir.rules {
        let compiled = compile_rule(def, ir, model_ir)?;
        index.insert(compiled.name.clone(), rules.len());
        rules.push(compiled);
    }

    Ok(RuleBook { rules, index })
}

fn compile_rule(
    def: &RuleDef,
    ir: &RuleIr,
    model_ir: &ModelIr,
) -> Result<CompiledRule, CompileError> {
    let entry = model_ir
        .resolve(&def.target)
        .ok_or_else(|| CompileError::UnknownTarget {
            rule: def.name.clone(),
            kind: def.target.kind,
            name: def.target.name.clone(),
            domain: def.target.domain.clone(),
        })?;

    let bind = |cond: &Condition| -> Result<CompiledCondition, CompileError> {
        let field = entry
            .field(&cond.field)
            .ok_or_else(|| CompileError::UnknownField {
                rule: def.name.clone(),
                field: cond.field.clone(),
            })?;
        Ok(bound(cond, field.ty))
    };

    let condition = match &def.condition {
        ConditionExpr::Simple(cond) => CompiledConditionExpr::Simple(bind(cond)?),
        ConditionExpr::Compound { logic, clauses } => CompiledConditionExpr::Compound {
            logic: *logic,
            clauses: clauses.iter().map(bind).collect::<Result<_, _>>()?,
        },
    };

    let mut metadata = Vec::with_capacity(def.metadata_requirements.len());
    for group in &def.metadata_requirements {
        let category = ir.metadata.category(&group.category).ok_or_else(|| {
            CompileError::UnknownCategory {
                rule: def.name.clone(),
                category: group.category.clone(),
            }
        })?;
        let mut conditions = Vec::with_capacity(group.conditions.len());
        for cond in &group.conditions {
            let field = category.field(&cond.field).ok_or_else(|| {
                CompileError::UnknownMetadataField {
                    rule: def.name.clone(),
                    category: group.category.clone(),
                    field: cond.field.clone(),
                }
            })?;
            conditions.push(bound(cond, field.ty));
        }
        metadata.push(CompiledMetadataGroup {
            category: group.category.clone(),
            conditions,
        });
    }

    Ok(CompiledRule {
        name: def.name.clone(),
        target: def.target.clone(),
        blocking: def.blocking,
        metadata,
        condition,
        then_status: def.then_outcome.status.clone(),
        else_status: def.else_outcome.status.clone(),
    })
}

fn bound(cond: &Condition, ty: NeutralType) -> CompiledCondition {
    CompiledCondition {
        field: cond.field.clone(),
        field_type: ty,
        op: cond.op,
        value: cond.value.clone(),
    }
}
