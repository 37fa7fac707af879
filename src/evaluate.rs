//! Evaluation engine.
//!
//! A pure, total interpreter over compiled rules. Field access goes through
//! the [`FieldSource`] contract; a missing field fails every comparison,
//! including `!=`, so misspelled references fail safe instead of silently
//! matching.

use crate::types::{
    AuthContext, CompiledCondition, CompiledConditionExpr, CompiledRule, EvaluationResult,
    FieldSource, Logic,
};

pub(crate) fn evaluate(
    rule: &CompiledRule,
    entity: &dyn FieldSource,
    auth: &AuthContext,
) -> EvaluationResult {
    // Authorization gates run first, in declared order. A missing category
    // or a failed group short-circuits to the negative status; the main
    // condition must not run against an unauthorized access path.
    for group in &rule.metadata {
        let satisfied = auth
            .category(&group.category)
            .is_some_and(|source| group.conditions.iter().all(|c| eval_condition(c, source)));
        if !satisfied {
            return EvaluationResult::new(
                rule.name.clone(),
                rule.else_status.clone(),
                rule.blocking,
                false,
            );
        }
    }

    let satisfied = match &rule.condition {
        CompiledConditionExpr::Simple(cond) => eval_condition(cond, entity),
        CompiledConditionExpr::Compound { logic, clauses } => match logic {
            Logic::And => clauses.iter().all(|c| eval_condition(c, entity)),
            Logic::Or => clauses.iter().any(|c| eval_condition(c, entity)),
        },
    };

    let status = if satisfied {
        rule.then_status.clone()
    } else {
        rule.else_status.clone()
    };
    EvaluationResult::new(rule.name.clone(), status, rule.blocking, satisfied)
}

fn eval_condition(cond: &CompiledCondition, source: &dyn FieldSource) -> bool {
    source
        .get_field(&cond.field)
        .and_then(|actual| actual.compare(cond.op, &cond.value))
        .unwrap_or(false)
}
