use winnow::ascii::{digit1, space0, space1, till_line_ending};
use winnow::combinator::{alt, cut_err, delimited, fail, opt, preceded, repeat};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::types::{
    CompareOp, Condition, ConditionExpr, Logic, MetadataRequirement, Outcome, RuleDef, Target,
    TargetKind, Value,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tag {
    Target(String),
    View,
    Blocking,
}

// -- Whitespace & comments --------------------------------------------------

/// Skip whitespace (including newlines) and `#` comments.
fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

// -- Operators & literals ---------------------------------------------------

/// Symbolic and natural-language operators, normalized to the six-symbol
/// set. Longer phrases come first so `is` never shadows `is at least`.
fn operator(input: &mut &str) -> ModalResult<CompareOp> {
    alt((
        alt((
            ">=".value(CompareOp::Gte),
            "<=".value(CompareOp::Lte),
            "==".value(CompareOp::Eq),
            "!=".value(CompareOp::Neq),
            ">".value(CompareOp::Gt),
            "<".value(CompareOp::Lt),
        )),
        alt((
            "does not equal".value(CompareOp::Neq),
            "is greater than".value(CompareOp::Gt),
            "is less than".value(CompareOp::Lt),
            "is at least".value(CompareOp::Gte),
            "is at most".value(CompareOp::Lte),
            "is not".value(CompareOp::Neq),
            "is below".value(CompareOp::Lt),
            "exceeds".value(CompareOp::Gt),
            "equals".value(CompareOp::Eq),
            "is".value(CompareOp::Eq),
        )),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "comparison operator",
    )))
    .parse_next(input)
}

/// A literal, typed by lexical shape: quoted text, `true`/`false`, bare
/// integer, or bare decimal. Nothing else is a literal.
fn literal(input: &mut &str) -> ModalResult<Value> {
    alt((
        delimited('"', take_while(0.., |c: char| c != '"'), '"')
            .map(|s: &str| Value::String(s.to_owned())),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        number,
    ))
    .context(StrContext::Expected(StrContextValue::Description("literal")))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<Value> {
    let start = *input;
    let text = (opt('-'), digit1, opt(('.', digit1)))
        .take()
        .parse_next(input)?;
    if text.contains('.') {
        let f = text.parse::<f64>().map_err(|_| {
            *input = start;
            ErrMode::from_input(input)
        })?;
        Ok(Value::Float(f))
    } else {
        match text.parse::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => {
                *input = start;
                Err(ErrMode::from_input(input))
            }
        }
    }
}

// -- Row tables -------------------------------------------------------------

fn row(input: &mut &str) -> ModalResult<Condition> {
    ws.parse_next(input)?;
    ('|', space0).parse_next(input)?;
    let (field, op, value) = cut_err((
        ident,
        (space0, '|', space0).void(),
        operator,
        (space0, '|', space0).void(),
        literal,
        (space0, '|').void(),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "| field | operator | literal | row",
    )))
    .map(|(field, (), op, (), value, ())| (field, op, value))
    .parse_next(input)?;
    Ok(Condition {
        field: field.to_owned(),
        op,
        value,
    })
}

fn row_table(input: &mut &str) -> ModalResult<Vec<Condition>> {
    repeat(1.., row).parse_next(input)
}

// -- Scenario pieces --------------------------------------------------------

fn tag(input: &mut &str) -> ModalResult<Tag> {
    ws.parse_next(input)?;
    '@'.parse_next(input)?;
    cut_err(alt((
        preceded(
            ("target", space0, '('),
            (ident, ')').map(|(name, _)| Tag::Target(name.to_owned())),
        ),
        "view".value(Tag::View),
        "blocking".value(Tag::Blocking),
    )))
    .context(StrContext::Expected(StrContextValue::Description(
        "@target(name), @view, or @blocking",
    )))
    .parse_next(input)
}

fn require_block(input: &mut &str) -> ModalResult<MetadataRequirement> {
    ws.parse_next(input)?;
    ("Require", space1).parse_next(input)?;
    let (category, conditions) = cut_err(((ident, space0, ':').map(|(c, _, _)| c), row_table))
        .context(StrContext::Expected(StrContextValue::Description(
            "Require <category>: followed by rows",
        )))
        .parse_next(input)?;
    Ok(MetadataRequirement {
        category: category.to_owned(),
        conditions,
    })
}

fn when_clause(input: &mut &str) -> ModalResult<ConditionExpr> {
    ws.parse_next(input)?;
    ("When", space1).parse_next(input)?;
    cut_err(alt((
        preceded(("all", space1, "of", space0, ':'), row_table)
            .map(|clauses| ConditionExpr::Compound {
                logic: Logic::And,
                clauses,
            }),
        preceded(("any", space1, "of", space0, ':'), row_table)
            .map(|clauses| ConditionExpr::Compound {
                logic: Logic::Or,
                clauses,
            }),
        (ident, space1, operator, space1, literal).map(|(field, _, op, _, value)| {
            ConditionExpr::Simple(Condition {
                field: field.to_owned(),
                op,
                value,
            })
        }),
    )))
    .context(StrContext::Expected(StrContextValue::Description(
        "condition or all of:/any of: block",
    )))
    .parse_next(input)
}

fn outcome(keyword: &'static str) -> impl FnMut(&mut &str) -> ModalResult<Outcome> {
    move |input: &mut &str| {
        ws.parse_next(input)?;
        (keyword, space1).parse_next(input)?;
        let status = cut_err(delimited('"', take_while(0.., |c: char| c != '"'), '"'))
            .context(StrContext::Expected(StrContextValue::Description(
                "quoted status literal",
            )))
            .parse_next(input)?;
        Ok(Outcome {
            status: status.to_owned(),
        })
    }
}

fn scenario(input: &mut &str) -> ModalResult<RuleDef> {
    let tags: Vec<Tag> = repeat(1.., tag).parse_next(input)?;

    ws.parse_next(input)?;
    let name = cut_err(preceded(("Scenario", space0, ':', space0), ident))
        .context(StrContext::Expected(StrContextValue::Description(
            "Scenario: <rule name>",
        )))
        .parse_next(input)?
        .to_owned();

    let target_name = tags.iter().find_map(|t| match t {
        Tag::Target(name) => Some(name.clone()),
        _ => None,
    });
    let Some(target_name) = target_name else {
        return cut_err(fail::<_, RuleDef, _>)
            .context(StrContext::Expected(StrContextValue::Description(
                "@target(name) tag",
            )))
            .parse_next(input);
    };
    let kind = if tags.contains(&Tag::View) {
        TargetKind::View
    } else {
        TargetKind::Model
    };
    let blocking = tags.contains(&Tag::Blocking);

    let metadata_requirements: Vec<MetadataRequirement> =
        repeat(0.., require_block).parse_next(input)?;
    let condition = cut_err(when_clause)
        .context(StrContext::Expected(StrContextValue::Description(
            "When clause",
        )))
        .parse_next(input)?;
    let then_outcome = cut_err(outcome("Then"))
        .context(StrContext::Expected(StrContextValue::Description(
            "Then outcome",
        )))
        .parse_next(input)?;
    let else_outcome = cut_err(outcome("Else"))
        .context(StrContext::Expected(StrContextValue::Description(
            "Else outcome",
        )))
        .parse_next(input)?;

    Ok(RuleDef {
        name,
        target: Target {
            kind,
            name: target_name,
            // Filled in from the enclosing Feature.
            domain: String::new(),
        },
        blocking,
        metadata_requirements,
        condition,
        then_outcome,
        else_outcome,
    })
}

fn feature(input: &mut &str) -> ModalResult<Vec<RuleDef>> {
    ws.parse_next(input)?;
    ("Feature", space0, ':', space0).parse_next(input)?;
    let domain = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "domain name",
        )))
        .parse_next(input)?
        .to_owned();

    let mut rules: Vec<RuleDef> = repeat(0.., scenario).parse_next(input)?;
    for rule in &mut rules {
        rule.target.domain.clone_from(&domain);
    }
    Ok(rules)
}

pub(crate) fn rule_file(input: &mut &str) -> ModalResult<Vec<RuleDef>> {
    let features: Vec<Vec<RuleDef>> = repeat(0.., feature).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(features.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<RuleDef> {
        rule_file.parse(input).unwrap()
    }

    #[test]
    fn parse_full_scenario() {
        let rules = parse(
            "# billing rules\n\
             Feature: billing\n\
             \n\
             @target(invoices) @blocking\n\
             Scenario: high_value_unpaid\n\
             \x20 Require roles:\n\
             \x20   | roleLevel | >= | 4 |\n\
             \x20 When all of:\n\
             \x20   | total_amount | is greater than | 1000.00 |\n\
             \x20   | is_paid      | ==              | false   |\n\
             \x20 Then \"REQUIRES_REVIEW\"\n\
             \x20 Else \"NORMAL\"\n",
        );
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.name, "high_value_unpaid");
        assert_eq!(rule.target.domain, "billing");
        assert_eq!(rule.target.name, "invoices");
        assert_eq!(rule.target.kind, TargetKind::Model);
        assert!(rule.blocking);

        assert_eq!(rule.metadata_requirements.len(), 1);
        assert_eq!(rule.metadata_requirements[0].category, "roles");
        assert_eq!(
            rule.metadata_requirements[0].conditions[0],
            Condition {
                field: "roleLevel".into(),
                op: CompareOp::Gte,
                value: Value::Int(4),
            }
        );

        let ConditionExpr::Compound { logic, clauses } = &rule.condition else {
            panic!("expected compound condition");
        };
        assert_eq!(*logic, Logic::And);
        assert_eq!(clauses[0].op, CompareOp::Gt);
        assert_eq!(clauses[0].value, Value::Float(1000.0));
        assert_eq!(clauses[1].value, Value::Bool(false));

        assert_eq!(rule.then_outcome.status, "REQUIRES_REVIEW");
        assert_eq!(rule.else_outcome.status, "NORMAL");
    }

    #[test]
    fn simple_when_line() {
        let rules = parse(
            "Feature: core\n\
             @target(users)\n\
             Scenario: active_check\n\
             \x20 When is_active is false\n\
             \x20 Then \"INACTIVE\"\n\
             \x20 Else \"ACTIVE\"\n",
        );
        let ConditionExpr::Simple(cond) = &rules[0].condition else {
            panic!("expected simple condition");
        };
        assert_eq!(cond.field, "is_active");
        assert_eq!(cond.op, CompareOp::Eq);
        assert_eq!(cond.value, Value::Bool(false));
        assert!(!rules[0].blocking);
    }

    #[test]
    fn view_tag_sets_kind() {
        let rules = parse(
            "Feature: academics\n\
             @target(course_availability_view) @view\n\
             Scenario: full_course\n\
             \x20 When enrolled_count is at least 30\n\
             \x20 Then \"FULL\"\n\
             \x20 Else \"OPEN\"\n",
        );
        assert_eq!(rules[0].target.kind, TargetKind::View);
    }

    #[test]
    fn operator_phrases_normalize() {
        let cases = [
            ("equals", CompareOp::Eq),
            ("is", CompareOp::Eq),
            ("is not", CompareOp::Neq),
            ("does not equal", CompareOp::Neq),
            ("is at least", CompareOp::Gte),
            ("is at most", CompareOp::Lte),
            ("is greater than", CompareOp::Gt),
            ("exceeds", CompareOp::Gt),
            ("is less than", CompareOp::Lt),
            ("is below", CompareOp::Lt),
            (">=", CompareOp::Gte),
            ("!=", CompareOp::Neq),
        ];
        for (phrase, expected) in cases {
            let doc = format!(
                "Feature: f\n@target(t)\nScenario: s\n  When x {phrase} 1\n  Then \"A\"\n  Else \"B\"\n"
            );
            let rules = rule_file.parse(&doc).unwrap();
            let ConditionExpr::Simple(cond) = &rules[0].condition else {
                panic!("expected simple condition for {phrase}");
            };
            assert_eq!(cond.op, expected, "phrase {phrase}");
        }
    }

    #[test]
    fn literal_shapes() {
        let rules = parse(
            "Feature: f\n\
             @target(t)\n\
             Scenario: s\n\
             \x20 When any of:\n\
             \x20   | a | == | \"text\" |\n\
             \x20   | b | == | true |\n\
             \x20   | c | == | -42 |\n\
             \x20   | d | == | 3.5 |\n\
             \x20 Then \"Y\"\n\
             \x20 Else \"N\"\n",
        );
        let ConditionExpr::Compound { logic, clauses } = &rules[0].condition else {
            panic!("expected compound");
        };
        assert_eq!(*logic, Logic::Or);
        assert_eq!(clauses[0].value, Value::String("text".into()));
        assert_eq!(clauses[1].value, Value::Bool(true));
        assert_eq!(clauses[2].value, Value::Int(-42));
        assert_eq!(clauses[3].value, Value::Float(3.5));
    }

    #[test]
    fn bare_word_literal_rejected() {
        let doc = "Feature: f\n@target(t)\nScenario: s\n  When x == oops\n  Then \"Y\"\n  Else \"N\"\n";
        assert!(rule_file.parse(doc).is_err());
    }

    #[test]
    fn missing_else_rejected() {
        let doc = "Feature: f\n@target(t)\nScenario: s\n  When x == 1\n  Then \"Y\"\n";
        assert!(rule_file.parse(doc).is_err());
    }

    #[test]
    fn missing_target_tag_rejected() {
        let doc = "Feature: f\n@blocking\nScenario: s\n  When x == 1\n  Then \"Y\"\n  Else \"N\"\n";
        assert!(rule_file.parse(doc).is_err());
    }

    #[test]
    fn multiple_features_scope_domains() {
        let rules = parse(
            "Feature: alpha\n\
             @target(a)\n\
             Scenario: ra\n\
             \x20 When x == 1\n  Then \"Y\"\n  Else \"N\"\n\
             Feature: beta\n\
             @target(b)\n\
             Scenario: rb\n\
             \x20 When x == 2\n  Then \"Y\"\n  Else \"N\"\n",
        );
        assert_eq!(rules[0].target.domain, "alpha");
        assert_eq!(rules[1].target.domain, "beta");
    }

    #[test]
    fn require_blocks_keep_order() {
        let rules = parse(
            "Feature: f\n\
             @target(t)\n\
             Scenario: s\n\
             \x20 Require roles:\n\
             \x20   | roleLevel | >= | 4 |\n\
             \x20 Require tenancy:\n\
             \x20   | region | == | \"eu\" |\n\
             \x20 When x == 1\n\
             \x20 Then \"Y\"\n\
             \x20 Else \"N\"\n",
        );
        let groups = &rules[0].metadata_requirements;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "roles");
        assert_eq!(groups[1].category, "tenancy");
    }

    #[test]
    fn comments_skipped_anywhere() {
        let rules = parse(
            "# header\n\
             Feature: f\n\
             # before tags\n\
             @target(t)\n\
             Scenario: s\n\
             # inside scenario\n\
             \x20 When x == 1\n\
             \x20 Then \"Y\"\n\
             \x20 Else \"N\"\n\
             # trailing\n",
        );
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn empty_document_is_empty_set() {
        assert!(parse("").is_empty());
        assert!(parse("# nothing here\n").is_empty());
    }
}
