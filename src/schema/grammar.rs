use winnow::ascii::{space0, till_line_ending, Caseless};
use winnow::combinator::{alt, cut_err, opt, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

// -- Raw statements ---------------------------------------------------------
// Untyped DDL as parsed; typing and view resolution happen in resolve.rs.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawStatement {
    Domain(String),
    Table(RawTable),
    View(RawView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTable {
    pub(crate) name: String,
    pub(crate) columns: Vec<RawColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawColumn {
    pub(crate) name: String,
    pub(crate) ty: String,
    pub(crate) not_null: bool,
    pub(crate) primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawView {
    pub(crate) name: String,
    pub(crate) items: Vec<RawSelectItem>,
    pub(crate) from: Vec<RawTableRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTableRef {
    pub(crate) table: String,
    pub(crate) alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawSelectItem {
    pub(crate) expr: RawExpr,
    pub(crate) alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawExpr {
    Column {
        qualifier: Option<String>,
        name: String,
    },
    /// Aggregate call; `arg` is `None` for `COUNT(*)`.
    Aggregate {
        func: String,
        arg: Option<(Option<String>, String)>,
    },
}

const CONSTRAINT_KEYWORDS: [&str; 7] = [
    "PRIMARY",
    "FOREIGN",
    "CONSTRAINT",
    "UNIQUE",
    "KEY",
    "INDEX",
    "CHECK",
];

const RESERVED: [&str; 14] = [
    "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "FULL", "CROSS", "ON", "WHERE", "GROUP", "ORDER",
    "HAVING", "LIMIT", "UNION",
];

// -- Whitespace & comments --------------------------------------------------

/// Skip whitespace and `--` comments, but never a `-- domain:` marker;
/// those are statements of their own.
fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            plain_comment,
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn plain_comment(input: &mut &str) -> ModalResult<()> {
    let start = input.checkpoint();
    "--".parse_next(input)?;
    let rest = till_line_ending.parse_next(input)?;
    if rest.trim_start().starts_with("domain:") {
        input.reset(&start);
        return Err(ErrMode::from_input(input));
    }
    Ok(())
}

fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)?;
    ws.parse_next(input)
}

// -- Tokens -----------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn col_ref(input: &mut &str) -> ModalResult<(Option<String>, String)> {
    let first = ident.parse_next(input)?;
    let second = opt(preceded('.', ident)).parse_next(input)?;
    Ok(match second {
        Some(name) => (Some(first.to_owned()), name.to_owned()),
        None => (None, first.to_owned()),
    })
}

/// Consume the tail of a parenthesized list item: everything up to the next
/// `,` or `)` at paren depth zero, leaving the delimiter in the input.
fn item_rest<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    let start = *input;
    let mut depth = 0_usize;
    let mut end = start.len();
    for (idx, ch) in start.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    end = idx;
                    break;
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                end = idx;
                break;
            }
            _ => {}
        }
    }
    let (taken, rest) = start.split_at(end);
    *input = rest;
    Ok(taken)
}

// -- Statements -------------------------------------------------------------

fn domain_marker(input: &mut &str) -> ModalResult<RawStatement> {
    ws.parse_next(input)?;
    ("--", space0, "domain:", space0).parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "domain name",
        )))
        .parse_next(input)?;
    till_line_ending.void().parse_next(input)?;
    Ok(RawStatement::Domain(name.to_owned()))
}

fn create_stmt(input: &mut &str) -> ModalResult<RawStatement> {
    ws.parse_next(input)?;
    (Caseless("CREATE"), ws1).parse_next(input)?;
    alt((
        preceded((Caseless("TABLE"), ws1), cut_err(table_body)),
        preceded((Caseless("VIEW"), ws1), cut_err(view_body)),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "TABLE or VIEW",
    )))
    .parse_next(input)
}

fn table_body(input: &mut &str) -> ModalResult<RawStatement> {
    let name = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "table name",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    let items: Vec<Option<RawColumn>> = separated(1.., table_item, (ws, ',')).parse_next(input)?;
    ws.parse_next(input)?;
    ')'.parse_next(input)?;
    ws.parse_next(input)?;
    ';'.parse_next(input)?;
    Ok(RawStatement::Table(RawTable {
        name: name.to_owned(),
        columns: items.into_iter().flatten().collect(),
    }))
}

fn table_item(input: &mut &str) -> ModalResult<Option<RawColumn>> {
    ws.parse_next(input)?;
    let word = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "column definition",
        )))
        .parse_next(input)?;
    if CONSTRAINT_KEYWORDS
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
    {
        item_rest(input)?;
        return Ok(None);
    }
    let name = word.to_owned();
    ws1.parse_next(input)?;
    let ty = type_name(input)?;
    let rest = item_rest(input)?;
    let upper = rest.to_ascii_uppercase();
    Ok(Some(RawColumn {
        name,
        ty,
        not_null: upper.contains("NOT NULL"),
        primary_key: upper.contains("PRIMARY KEY"),
    }))
}

fn type_name(input: &mut &str) -> ModalResult<String> {
    let first = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "column type",
        )))
        .parse_next(input)?;
    let ty = first.to_owned();
    if first.eq_ignore_ascii_case("DOUBLE") {
        opt(preceded(ws1, Caseless("PRECISION")))
            .void()
            .parse_next(input)?;
    }
    opt((ws, '(', take_while(0.., |c: char| c != ')'), ')'))
        .void()
        .parse_next(input)?;
    Ok(ty)
}

fn view_body(input: &mut &str) -> ModalResult<RawStatement> {
    let name = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "view name",
        )))
        .parse_next(input)?;
    ws1.parse_next(input)?;
    (Caseless("AS"), ws1, Caseless("SELECT"), ws1).parse_next(input)?;
    let items: Vec<RawSelectItem> = separated(1.., select_item, (ws, ',')).parse_next(input)?;
    (ws, Caseless("FROM"), ws1).parse_next(input)?;
    let first = table_ref(input)?;
    let joins: Vec<RawTableRef> = repeat(0.., join_clause).parse_next(input)?;
    take_while(0.., |c: char| c != ';').void().parse_next(input)?;
    ';'.parse_next(input)?;

    let mut from = vec![first];
    from.extend(joins);
    Ok(RawStatement::View(RawView {
        name: name.to_owned(),
        items,
        from,
    }))
}

fn select_item(input: &mut &str) -> ModalResult<RawSelectItem> {
    ws.parse_next(input)?;
    let expr = alt((aggregate, col_ref.map(|(q, n)| RawExpr::Column { qualifier: q, name: n })))
        .context(StrContext::Expected(StrContextValue::Description(
            "select item",
        )))
        .parse_next(input)?;
    let alias = opt(preceded((ws1, Caseless("AS"), ws1), ident)).parse_next(input)?;
    Ok(RawSelectItem {
        expr,
        alias: alias.map(str::to_owned),
    })
}

fn aggregate(input: &mut &str) -> ModalResult<RawExpr> {
    let func = ident.parse_next(input)?;
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let arg = alt(('*'.value(None), col_ref.map(Some))).parse_next(input)?;
    ws.parse_next(input)?;
    ')'.parse_next(input)?;
    Ok(RawExpr::Aggregate {
        func: func.to_owned(),
        arg,
    })
}

fn table_ref(input: &mut &str) -> ModalResult<RawTableRef> {
    let table = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "table name",
        )))
        .parse_next(input)?;
    let alias = opt(table_alias).parse_next(input)?;
    Ok(RawTableRef {
        table: table.to_owned(),
        alias,
    })
}

fn table_alias(input: &mut &str) -> ModalResult<String> {
    ws1.parse_next(input)?;
    let explicit = opt((Caseless("AS"), ws1)).parse_next(input)?;
    let word = ident.parse_next(input)?;
    if explicit.is_none() && RESERVED.iter().any(|k| word.eq_ignore_ascii_case(k)) {
        return Err(ErrMode::from_input(input));
    }
    Ok(word.to_owned())
}

fn join_clause(input: &mut &str) -> ModalResult<RawTableRef> {
    ws.parse_next(input)?;
    let _: () = repeat(
        0..,
        (
            alt((
                Caseless("LEFT"),
                Caseless("RIGHT"),
                Caseless("INNER"),
                Caseless("OUTER"),
                Caseless("FULL"),
                Caseless("CROSS"),
            )),
            ws1,
        ),
    )
    .parse_next(input)?;
    (Caseless("JOIN"), ws1).parse_next(input)?;
    let table = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "joined table",
        )))
        .parse_next(input)?;
    let alias = opt(table_alias).parse_next(input)?;
    skip_on_clause(input)?;
    Ok(RawTableRef {
        table: table.to_owned(),
        alias,
    })
}

/// Skip an `ON <predicate>` clause without interpreting it: stop before the
/// next join/WHERE/GROUP-style keyword or `;`. Join predicates never
/// contribute fields to the view.
fn skip_on_clause(input: &mut &str) -> ModalResult<()> {
    let on = opt(preceded(ws, (Caseless("ON"), ws1))).parse_next(input)?;
    if on.is_none() {
        return Ok(());
    }
    loop {
        ws.parse_next(input)?;
        if input.is_empty() || input.starts_with(';') {
            break;
        }
        let cp = input.checkpoint();
        if let Ok(word) = ident.parse_next(input) {
            if RESERVED.iter().any(|k| word.eq_ignore_ascii_case(k)) {
                input.reset(&cp);
                break;
            }
        } else {
            any.void().parse_next(input)?;
        }
    }
    Ok(())
}

// -- Top-level parser -------------------------------------------------------

pub(crate) fn schema_file(input: &mut &str) -> ModalResult<Vec<RawStatement>> {
    let statements: Vec<RawStatement> =
        repeat(0.., alt((domain_marker, create_stmt))).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<RawStatement> {
        schema_file.parse(input).unwrap()
    }

    #[test]
    fn parse_simple_table() {
        let stmts = parse(
            "CREATE TABLE users (\n    id BIGINT NOT NULL PRIMARY KEY,\n    is_active BOOLEAN\n);",
        );
        assert_eq!(stmts.len(), 1);
        let RawStatement::Table(table) = &stmts[0] else {
            panic!("expected table, got {:?}", stmts[0]);
        };
        assert_eq!(table.name, "users");
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[0].not_null);
        assert!(table.columns[0].primary_key);
        assert!(!table.columns[1].not_null);
    }

    #[test]
    fn parse_type_params_skipped() {
        let stmts = parse("CREATE TABLE t (amount DECIMAL(10, 2) NOT NULL);");
        let RawStatement::Table(table) = &stmts[0] else {
            panic!("expected table");
        };
        assert_eq!(table.columns[0].ty, "DECIMAL");
        assert!(table.columns[0].not_null);
    }

    #[test]
    fn parse_constraint_lines_skipped() {
        let stmts = parse(
            "CREATE TABLE t (\n    a INT,\n    b INT,\n    PRIMARY KEY (a, b),\n    UNIQUE (b)\n);",
        );
        let RawStatement::Table(table) = &stmts[0] else {
            panic!("expected table");
        };
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn parse_domain_marker() {
        let stmts = parse("-- domain: billing\nCREATE TABLE invoices (id INT);");
        assert_eq!(stmts[0], RawStatement::Domain("billing".into()));
        assert!(matches!(stmts[1], RawStatement::Table(_)));
    }

    #[test]
    fn plain_comments_ignored() {
        let stmts = parse("-- just a note\nCREATE TABLE t (id INT); -- trailing");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn parse_view_with_aliases_and_aggregate() {
        let stmts = parse(
            "CREATE VIEW v AS\nSELECT c.id, c.name AS course_name, COUNT(e.id) AS enrolled\n\
             FROM courses c\nLEFT JOIN enrollments e ON e.course_id = c.id\nGROUP BY c.id;",
        );
        let RawStatement::View(view) = &stmts[0] else {
            panic!("expected view, got {:?}", stmts[0]);
        };
        assert_eq!(view.name, "v");
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.from.len(), 2);
        assert_eq!(view.from[0].table, "courses");
        assert_eq!(view.from[0].alias.as_deref(), Some("c"));
        assert_eq!(view.from[1].table, "enrollments");
        assert!(matches!(
            &view.items[2].expr,
            RawExpr::Aggregate { func, .. } if func == "COUNT"
        ));
    }

    #[test]
    fn parse_view_count_star() {
        let stmts = parse("CREATE VIEW v AS SELECT COUNT(*) AS total FROM users;");
        let RawStatement::View(view) = &stmts[0] else {
            panic!("expected view");
        };
        assert_eq!(
            view.items[0].expr,
            RawExpr::Aggregate {
                func: "COUNT".into(),
                arg: None
            }
        );
        assert_eq!(view.items[0].alias.as_deref(), Some("total"));
    }

    #[test]
    fn parse_view_where_clause_skipped() {
        let stmts =
            parse("CREATE VIEW v AS SELECT id FROM users WHERE is_active = TRUE AND age > 18;");
        let RawStatement::View(view) = &stmts[0] else {
            panic!("expected view");
        };
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.from.len(), 1);
    }

    #[test]
    fn keywords_case_insensitive() {
        let stmts = parse("create table T (id int);\ncreate view V as select id from T;");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn malformed_table_rejected() {
        assert!(schema_file.parse("CREATE TABLE users id INT;").is_err());
        assert!(schema_file.parse("CREATE users (id INT);").is_err());
        assert!(schema_file.parse("CREATE TABLE users (id INT)").is_err());
    }

    #[test]
    fn explicit_as_alias() {
        let stmts = parse("CREATE VIEW v AS SELECT u.id FROM users AS u;");
        let RawStatement::View(view) = &stmts[0] else {
            panic!("expected view");
        };
        assert_eq!(view.from[0].alias.as_deref(), Some("u"));
    }
}
