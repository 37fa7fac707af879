use crate::types::{Field, Model, ModelIr, NeutralType, View};

use super::error::SchemaError;
use super::grammar::{RawColumn, RawExpr, RawStatement, RawTable, RawTableRef, RawView};

/// Domain assigned to statements that appear before any `-- domain:` marker.
const FALLBACK_DOMAIN: &str = "core";

/// Lower raw DDL statements into the Model IR. Tables are lowered first so
/// that views, which may appear anywhere in the file, resolve against the
/// full set of tables.
pub(crate) fn build_ir(statements: Vec<RawStatement>) -> Result<ModelIr, SchemaError> {
    let mut ir = ModelIr::new();
    let mut models: Vec<Model> = Vec::new();
    let mut views: Vec<(String, RawView)> = Vec::new();

    let mut domain = FALLBACK_DOMAIN.to_owned();
    for stmt in statements {
        match stmt {
            RawStatement::Domain(name) => domain = name,
            RawStatement::Table(table) => models.push(lower_table(&domain, table)?),
            RawStatement::View(view) => views.push((domain.clone(), view)),
        }
    }

    for model in &models {
        ir.add_model(model.clone())?;
    }
    for (domain, view) in views {
        ir.add_view(lower_view(&domain, view, &models)?)?;
    }
    Ok(ir)
}

fn lower_table(domain: &str, table: RawTable) -> Result<Model, SchemaError> {
    let mut fields = Vec::with_capacity(table.columns.len());
    for (ordinal, col) in table.columns.into_iter().enumerate() {
        let ty = neutral_type(&col.ty).ok_or_else(|| SchemaError::UnknownType {
            table: table.name.clone(),
            column: col.name.clone(),
            ty: col.ty.clone(),
        })?;
        fields.push(Field {
            name: col.name,
            ty,
            // A primary key is implicitly non-nullable.
            nullable: !col.not_null && !col.primary_key,
            is_primary_key: col.primary_key,
            ordinal,
        });
    }
    Ok(Model {
        name: table.name.clone(),
        domain: domain.to_owned(),
        source_table: table.name,
        fields,
    })
}

fn lower_view(domain: &str, view: RawView, models: &[Model]) -> Result<View, SchemaError> {
    let mut fields = Vec::with_capacity(view.items.len());
    for (ordinal, item) in view.items.iter().enumerate() {
        let (name, ty, nullable) =
            resolve_item(&view, domain, item.alias.as_deref(), &item.expr, models)?;
        fields.push(Field {
            name,
            ty,
            nullable,
            is_primary_key: false,
            ordinal,
        });
    }
    Ok(View {
        name: view.name.clone(),
        domain: domain.to_owned(),
        source_view: view.name,
        fields,
    })
}

fn resolve_item(
    view: &RawView,
    domain: &str,
    alias: Option<&str>,
    expr: &RawExpr,
    models: &[Model],
) -> Result<(String, NeutralType, bool), SchemaError> {
    match expr {
        RawExpr::Column { qualifier, name } => {
            let source = resolve_column(view, domain, qualifier.as_deref(), name, models)?;
            let out_name = alias.unwrap_or(name).to_owned();
            Ok((out_name, source.ty, source.nullable))
        }
        RawExpr::Aggregate { func, arg } => {
            let out_name = alias
                .ok_or_else(|| SchemaError::Unresolved {
                    view: view.name.clone(),
                    expr: render_aggregate(func, arg.as_ref()),
                })?
                .to_owned();
            let (ty, nullable) = match func.to_ascii_uppercase().as_str() {
                // COUNT is total even over an empty group.
                "COUNT" => (NeutralType::Int64, false),
                "SUM" => (NeutralType::Decimal, true),
                "AVG" => (NeutralType::Float64, true),
                "MIN" | "MAX" => {
                    let (qualifier, col) =
                        arg.as_ref().ok_or_else(|| SchemaError::Unresolved {
                            view: view.name.clone(),
                            expr: render_aggregate(func, None),
                        })?;
                    let source = resolve_column(view, domain, qualifier.as_deref(), col, models)?;
                    (source.ty, true)
                }
                _ => {
                    return Err(SchemaError::Unresolved {
                        view: view.name.clone(),
                        expr: render_aggregate(func, arg.as_ref()),
                    })
                }
            };
            Ok((out_name, ty, nullable))
        }
    }
}

/// Resolve a column reference against the view's FROM sources. A qualifier
/// matches a source's alias if it has one, otherwise its table name; an
/// unqualified name takes the first match in FROM order.
fn resolve_column<'a>(
    view: &RawView,
    domain: &str,
    qualifier: Option<&str>,
    name: &str,
    models: &'a [Model],
) -> Result<&'a Field, SchemaError> {
    let unresolved = || SchemaError::Unresolved {
        view: view.name.clone(),
        expr: match qualifier {
            Some(q) => format!("{q}.{name}"),
            None => name.to_owned(),
        },
    };

    let sources: Vec<&RawTableRef> = match qualifier {
        Some(q) => view.from.iter().filter(|s| source_matches(s, q)).collect(),
        None => view.from.iter().collect(),
    };
    for source in sources {
        if let Some(model) = find_model(models, domain, &source.table) {
            if let Some(field) = model.fields.iter().find(|f| f.name == name) {
                return Ok(field);
            }
        }
    }
    Err(unresolved())
}

/// A table name declared in several domains resolves to the view's own
/// domain when it has one, falling back to declaration order otherwise.
fn find_model<'a>(models: &'a [Model], domain: &str, table: &str) -> Option<&'a Model> {
    models
        .iter()
        .find(|m| m.name == table && m.domain == domain)
        .or_else(|| models.iter().find(|m| m.name == table))
}

fn source_matches(source: &RawTableRef, qualifier: &str) -> bool {
    match &source.alias {
        Some(alias) => alias == qualifier,
        None => source.table == qualifier,
    }
}

fn render_aggregate(func: &str, arg: Option<&(Option<String>, String)>) -> String {
    match arg {
        Some((Some(q), col)) => format!("{func}({q}.{col})"),
        Some((None, col)) => format!("{func}({col})"),
        None => format!("{func}(*)"),
    }
}

fn neutral_type(sql: &str) -> Option<NeutralType> {
    Some(match sql.to_ascii_uppercase().as_str() {
        "VARCHAR" | "CHAR" | "TEXT" => NeutralType::String,
        "INT" | "INTEGER" | "SMALLINT" | "TINYINT" => NeutralType::Int32,
        "BIGINT" => NeutralType::Int64,
        "DECIMAL" | "NUMERIC" => NeutralType::Decimal,
        "FLOAT" | "DOUBLE" | "REAL" => NeutralType::Float64,
        "DATE" => NeutralType::Date,
        "TIMESTAMP" | "DATETIME" => NeutralType::Datetime,
        "BOOLEAN" | "BOOL" => NeutralType::Bool,
        _ => return None,
    })
}
