//! Query Builder SQL generation
//!
//! A pure mapping from builder state and statement kind to SQL plus the bound
//! values, in the order their placeholders appear.

use super::builder::QueryState;
use super::types::{JoinClause, RenderedQuery, Statement};
use crate::backends::{DatabaseValue, Row, SqlDialect};
use crate::error::{QueryError, QueryResult};

/// Largest row count MySQL accepts in `LIMIT`, used when only an offset is set
const MYSQL_UNBOUNDED_LIMIT: &str = "18446744073709551615";

/// Quote an identifier with backticks, one segment at a time
///
/// `jt.test_name` becomes `` `jt`.`test_name` `` and `*` stays bare.
pub fn quote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|segment| match segment.trim() {
            "*" => "*".to_string(),
            segment => format!("`{}`", segment),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Render a statement against the builder state
pub fn render(
    state: &QueryState,
    statement: &Statement<'_>,
    dialect: SqlDialect,
) -> QueryResult<RenderedQuery> {
    if state.table.trim().is_empty() {
        return Err(QueryError::MissingFields(
            "no table selected, call in_table() or from_table() first".to_string(),
        ));
    }

    let mut bindings = Vec::new();
    let sql = match statement {
        Statement::Insert(rows) => build_insert(&state.table, rows, &mut bindings)?,
        Statement::Upsert { row, conflict_keys } => {
            let insert = build_insert(&state.table, std::slice::from_ref(*row), &mut bindings)?;
            let conflict = build_conflict_clause(row, conflict_keys, dialect)?;
            format!("{} {}", insert, conflict)
        }
        Statement::Update(row) => build_update(state, row, &mut bindings)?,
        Statement::Delete => {
            let mut parts = vec![format!("DELETE FROM {}", quote_identifier(&state.table))];
            parts.extend(build_where(state, &mut bindings));
            parts.join(" ")
        }
        Statement::Select => build_select(state, dialect, &mut bindings),
        Statement::Count => {
            let mut parts = vec!["SELECT COUNT(*) as c".to_string(), build_from(state)];
            parts.extend(build_where(state, &mut bindings));
            parts.join(" ")
        }
        Statement::Exists => {
            let mut parts = vec!["SELECT 1".to_string(), build_from(state)];
            parts.extend(build_where(state, &mut bindings));
            format!("SELECT EXISTS({})", parts.join(" "))
        }
    };

    tracing::trace!("Rendered {} with {} bindings", sql, bindings.len());

    Ok(RenderedQuery { sql, bindings })
}

fn build_insert(
    table: &str,
    rows: &[Row],
    bindings: &mut Vec<DatabaseValue>,
) -> QueryResult<String> {
    let first = rows.first().ok_or_else(|| {
        QueryError::MissingFields("insert requires at least one row".to_string())
    })?;
    if first.is_empty() {
        return Err(QueryError::MissingFields(
            "insert requires at least one column".to_string(),
        ));
    }

    if let Some(index) = rows.iter().position(|row| !first.same_columns(row)) {
        return Err(QueryError::InconsistentRows(index));
    }

    let columns: Vec<&str> = first.keys().collect();
    let group = format!("({})", vec!["?"; columns.len()].join(", "));

    for row in rows {
        bindings.extend(
            columns
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or(DatabaseValue::Null)),
        );
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_identifier(table),
        columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", "),
        vec![group; rows.len()].join(", ")
    ))
}

fn build_conflict_clause(
    row: &Row,
    conflict_keys: &[&str],
    dialect: SqlDialect,
) -> QueryResult<String> {
    if conflict_keys.is_empty() {
        return Err(QueryError::MissingFields(
            "upsert requires at least one conflict key".to_string(),
        ));
    }

    let updated: Vec<&str> = row
        .keys()
        .filter(|column| !conflict_keys.contains(column))
        .collect();

    let clause = if dialect.supports_on_conflict() {
        let keys = conflict_keys
            .iter()
            .map(|key| quote_identifier(key))
            .collect::<Vec<_>>()
            .join(", ");

        if updated.is_empty() {
            format!("ON CONFLICT ({}) DO NOTHING", keys)
        } else {
            let assignments = updated
                .iter()
                .map(|column| {
                    let column = quote_identifier(column);
                    format!("{} = excluded.{}", column, column)
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("ON CONFLICT ({}) DO UPDATE SET {}", keys, assignments)
        }
    } else {
        // MySQL infers the conflicting key; a self-assignment keeps the row untouched
        let assignments = if updated.is_empty() {
            let key = quote_identifier(conflict_keys[0]);
            format!("{} = {}", key, key)
        } else {
            updated
                .iter()
                .map(|column| {
                    let column = quote_identifier(column);
                    format!("{} = VALUES({})", column, column)
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("ON DUPLICATE KEY UPDATE {}", assignments)
    };

    Ok(clause)
}

fn build_update(
    state: &QueryState,
    row: &Row,
    bindings: &mut Vec<DatabaseValue>,
) -> QueryResult<String> {
    if row.is_empty() {
        return Err(QueryError::MissingFields(
            "update requires at least one column".to_string(),
        ));
    }

    let assignments = row
        .iter()
        .map(|(column, value)| {
            bindings.push(value.clone());
            format!("{} = ?", quote_identifier(column))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut parts = vec![format!(
        "UPDATE {} SET {}",
        quote_identifier(&state.table),
        assignments
    )];
    parts.extend(build_where(state, bindings));

    Ok(parts.join(" "))
}

fn build_select(
    state: &QueryState,
    dialect: SqlDialect,
    bindings: &mut Vec<DatabaseValue>,
) -> String {
    let columns = if state.columns.is_empty() {
        "*".to_string()
    } else {
        state
            .columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut parts = vec![format!("SELECT {}", columns), build_from(state)];
    parts.extend(build_where(state, bindings));

    if !state.order_by.is_empty() {
        let order = state
            .order_by
            .iter()
            .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("ORDER BY {}", order));
    }

    match (state.limit_count, state.offset_value) {
        (Some(limit), offset) => {
            parts.push(format!("LIMIT {}", limit));
            if let Some(offset) = offset {
                parts.push(format!("OFFSET {}", offset));
            }
        }
        (None, Some(offset)) => {
            let unbounded = match dialect {
                SqlDialect::SQLite => "-1",
                SqlDialect::MySQL => MYSQL_UNBOUNDED_LIMIT,
            };
            parts.push(format!("LIMIT {}", unbounded));
            parts.push(format!("OFFSET {}", offset));
        }
        (None, None) => {}
    }

    parts.join(" ")
}

/// `FROM t [AS a]` followed by the joins
fn build_from(state: &QueryState) -> String {
    let mut from = format!("FROM {}", quote_identifier(&state.table));
    if let Some(alias) = &state.alias {
        from.push_str(&format!(" AS {}", quote_identifier(alias)));
    }

    for join in &state.joins {
        from.push(' ');
        from.push_str(&build_join(join));
    }

    from
}

fn build_join(join: &JoinClause) -> String {
    let mut sql = format!("INNER JOIN {}", quote_identifier(&join.table));
    if let Some(alias) = &join.alias {
        sql.push_str(&format!(" AS {}", quote_identifier(alias)));
    }

    if !join.on_conditions.is_empty() {
        let on = join
            .on_conditions
            .iter()
            .map(|condition| {
                format!(
                    "{} {} {}",
                    quote_identifier(&condition.left),
                    condition.operator,
                    quote_identifier(&condition.right)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        sql.push_str(&format!(" ON {}", on));
    }

    sql
}

fn build_where(state: &QueryState, bindings: &mut Vec<DatabaseValue>) -> Option<String> {
    if state.conditions.is_empty() {
        return None;
    }

    state.conditions.collect_bindings(bindings);
    Some(format!("WHERE {}", state.conditions.render()))
}
