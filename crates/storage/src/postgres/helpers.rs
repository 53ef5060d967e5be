//! Shared helpers for building filtered, ordered range queries.
//!
//! SAFETY: the SQL assembled here is safe from injection because:
//! 1. Column and table names come from static [`TableSpec`]s, and every
//!    column referenced by a filter or an ordering is checked against them
//! 2. Operators and directions come from enums, never from user strings
//! 3. All values are parameterized through `push_bind`

use sqlx::{Postgres, QueryBuilder};

use waypoint_core::cursor::Position;
use waypoint_core::error::{StorageError, StorageResult};
use waypoint_core::models::{FieldValue, ValueKind};
use waypoint_core::ports::{Filter, OrderDirection, OrderSpec, RangeScan};

/// Static description of a table: its name and its filterable columns.
#[derive(Debug)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [(&'static str, ValueKind)],
}

impl TableSpec {
    /// Kind of a known column.
    pub fn column(&self, column: &str) -> StorageResult<ValueKind> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| {
                StorageError::QueryError(format!("unknown column {}.{}", self.name, column))
            })
    }

    fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Which side of a position a bound keeps.
#[derive(Debug, Clone, Copy)]
enum Bound {
    After,
    Before,
}

/// `SELECT COUNT(*)` over the filtered table.
pub fn count_query(
    table: &TableSpec,
    filter: &Filter,
) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE ", table.name));
    push_filter(&mut qb, table, filter)?;
    Ok(qb)
}

/// Bounded, ordered select over the filtered table.
pub fn scan_query(
    table: &TableSpec,
    filter: &Filter,
    scan: &RangeScan<'_>,
) -> StorageResult<QueryBuilder<'static, Postgres>> {
    for key in scan.order.keys() {
        table.column(key.column)?;
    }

    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE ",
        table.select_list(),
        table.name
    ));
    push_filter(&mut qb, table, filter)?;

    if let Some(after) = scan.after {
        qb.push(" AND ");
        push_bound(&mut qb, scan.order, after, Bound::After);
    }
    if let Some(before) = scan.before {
        qb.push(" AND ");
        push_bound(&mut qb, scan.order, before, Bound::Before);
    }

    let direction = scan.effective_direction().as_sql();
    let order_by: Vec<String> = scan
        .order
        .keys()
        .iter()
        .map(|k| format!("{} {}", k.column, direction))
        .collect();
    qb.push(" ORDER BY ");
    qb.push(order_by.join(", "));
    qb.push(" LIMIT ");
    qb.push_bind(scan.limit as i64);

    Ok(qb)
}

/// Append a predicate as a boolean SQL expression.
///
/// Comparisons between a column and a value of another kind are `FALSE`,
/// like [`Filter::matches`].
pub fn push_filter(
    qb: &mut QueryBuilder<'static, Postgres>,
    table: &TableSpec,
    filter: &Filter,
) -> StorageResult<()> {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::Eq(col, v) => push_comparison(qb, table, col, "=", v)?,
        Filter::Neq(col, v) => push_comparison(qb, table, col, "<>", v)?,
        Filter::Gt(col, v) => push_comparison(qb, table, col, ">", v)?,
        Filter::Gte(col, v) => push_comparison(qb, table, col, ">=", v)?,
        Filter::Lt(col, v) => push_comparison(qb, table, col, "<", v)?,
        Filter::Lte(col, v) => push_comparison(qb, table, col, "<=", v)?,
        Filter::In(col, values) => {
            let kind = table.column(col)?;
            let values: Vec<&FieldValue> = values.iter().filter(|v| v.kind() == kind).collect();
            if values.is_empty() {
                qb.push("FALSE");
            } else {
                qb.push(*col).push(" IN (");
                let mut list = qb.separated(", ");
                for value in values {
                    push_separated_value(&mut list, value);
                }
                qb.push(")");
            }
        }
        Filter::Contains(col, needle) => {
            if table.column(col)? == ValueKind::Text {
                qb.push("strpos(").push(*col).push(", ");
                qb.push_bind(needle.clone()).push(") > 0");
            } else {
                qb.push("FALSE");
            }
        }
        Filter::HasPrefix(col, prefix) => {
            if table.column(col)? == ValueKind::Text {
                qb.push("starts_with(").push(*col).push(", ");
                qb.push_bind(prefix.clone()).push(")");
            } else {
                qb.push("FALSE");
            }
        }
        Filter::And(filters) => push_junction(qb, table, filters, " AND ", "TRUE")?,
        Filter::Or(filters) => push_junction(qb, table, filters, " OR ", "FALSE")?,
        Filter::Not(inner) => {
            qb.push("NOT (");
            push_filter(qb, table, inner)?;
            qb.push(")");
        }
    }
    Ok(())
}

fn push_comparison(
    qb: &mut QueryBuilder<'static, Postgres>,
    table: &TableSpec,
    column: &'static str,
    op: &str,
    value: &FieldValue,
) -> StorageResult<()> {
    if table.column(column)? != value.kind() {
        qb.push("FALSE");
        return Ok(());
    }
    qb.push(column).push(" ").push(op).push(" ");
    push_value(qb, value);
    Ok(())
}

fn push_junction(
    qb: &mut QueryBuilder<'static, Postgres>,
    table: &TableSpec,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) -> StorageResult<()> {
    if filters.is_empty() {
        qb.push(empty);
        return Ok(());
    }
    qb.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_filter(qb, table, filter)?;
    }
    qb.push(")");
    Ok(())
}

/// Row-value comparison against a position: `(c1, c2) > ($1, $2)`.
///
/// The operator is flipped for descending orders so the bound always
/// follows the declared order.
fn push_bound(
    qb: &mut QueryBuilder<'static, Postgres>,
    order: &OrderSpec,
    position: &Position,
    bound: Bound,
) {
    let op = match (bound, order.direction()) {
        (Bound::After, OrderDirection::Asc) | (Bound::Before, OrderDirection::Desc) => ">",
        (Bound::After, OrderDirection::Desc) | (Bound::Before, OrderDirection::Asc) => "<",
    };
    let columns: Vec<&str> = order.keys().iter().map(|k| k.column).collect();

    qb.push("(").push(columns.join(", ")).push(") ").push(op).push(" (");
    let mut list = qb.separated(", ");
    for value in position.values() {
        push_separated_value(&mut list, value);
    }
    list.push_unseparated(")");
}

/// Bind a scalar value.
pub fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Int(v) => qb.push_bind(*v),
        FieldValue::Text(v) => qb.push_bind(v.clone()),
        FieldValue::Uuid(v) => qb.push_bind(*v),
        FieldValue::Timestamp(v) => qb.push_bind(*v),
    };
}

fn push_separated_value(
    list: &mut sqlx::query_builder::Separated<'_, 'static, Postgres, &'static str>,
    value: &FieldValue,
) {
    match value {
        FieldValue::Int(v) => list.push_bind(*v),
        FieldValue::Text(v) => list.push_bind(v.clone()),
        FieldValue::Uuid(v) => list.push_bind(*v),
        FieldValue::Timestamp(v) => list.push_bind(*v),
    };
}
