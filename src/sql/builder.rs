//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for catalog entities.
//!
//! Every statement is scoped: `$1` is the account type and `$2` the account id, and
//! both appear in the WHERE clause (or the VALUES list for inserts). There is no way
//! to build an unscoped statement for a scoped entity.

use crate::account::AccountRef;
use crate::config::{ColumnType, EntityDef};
use crate::error::AppError;
use crate::sql::PgBindValue;
use crate::store::Row;
use serde_json::Value;

/// Quote identifier for PostgreSQL (identifiers come from the catalog only).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Fully qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn scoped(scope: AccountRef) -> Self {
        QueryBuf {
            sql: String::new(),
            params: vec![
                PgBindValue::String(scope.kind.as_str().to_string()),
                PgBindValue::Uuid(scope.id),
            ],
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

const SCOPE_PREDICATE: &str = "\"account_type\" = $1 AND \"account_id\" = $2";

/// SELECT list: id, readable columns, timestamps. Numeric comes back as float8 and
/// dates as text so rows decode into JSON numbers and strings.
pub fn select_column_list(entity: &EntityDef) -> String {
    let mut cols = vec![quoted("id")];
    for c in entity.readable_columns() {
        let q = quoted(c.name);
        cols.push(match c.ty {
            ColumnType::Numeric => format!("{}::float8 AS {}", q, q),
            ColumnType::Date => format!("{}::text AS {}", q, q),
            _ => q,
        });
    }
    cols.push(quoted("created_at"));
    cols.push(quoted("updated_at"));
    cols.join(", ")
}

fn placeholder(param_num: usize, ty: ColumnType) -> String {
    format!("${}::{}", param_num, ty.cast())
}

/// SELECT list with exact-match filters, ORDER BY id, LIMIT/OFFSET.
/// Filters on columns the entity does not expose are ignored.
pub fn select_list(
    schema: &str,
    entity: &EntityDef,
    scope: AccountRef,
    filters: &[(String, Value)],
    limit: u32,
    offset: u32,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::scoped(scope);
    let mut where_parts = vec![SCOPE_PREDICATE.to_string()];
    for (col, val) in filters {
        let Some(c) = entity.readable_columns().find(|c| c.name == col.as_str()) else {
            continue;
        };
        if val.is_null() {
            where_parts.push(format!("{} IS NULL", quoted(c.name)));
            continue;
        }
        let n = q.push_param(PgBindValue::for_column(c.ty, val)?);
        where_parts.push(format!("{} = {}", quoted(c.name), placeholder(n, c.ty)));
    }
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(entity),
        qualified_table(schema, entity.table),
        where_parts.join(" AND "),
        quoted("id"),
        limit,
        offset
    );
    Ok(q)
}

/// SELECT one row by id within the scope.
pub fn select_by_id(schema: &str, entity: &EntityDef, scope: AccountRef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::scoped(scope);
    let n = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} AND {} = ${}",
        select_column_list(entity),
        qualified_table(schema, entity.table),
        SCOPE_PREDICATE,
        quoted("id"),
        n
    );
    q
}

/// INSERT one row owned by the scope. Only declared columns present in `values` are written.
pub fn insert(schema: &str, entity: &EntityDef, scope: AccountRef, values: &Row) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::scoped(scope);
    let mut cols = vec![quoted("account_type"), quoted("account_id")];
    let mut placeholders = vec!["$1".to_string(), "$2".to_string()];
    for c in &entity.columns {
        let Some(val) = values.get(c.name) else { continue };
        let n = q.push_param(PgBindValue::for_column(c.ty, val)?);
        cols.push(quoted(c.name));
        placeholders.push(placeholder(n, c.ty));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        qualified_table(schema, entity.table),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity)
    );
    Ok(q)
}

/// UPDATE by id within the scope: SET only declared columns present in `values`.
pub fn update(
    schema: &str,
    entity: &EntityDef,
    scope: AccountRef,
    id: i64,
    values: &Row,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::scoped(scope);
    let mut sets = Vec::new();
    for c in &entity.columns {
        let Some(val) = values.get(c.name) else { continue };
        let n = q.push_param(PgBindValue::for_column(c.ty, val)?);
        sets.push(format!("{} = {}", quoted(c.name), placeholder(n, c.ty)));
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_param = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} AND {} = ${} RETURNING {}",
        qualified_table(schema, entity.table),
        sets.join(", "),
        SCOPE_PREDICATE,
        quoted("id"),
        id_param,
        select_column_list(entity)
    );
    Ok(q)
}

/// DELETE by id within the scope.
pub fn delete(schema: &str, entity: &EntityDef, scope: AccountRef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::scoped(scope);
    let n = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} AND {} = ${}",
        qualified_table(schema, entity.table),
        SCOPE_PREDICATE,
        quoted("id"),
        n
    );
    q
}
