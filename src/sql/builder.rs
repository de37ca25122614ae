//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a resolved resource.
//! Rows come back as a single JSON column (`row_to_json`) so callers never decode per type.

use crate::config::{FieldType, ResolvedResource};
use crate::query::{Filter, ListQuery};
use crate::service::Payload;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(resource: &ResolvedResource) -> String {
    format!("{}.{}", quoted(&resource.schema_name), quoted(&resource.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Placeholder with a cast to the column's type so text and JSON values bind correctly.
    /// JSON columns take their value as serialized text.
    fn placeholder(&mut self, resource: &ResolvedResource, column: &str, v: Value) -> String {
        let field = resource.field(column);
        let v = match field {
            Some(f) if f.field_type == FieldType::Json && !v.is_null() => Value::String(v.to_string()),
            _ => v,
        };
        let n = self.push_param(v);
        match field {
            Some(f) => format!("${}::{}", n, f.field_type.pg_type()),
            None => format!("${}", n),
        }
    }
}

fn column_list(resource: &ResolvedResource) -> String {
    resource
        .fields
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrap a row-producing statement so each row is one JSON object.
fn as_json_rows(inner: &str) -> String {
    format!("SELECT row_to_json(r) FROM ({}) r", inner)
}

fn as_json_returning(stmt: &str) -> String {
    format!("WITH r AS ({}) SELECT row_to_json(r) FROM r", stmt)
}

fn where_clause(q: &mut QueryBuf, resource: &ResolvedResource, filter: &Filter) -> String {
    let mut parts = Vec::with_capacity(filter.clauses.len());
    for clause in &filter.clauses {
        if clause.values.is_empty() {
            parts.push("FALSE".to_string());
            continue;
        }
        let col = quoted(&clause.field);
        let phs: Vec<String> = clause
            .values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| q.placeholder(resource, &clause.field, v.clone()))
            .collect();
        let wants_null = clause.values.iter().any(Value::is_null);
        parts.push(match (phs.is_empty(), wants_null) {
            (true, _) => format!("{} IS NULL", col),
            (false, false) => format!("{} IN ({})", col, phs.join(", ")),
            (false, true) => format!("({} IN ({}) OR {} IS NULL)", col, phs.join(", "), col),
        });
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT one page: filter, ORDER BY sort then pk, LIMIT/OFFSET.
pub fn select_page(resource: &ResolvedResource, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, resource, &query.filter);
    let pk = quoted(&resource.pk);
    let order_sql = match &query.sort {
        Some(s) if s.field != resource.pk => {
            format!(" ORDER BY {} {}, {}", quoted(&s.field), s.order.as_sql(), pk)
        }
        Some(s) => format!(" ORDER BY {} {}", pk, s.order.as_sql()),
        None => format!(" ORDER BY {}", pk),
    };
    let limit_sql = query
        .pagination
        .limit
        .map(|n| format!(" LIMIT {}", n))
        .unwrap_or_default();
    let offset_sql = if query.pagination.skip > 0 {
        format!(" OFFSET {}", query.pagination.skip)
    } else {
        String::new()
    };
    let inner = format!(
        "SELECT {} FROM {}{}{}{}{}",
        column_list(resource),
        qualified_table(resource),
        where_sql,
        order_sql,
        limit_sql,
        offset_sql
    );
    q.sql = as_json_rows(&inner);
    q
}

/// COUNT(*) over the same filter the page uses.
pub fn count(resource: &ResolvedResource, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, resource, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(resource), where_sql);
    q
}

/// SELECT by primary key; `lock` adds FOR UPDATE for use inside a write transaction.
pub fn select_by_id(resource: &ResolvedResource, id: &Value, lock: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(resource, &resource.pk, id.clone());
    let inner = format!(
        "SELECT {} FROM {} WHERE {} = {}{}",
        column_list(resource),
        qualified_table(resource),
        quoted(&resource.pk),
        ph,
        if lock { " FOR UPDATE" } else { "" }
    );
    q.sql = as_json_rows(&inner);
    q
}

/// INSERT the payload's columns; omitted columns take their DB default.
pub fn insert(resource: &ResolvedResource, payload: &Payload) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut phs = Vec::new();
    for f in &resource.fields {
        let Some(v) = payload.get(&f.name) else { continue };
        phs.push(q.placeholder(resource, &f.name, v.clone()));
        cols.push(quoted(&f.name));
    }
    let stmt = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(resource),
            column_list(resource)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(resource),
            cols.join(", "),
            phs.join(", "),
            column_list(resource)
        )
    };
    q.sql = as_json_returning(&stmt);
    q
}

/// UPDATE by id: SET only payload columns, never the key. Empty payload reads the row back.
pub fn update(resource: &ResolvedResource, id: &Value, payload: &Payload) -> QueryBuf {
    let mut sets = Vec::new();
    let mut q = QueryBuf::new();
    for f in &resource.fields {
        if f.name == resource.pk {
            continue;
        }
        let Some(v) = payload.get(&f.name) else { continue };
        let ph = q.placeholder(resource, &f.name, v.clone());
        sets.push(format!("{} = {}", quoted(&f.name), ph));
    }
    if sets.is_empty() {
        return select_by_id(resource, id, false);
    }
    let id_ph = q.placeholder(resource, &resource.pk, id.clone());
    let stmt = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(resource),
        sets.join(", "),
        quoted(&resource.pk),
        id_ph,
        column_list(resource)
    );
    q.sql = as_json_returning(&stmt);
    q
}

/// DELETE by id, returning the removed row.
pub fn delete(resource: &ResolvedResource, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(resource, &resource.pk, id.clone());
    let stmt = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(resource),
        quoted(&resource.pk),
        ph,
        column_list(resource)
    );
    q.sql = as_json_returning(&stmt);
    q
}

/// DELETE every row.
pub fn delete_all(resource: &ResolvedResource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", qualified_table(resource));
    q
}
