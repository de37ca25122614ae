//! DDL for resolved resources: schema and table, created if missing.
//! Existing tables are left as they are; columns are never altered.

use crate::config::{FieldInfo, FieldType, ResolvedModel, ResolvedResource};
use crate::error::AppError;
use serde_json::Value;
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// SQL literal for a configured default, cast to the column type.
fn default_literal(ty: FieldType, value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if ty == FieldType::Json => format!("{}::jsonb", literal(&Value::String(s.clone()).to_string())),
        Value::String(s) => format!("{}::{}", literal(s), ty.pg_type()),
        other => format!("{}::jsonb", literal(&other.to_string())),
    }
}

fn column_def(resource: &ResolvedResource, f: &FieldInfo) -> String {
    let is_pk = f.name == resource.pk;
    let typ = match f.field_type {
        FieldType::Integer if f.generated => "BIGSERIAL".to_string(),
        other => other.pg_type().to_uppercase(),
    };
    let mut def = format!("{} {}", quote(&f.name), typ);
    if is_pk {
        def.push_str(" PRIMARY KEY");
    } else {
        if !f.nullable {
            def.push_str(" NOT NULL");
        }
        if f.unique {
            def.push_str(" UNIQUE");
        }
    }
    match (&f.default, f.generated, f.field_type) {
        (Some(d), _, ty) => {
            def.push_str(" DEFAULT ");
            def.push_str(&default_literal(ty, d));
        }
        (None, true, FieldType::Uuid) => def.push_str(" DEFAULT gen_random_uuid()"),
        (None, true, FieldType::Timestamp) => def.push_str(" DEFAULT NOW()"),
        (None, true, FieldType::Date) => def.push_str(" DEFAULT CURRENT_DATE"),
        _ => {}
    }
    def
}

/// Statements that create the resource's schema and table when missing.
pub fn resource_ddl(resource: &ResolvedResource) -> Vec<String> {
    let schema = quote(&resource.schema_name);
    let col_defs: Vec<String> = resource.fields.iter().map(|f| column_def(resource, f)).collect();
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", schema),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.{} (\n  {}\n)",
            schema,
            quote(&resource.table_name),
            col_defs.join(",\n  ")
        ),
    ]
}

pub async fn ensure_resource_table(pool: &PgPool, resource: &ResolvedResource) -> Result<(), AppError> {
    for sql in resource_ddl(resource) {
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(schema = %resource.schema_name, table = %resource.table_name, "table ready");
    Ok(())
}

/// Run [`ensure_resource_table`] for every resource in the model.
pub async fn ensure_model_tables(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    for resource in &model.resources {
        ensure_resource_table(pool, resource).await?;
    }
    Ok(())
}
