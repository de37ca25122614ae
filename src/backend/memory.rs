//! In-process adapter. Tables live in a map keyed by qualified table name; a write lock is
//! held across each check-then-write so a rejected write never leaves partial state.

use super::{not_found, CrudBackend, Page};
use crate::config::{FieldInfo, FieldType, PkType, ResolvedResource};
use crate::error::AppError;
use crate::query::{ListQuery, SortOrder};
use crate::service::{value_eq, Payload};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    rows: Vec<Value>,
    /// Last value handed out per generated integer field.
    sequences: HashMap<String, i64>,
}

impl Table {
    fn position(&self, resource: &ResolvedResource, id: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.get(&resource.pk).map(|v| value_eq(v, id)).unwrap_or(false))
    }

    /// First unique field whose value collides with a row other than `skip`.
    fn conflict(&self, resource: &ResolvedResource, candidate: &Value, skip: Option<usize>) -> Option<String> {
        for field in resource.unique_fields() {
            let Some(v) = candidate.get(&field.name).filter(|v| !v.is_null()) else { continue };
            let clash = self.rows.iter().enumerate().any(|(i, row)| {
                Some(i) != skip && row.get(&field.name).map(|o| value_eq(o, v)).unwrap_or(false)
            });
            if clash {
                return Some(field.name.clone());
            }
        }
        None
    }
}

/// Storage-assigned value for a generated field, mirroring the column defaults the
/// table DDL declares (serial, random uuid, now, current date).
fn generated_value(field: &FieldInfo, sequences: &mut HashMap<String, i64>) -> Value {
    match field.field_type {
        FieldType::Integer => {
            let seq = sequences.entry(field.name.clone()).or_insert(0);
            *seq += 1;
            Value::from(*seq)
        }
        FieldType::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
        FieldType::Timestamp => Value::String(chrono::Utc::now().to_rfc3339()),
        FieldType::Date => Value::String(chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()),
        _ => Value::Null,
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(resource: &ResolvedResource) -> String {
        format!("{}.{}", resource.schema_name, resource.table_name)
    }
}

fn page_of(resource: &ResolvedResource, rows: &[Value], query: &ListQuery) -> Page {
    let mut matched: Vec<&Value> = rows.iter().filter(|r| query.filter.matches(r)).collect();
    let total = matched.len() as u64;
    let pk = resource.pk.as_str();
    matched.sort_by(|a, b| {
        let by_pk = || compare_values(a.get(pk), b.get(pk));
        match &query.sort {
            Some(s) => {
                let ord = compare_values(a.get(&s.field), b.get(&s.field));
                let ord = match s.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                if s.field == pk {
                    ord
                } else {
                    ord.then_with(by_pk)
                }
            }
            None => by_pk(),
        }
    });
    let skip = query.pagination.skip.min(usize::MAX as u64) as usize;
    let items = matched
        .into_iter()
        .skip(skip)
        .take(query.pagination.limit.map(|l| l as usize).unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Page { items, total }
}

/// Total order matching PostgreSQL's default: nulls sort after every value.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl CrudBackend for MemoryBackend {
    async fn list(&self, resource: &ResolvedResource, query: &ListQuery) -> Result<Page, AppError> {
        let tables = self.tables.read().await;
        let rows = tables.get(&Self::key(resource)).map(|t| t.rows.as_slice()).unwrap_or(&[]);
        Ok(page_of(resource, rows, query))
    }

    async fn get_one(&self, resource: &ResolvedResource, id: &Value) -> Result<Value, AppError> {
        let tables = self.tables.read().await;
        tables
            .get(&Self::key(resource))
            .and_then(|t| t.position(resource, id).map(|i| t.rows[i].clone()))
            .ok_or_else(|| not_found(resource, id))
    }

    async fn create(&self, resource: &ResolvedResource, payload: &Payload) -> Result<Value, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(Self::key(resource)).or_default();
        let mut sequences = table.sequences.clone();

        let mut record = Map::new();
        for field in &resource.fields {
            let value = match (payload.get(&field.name), &field.default) {
                (Some(v), _) => v.clone(),
                (None, Some(d)) => d.clone(),
                (None, None) if field.generated => generated_value(field, &mut sequences),
                (None, None) => Value::Null,
            };
            record.insert(field.name.clone(), value);
        }
        let record = Value::Object(record);

        if record.get(&resource.pk).map(Value::is_null).unwrap_or(true) {
            return Err(AppError::Conflict(format!("{} must not be null", resource.pk)));
        }
        if let Some(field) = table.conflict(resource, &record, None) {
            tracing::warn!(table = %resource.table_name, field = %field, "unique violation");
            return Err(AppError::Conflict("Key already exists".into()));
        }

        if resource.pk_type == PkType::Int {
            if let Some(n) = record.get(&resource.pk).and_then(Value::as_i64) {
                let seq = sequences.entry(resource.pk.clone()).or_insert(0);
                *seq = (*seq).max(n);
            }
        }
        table.sequences = sequences;
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, resource: &ResolvedResource, id: &Value, payload: &Payload) -> Result<Value, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&Self::key(resource))
            .ok_or_else(|| not_found(resource, id))?;
        let idx = table.position(resource, id).ok_or_else(|| not_found(resource, id))?;

        let mut updated = table.rows[idx].clone();
        if let Value::Object(map) = &mut updated {
            for (k, v) in payload {
                if *k == resource.pk || !map.contains_key(k) {
                    continue;
                }
                map.insert(k.clone(), v.clone());
            }
        }
        if let Some(field) = table.conflict(resource, &updated, Some(idx)) {
            tracing::warn!(table = %resource.table_name, field = %field, "unique violation");
            return Err(AppError::Conflict(format!(
                "duplicate key value violates unique constraint on {}",
                field
            )));
        }
        table.rows[idx] = updated.clone();
        Ok(updated)
    }

    async fn delete_one(&self, resource: &ResolvedResource, id: &Value) -> Result<Value, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&Self::key(resource))
            .ok_or_else(|| not_found(resource, id))?;
        let idx = table.position(resource, id).ok_or_else(|| not_found(resource, id))?;
        Ok(table.rows.remove(idx))
    }

    async fn delete_all(&self, resource: &ResolvedResource) -> Result<Page, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(Self::key(resource)).or_default();
        table.rows.clear();
        Ok(page_of(resource, &table.rows, &ListQuery::unbounded()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_resource, CrudSettings, ResourceConfig};
    use crate::query::{Filter, Pagination, Sort};
    use serde_json::json;

    fn heroes() -> ResolvedResource {
        let rc: ResourceConfig = serde_json::from_value(json!({
            "table": "heroes",
            "fields": [
                { "name": "id", "type": "integer", "generated": true },
                { "name": "name", "type": "string", "nullable": false, "unique": true },
                { "name": "power", "type": "integer" },
                { "name": "team", "type": "string", "default": "none" }
            ]
        }))
        .unwrap();
        resolve_resource(&rc, &CrudSettings::default()).unwrap()
    }

    fn payload(v: Value) -> Payload {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_defaults() {
        let db = MemoryBackend::new();
        let r = heroes();
        let a = db.create(&r, &payload(json!({ "name": "a" }))).await.unwrap();
        let b = db.create(&r, &payload(json!({ "name": "b", "power": 3 }))).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert_eq!(a["team"], json!("none"));
        assert_eq!(a["power"], Value::Null);
    }

    #[tokio::test]
    async fn generated_fields_are_filled_like_column_defaults() {
        let rc: ResourceConfig = serde_json::from_value(json!({
            "table": "tickets",
            "fields": [
                { "name": "id", "type": "uuid", "generated": true },
                { "name": "number", "type": "integer", "generated": true },
                { "name": "token", "type": "uuid", "generated": true },
                { "name": "issued_on", "type": "date", "generated": true },
                { "name": "created_at", "type": "timestamp", "generated": true },
                { "name": "rank", "type": "integer", "generated": true, "default": 7 }
            ]
        }))
        .unwrap();
        let r = resolve_resource(&rc, &CrudSettings::default()).unwrap();
        let db = MemoryBackend::new();
        let a = db.create(&r, &Payload::new()).await.unwrap();
        let b = db.create(&r, &Payload::new()).await.unwrap();

        assert_eq!(a["number"], json!(1));
        assert_eq!(b["number"], json!(2));
        assert!(uuid::Uuid::parse_str(a["id"].as_str().unwrap()).is_ok());
        assert!(uuid::Uuid::parse_str(a["token"].as_str().unwrap()).is_ok());
        assert_ne!(a["token"], b["token"]);
        assert!(chrono::NaiveDate::parse_from_str(a["issued_on"].as_str().unwrap(), "%Y-%m-%d").is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(a["created_at"].as_str().unwrap()).is_ok());
        assert_eq!(a["rank"], json!(7));
    }

    #[tokio::test]
    async fn duplicate_unique_value_leaves_table_unchanged() {
        let db = MemoryBackend::new();
        let r = heroes();
        db.create(&r, &payload(json!({ "name": "a" }))).await.unwrap();
        let err = db.create(&r, &payload(json!({ "name": "a" }))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Key already exists"));
        let page = db.list(&r, &ListQuery::unbounded()).await.unwrap();
        assert_eq!(page.total, 1);

        let c = db.create(&r, &payload(json!({ "name": "c" }))).await.unwrap();
        assert_eq!(c["id"], json!(2));
    }

    #[tokio::test]
    async fn update_conflict_keeps_previous_state() {
        let db = MemoryBackend::new();
        let r = heroes();
        db.create(&r, &payload(json!({ "name": "a" }))).await.unwrap();
        db.create(&r, &payload(json!({ "name": "b" }))).await.unwrap();
        let err = db
            .update(&r, &json!(2), &payload(json!({ "name": "a" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(db.get_one(&r, &json!(2)).await.unwrap()["name"], json!("b"));
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let db = MemoryBackend::new();
        let r = heroes();
        assert!(matches!(db.get_one(&r, &json!(1)).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            db.update(&r, &json!(1), &Payload::new()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(db.delete_one(&r, &json!(1)).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_counts_before_paging_and_sorts() {
        let db = MemoryBackend::new();
        let r = heroes();
        for (name, power) in [("a", 5), ("b", 1), ("c", 3), ("d", 3)] {
            db.create(&r, &payload(json!({ "name": name, "power": power }))).await.unwrap();
        }
        let query = ListQuery {
            pagination: Pagination { skip: 1, limit: Some(2) },
            filter: Filter::parse(&r, r#"{"power": [3, 5]}"#).unwrap(),
            sort: Some(Sort::parse(&r, r#"["power", "DESC"]"#).unwrap()),
        };
        let page = db.list(&r, &query).await.unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().map(|i| i["name"].clone()).collect();
        assert_eq!(names, vec![json!("c"), json!("d")]);
    }

    #[tokio::test]
    async fn nulls_sort_last() {
        let db = MemoryBackend::new();
        let r = heroes();
        db.create(&r, &payload(json!({ "name": "a" }))).await.unwrap();
        db.create(&r, &payload(json!({ "name": "b", "power": 2 }))).await.unwrap();
        let query = ListQuery {
            sort: Some(Sort::parse(&r, r#"["power"]"#).unwrap()),
            ..ListQuery::unbounded()
        };
        let page = db.list(&r, &query).await.unwrap();
        assert_eq!(page.items[0]["name"], json!("b"));
    }

    #[tokio::test]
    async fn delete_all_empties_table() {
        let db = MemoryBackend::new();
        let r = heroes();
        db.create(&r, &payload(json!({ "name": "a" }))).await.unwrap();
        let page = db.delete_all(&r).await.unwrap();
        assert_eq!(page, Page { items: vec![], total: 0 });
    }
}
