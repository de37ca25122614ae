//! `sort` query parameter: `["field", "ASC" | "DESC"]`.

use crate::config::ResolvedResource;
use crate::error::AppError;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn parse(resource: &ResolvedResource, raw: &str) -> Result<Self, AppError> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("sort is not valid JSON: {}", e)))?;
        let items = match doc {
            Value::Array(items) if (1..=2).contains(&items.len()) => items,
            _ => {
                return Err(AppError::BadRequest(
                    "sort must be a JSON array [field, order]".into(),
                ))
            }
        };
        let field = items[0]
            .as_str()
            .ok_or_else(|| AppError::BadRequest("sort field must be a string".into()))?;
        if resource.field(field).is_none() {
            return Err(AppError::BadRequest(format!("unknown sort field: {}", field)));
        }
        let order = match items.get(1) {
            None => SortOrder::Asc,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(AppError::BadRequest(format!("invalid sort order: {}", other)))
            }
        };
        Ok(Sort {
            field: field.to_string(),
            order,
        })
    }
}
