//! `filter` query parameter: `{"attr": [v1, v2], ...}`.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::service::{coerce, value_eq};
use serde_json::{Map, Value};

/// One attribute and the values it may take (OR within the set).
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub values: Vec<Value>,
}

/// Conjunction of clauses over distinct attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<FilterClause>,
}

impl Filter {
    /// Parse the raw JSON string. Unknown attributes are rejected, not ignored.
    pub fn parse(resource: &ResolvedResource, raw: &str) -> Result<Self, AppError> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("filter is not valid JSON: {}", e)))?;
        let Value::Object(map) = doc else {
            return Err(AppError::BadRequest("filter must be a JSON object".into()));
        };
        Self::from_map(resource, map)
    }

    fn from_map(resource: &ResolvedResource, map: Map<String, Value>) -> Result<Self, AppError> {
        let mut clauses = Vec::with_capacity(map.len());
        for (attr, value) in map {
            let field = resource
                .field(&attr)
                .ok_or_else(|| AppError::BadRequest(format!("unknown filter attribute: {}", attr)))?;
            let Value::Array(items) = value else {
                return Err(AppError::BadRequest(format!(
                    "filter values for {} must be an array",
                    attr
                )));
            };
            let mut values = Vec::with_capacity(items.len());
            for item in &items {
                let v = coerce(field.field_type, item, true).ok_or_else(|| {
                    AppError::BadRequest(format!("invalid filter value for {}: {}", attr, item))
                })?;
                values.push(v);
            }
            clauses.push(FilterClause { field: attr, values });
        }
        Ok(Filter { clauses })
    }

    /// Evaluate against an in-memory record.
    pub fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|c| {
            let actual = record.get(&c.field).unwrap_or(&Value::Null);
            c.values.iter().any(|v| value_eq(actual, v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_resource, CrudSettings, ResourceConfig};
    use serde_json::json;

    fn potatoes() -> ResolvedResource {
        let rc: ResourceConfig = serde_json::from_value(json!({
            "table": "potatoes",
            "fields": [
                { "name": "id", "type": "uuid", "generated": true },
                { "name": "color", "type": "string" },
                { "name": "mass", "type": "integer" }
            ]
        }))
        .unwrap();
        resolve_resource(&rc, &CrudSettings::default()).unwrap()
    }

    #[test]
    fn parses_value_sets() {
        let f = Filter::parse(&potatoes(), r#"{"color": ["red", "brown"], "mass": ["3", 4]}"#).unwrap();
        assert_eq!(f.clauses.len(), 2);
        let mass = f.clauses.iter().find(|c| c.field == "mass").unwrap();
        assert_eq!(mass.values, vec![json!(3), json!(4)]);
    }

    #[test]
    fn malformed_json_is_a_client_error() {
        assert!(matches!(Filter::parse(&potatoes(), "{color"), Err(AppError::BadRequest(_))));
        assert!(matches!(Filter::parse(&potatoes(), "[1]"), Err(AppError::BadRequest(_))));
        assert!(matches!(
            Filter::parse(&potatoes(), r#"{"color": "red"}"#),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let err = Filter::parse(&potatoes(), r#"{"shape": ["round"]}"#).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("shape")));
    }

    #[test]
    fn uncoercible_value_is_rejected() {
        assert!(Filter::parse(&potatoes(), r#"{"id": ["not-a-uuid"]}"#).is_err());
    }

    #[test]
    fn matches_and_across_attributes_or_within() {
        let f = Filter::parse(&potatoes(), r#"{"color": ["red", "brown"], "mass": [3]}"#).unwrap();
        assert!(f.matches(&json!({ "color": "red", "mass": 3 })));
        assert!(f.matches(&json!({ "color": "brown", "mass": 3.0 })));
        assert!(!f.matches(&json!({ "color": "red", "mass": 4 })));
        assert!(!f.matches(&json!({ "color": "white", "mass": 3 })));
    }

    #[test]
    fn empty_value_set_matches_nothing() {
        let f = Filter::parse(&potatoes(), r#"{"color": []}"#).unwrap();
        assert!(!f.matches(&json!({ "color": "red" })));
    }
}
