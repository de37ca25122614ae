//! Raw resource config types matching the JSON document.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level document: `{ "resources": [...] }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Uuid,
    Timestamp,
    Date,
    Json,
}

impl FieldType {
    /// PostgreSQL type used for casts and DDL.
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldType::String => "text",
            FieldType::Integer => "bigint",
            FieldType::Float => "double precision",
            FieldType::Boolean => "boolean",
            FieldType::Uuid => "uuid",
            FieldType::Timestamp => "timestamptz",
            FieldType::Date => "date",
            FieldType::Json => "jsonb",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    /// Value assigned by storage (serial / random uuid). Excluded from create payloads when it is the key.
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

fn default_pk() -> String {
    "id".into()
}

fn default_schema() -> String {
    "public".into()
}

/// Which of the six generated routes are registered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteToggles {
    #[serde(default = "default_true")]
    pub get_all: bool,
    #[serde(default = "default_true")]
    pub get_one: bool,
    #[serde(default = "default_true")]
    pub create: bool,
    #[serde(default = "default_true")]
    pub update: bool,
    #[serde(default = "default_true")]
    pub delete_one: bool,
    #[serde(default = "default_true")]
    pub delete_all: bool,
}

impl Default for RouteToggles {
    fn default() -> Self {
        RouteToggles {
            get_all: true,
            get_one: true,
            create: true,
            update: true,
            delete_one: true,
            delete_all: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub table: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Route prefix override. Falls back to the table name.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_pk")]
    pub primary_key: String,
    pub fields: Vec<FieldConfig>,
    /// Maximum `limit` accepted by the list route; also its default.
    #[serde(default)]
    pub paginate: Option<u64>,
    #[serde(default)]
    pub routes: RouteToggles,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}
