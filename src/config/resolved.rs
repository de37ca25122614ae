//! Resolved resource model: config validated and flattened for runtime use.

use crate::config::{FieldType, RouteToggles, ValidationRule};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Primary key type for parsing path ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkType {
    Int,
    Uuid,
    Text,
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub generated: bool,
    pub default: Option<serde_json::Value>,
}

impl FieldInfo {
    /// Storage fills the value when the payload omits it.
    pub fn has_default(&self) -> bool {
        self.generated || self.default.is_some()
    }
}

/// Validation rule with its pattern compiled at resolve time.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    pub rule: ValidationRule,
    pub pattern: Option<Regex>,
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub schema_name: String,
    pub table_name: String,
    /// Normalized route prefix, e.g. `/potatoes`.
    pub prefix: String,
    pub pk: String,
    pub pk_type: PkType,
    pub fields: Vec<FieldInfo>,
    /// Fields accepted by the create route.
    pub create_fields: HashSet<String>,
    /// Fields accepted by the update route (never the key).
    pub update_fields: HashSet<String>,
    pub max_limit: Option<u64>,
    pub routes: RouteToggles,
    pub validation: HashMap<String, CompiledRule>,
}

impl ResolvedResource {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn pk_field(&self) -> &FieldInfo {
        // resolve() guarantees the key is one of the fields
        self.fields
            .iter()
            .find(|f| f.name == self.pk)
            .unwrap_or(&self.fields[0])
    }

    /// Fields whose values must be unique across records, key included.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(move |f| f.unique || f.name == self.pk)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
}
