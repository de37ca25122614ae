//! Config validation: keys, field names and rules checked once, before any route is built.

use crate::config::{FieldType, ResourceConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Characters the router treats as path syntax (captures, wildcards, query, fragment).
const ROUTE_SYNTAX: &[char] = &[':', '*', '{', '}', '?', '#'];

/// A path fragment used in a route must be plain text.
pub fn validate_route_path(table: &str, path: &str) -> Result<(), ConfigError> {
    if let Some(c) = path.chars().find(|c| ROUTE_SYNTAX.contains(c) || c.is_whitespace()) {
        return Err(ConfigError::Validation(format!(
            "resource '{}': route path '{}' contains '{}'",
            table, path, c
        )));
    }
    Ok(())
}

pub fn validate_resource(resource: &ResourceConfig) -> Result<(), ConfigError> {
    let table = resource.table.trim();
    if table.trim_matches('/').is_empty() {
        return Err(ConfigError::EmptyTable(resource.table.clone()));
    }
    let route_source = resource
        .prefix
        .as_deref()
        .map(|p| p.trim().trim_matches('/'))
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| table.trim_matches('/'));
    validate_route_path(table, route_source)?;

    let mut names = HashSet::new();
    for f in &resource.fields {
        if !names.insert(f.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                table: table.to_string(),
                field: f.name.clone(),
            });
        }
    }

    let pk = resource
        .fields
        .iter()
        .find(|f| f.name == resource.primary_key)
        .ok_or_else(|| ConfigError::InvalidPrimaryKey {
            table: table.to_string(),
            column: resource.primary_key.clone(),
        })?;
    if !matches!(pk.type_, FieldType::Integer | FieldType::Uuid | FieldType::String) {
        return Err(ConfigError::InvalidPrimaryKey {
            table: table.to_string(),
            column: resource.primary_key.clone(),
        });
    }
    if pk.generated && pk.type_ == FieldType::String {
        return Err(ConfigError::Validation(format!(
            "resource '{}': a string primary key cannot be generated",
            table
        )));
    }

    for (field, rule) in &resource.validation {
        if !names.contains(field.as_str()) {
            return Err(ConfigError::UnknownField {
                table: table.to_string(),
                field: field.clone(),
                context: "validation",
            });
        }
        if let Some(pattern) = &rule.pattern {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("invalid pattern for {}.{}: {}", table, field, e))
            })?;
        }
    }

    if resource.paginate == Some(0) {
        return Err(ConfigError::Validation(format!(
            "resource '{}': paginate must be greater than zero",
            table
        )));
    }

    Ok(())
}
