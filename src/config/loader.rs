//! Load resource config from a JSON file and resolve it into the runtime model.

use crate::config::resolved::{CompiledRule, FieldInfo, PkType, ResolvedModel, ResolvedResource};
use crate::config::types::*;
use crate::config::{validate_resource, validate_route_path, CrudSettings};
use crate::error::ConfigError;
use std::collections::HashSet;
use std::path::Path;

/// Build the resolved model from full config (validates each resource first).
pub fn resolve(config: &FullConfig, settings: &CrudSettings) -> Result<ResolvedModel, ConfigError> {
    let mut resources = Vec::with_capacity(config.resources.len());
    let mut prefixes = HashSet::new();
    for rc in &config.resources {
        let resource = resolve_resource(rc, settings)?;
        if !prefixes.insert(resource.prefix.clone()) {
            return Err(ConfigError::Validation(format!("duplicate prefix: {}", resource.prefix)));
        }
        resources.push(resource);
    }
    Ok(ResolvedModel { resources })
}

pub fn resolve_resource(rc: &ResourceConfig, settings: &CrudSettings) -> Result<ResolvedResource, ConfigError> {
    validate_resource(rc)?;

    let fields: Vec<FieldInfo> = rc
        .fields
        .iter()
        .map(|f| FieldInfo {
            name: f.name.clone(),
            field_type: f.type_,
            nullable: f.nullable && f.name != rc.primary_key,
            unique: f.unique,
            generated: f.generated,
            default: f.default.clone(),
        })
        .collect();

    let pk_info = fields
        .iter()
        .find(|f| f.name == rc.primary_key)
        .ok_or_else(|| ConfigError::InvalidPrimaryKey {
            table: rc.table.clone(),
            column: rc.primary_key.clone(),
        })?;
    let pk_type = match pk_info.field_type {
        FieldType::Integer => PkType::Int,
        FieldType::Uuid => PkType::Uuid,
        _ => PkType::Text,
    };
    let pk_generated = pk_info.generated;

    let create_fields = fields
        .iter()
        .filter(|f| !(f.name == rc.primary_key && pk_generated))
        .map(|f| f.name.clone())
        .collect();
    let update_fields = fields
        .iter()
        .filter(|f| f.name != rc.primary_key)
        .map(|f| f.name.clone())
        .collect();

    let mut validation = std::collections::HashMap::new();
    for (field, rule) in &rc.validation {
        let pattern = match &rule.pattern {
            Some(p) => Some(
                regex::Regex::new(p)
                    .map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", field, e)))?,
            ),
            None => None,
        };
        validation.insert(
            field.clone(),
            CompiledRule {
                rule: rule.clone(),
                pattern,
            },
        );
    }

    let prefix_source = rc
        .prefix
        .as_deref()
        .filter(|p| !p.trim_matches('/').trim().is_empty())
        .unwrap_or(&rc.table);

    let prefix = normalize_prefix(&settings.base_path, prefix_source);
    validate_route_path(&rc.table, &prefix)?;

    Ok(ResolvedResource {
        schema_name: rc.schema.clone(),
        table_name: rc.table.trim().to_string(),
        prefix,
        pk: rc.primary_key.clone(),
        pk_type,
        fields,
        create_fields,
        update_fields,
        max_limit: rc.paginate.or(settings.max_limit),
        routes: rc.routes.clone(),
        validation,
    })
}

/// Join a slash-stripped prefix onto the base path and lower-case the result:
/// (`/Api`, `Potatoes/`) -> `/api/potatoes`.
pub fn normalize_prefix(base_path: &str, prefix: &str) -> String {
    let base = base_path.trim().trim_end_matches('/');
    let segment = prefix.trim().trim_matches('/');
    let base = if base.is_empty() || base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{}", base)
    };
    format!("{}/{}", base, segment).to_lowercase()
}

/// Read a `{ "resources": [...] }` document from disk.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading resource config");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<FullConfig, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn potatoes(prefix: Option<&str>) -> ResourceConfig {
        serde_json::from_value(json!({
            "table": "Potatoes",
            "prefix": prefix,
            "fields": [
                { "name": "id", "type": "integer", "generated": true },
                { "name": "color", "type": "string", "nullable": false },
                { "name": "mass", "type": "float" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn prefix_defaults_to_lowercase_table_name() {
        let r = resolve_resource(&potatoes(None), &CrudSettings::default()).unwrap();
        assert_eq!(r.prefix, "/potatoes");
        assert_eq!(r.prefix, r.prefix.to_lowercase());
    }

    #[test]
    fn prefix_override_is_normalized() {
        let r = resolve_resource(&potatoes(Some("/Spuds/")), &CrudSettings::default()).unwrap();
        assert_eq!(r.prefix, "/spuds");

        let r = resolve_resource(&potatoes(Some("")), &CrudSettings::default()).unwrap();
        assert_eq!(r.prefix, "/potatoes");
    }

    #[test]
    fn prefix_joins_base_path() {
        assert_eq!(normalize_prefix("/api/v1/", "Carrots"), "/api/v1/carrots");
        assert_eq!(normalize_prefix("api", "carrots"), "/api/carrots");
        assert_eq!(normalize_prefix("", "carrots"), "/carrots");
    }

    #[test]
    fn mixed_case_base_path_is_lowercased() {
        let r = resolve_resource(&potatoes(None), &CrudSettings::default().with_base_path("/API")).unwrap();
        assert_eq!(r.prefix, "/api/potatoes");
        assert_eq!(r.prefix, r.prefix.to_lowercase());
    }

    #[test]
    fn rejects_route_syntax_in_base_path() {
        let settings = CrudSettings::default().with_base_path("/:tenant");
        assert!(matches!(
            resolve_resource(&potatoes(None), &settings),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn generated_key_is_excluded_from_payload_allowlists() {
        let r = resolve_resource(&potatoes(None), &CrudSettings::default()).unwrap();
        assert_eq!(r.pk_type, PkType::Int);
        assert!(!r.create_fields.contains("id"));
        assert!(!r.update_fields.contains("id"));
        assert!(r.create_fields.contains("color"));
        assert!(r.update_fields.contains("mass"));
    }

    #[test]
    fn paginate_overrides_router_default() {
        let mut rc = potatoes(None);
        let settings = CrudSettings::default().with_max_limit(100);
        assert_eq!(resolve_resource(&rc, &settings).unwrap().max_limit, Some(100));
        rc.paginate = Some(5);
        assert_eq!(resolve_resource(&rc, &settings).unwrap().max_limit, Some(5));
    }

    #[test]
    fn rejects_two_resources_with_same_prefix() {
        let config = FullConfig {
            resources: vec![potatoes(None), potatoes(Some("potatoes"))],
        };
        assert!(matches!(
            resolve(&config, &CrudSettings::default()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn parses_document() {
        let config = parse_config(r#"{ "resources": [ { "table": "t", "fields": [ { "name": "id", "type": "uuid", "generated": true } ] } ] }"#).unwrap();
        assert_eq!(config.resources.len(), 1);
        assert!(config.resources[0].routes.delete_all);
        assert!(parse_config("{").is_err());
    }
}
