//! Request validation against the resolved resource schema and its configured rules.

use crate::config::{CompiledRule, FieldInfo, FieldType, ResolvedResource};
use crate::error::AppError;
use serde_json::{Map, Value};

/// A validated create/update payload: only allowlisted fields, values type-checked.
pub type Payload = Map<String, Value>;

pub struct RequestValidator;

impl RequestValidator {
    /// Shape a create body. Unknown keys are dropped; required fields must be present.
    pub fn create_payload(resource: &ResolvedResource, body: Value) -> Result<Payload, AppError> {
        let body = body_to_map(body)?;
        let mut out = Payload::new();
        for field in &resource.fields {
            if !resource.create_fields.contains(&field.name) {
                continue;
            }
            let value = body.get(&field.name);
            let rule = resource.validation.get(&field.name);
            let required = rule.and_then(|r| r.rule.required).unwrap_or(false)
                || (!field.nullable && !field.has_default());
            match value {
                None | Some(Value::Null) if required => {
                    return Err(AppError::Validation(format!("{} is required", field.name)));
                }
                None => {}
                Some(v) => {
                    let v = check_type(field, v)?;
                    if let Some(rule) = rule {
                        validate_field(&field.name, &v, rule)?;
                    }
                    out.insert(field.name.clone(), v);
                }
            }
        }
        Ok(out)
    }

    /// Shape an update body. Partial: only present fields are checked; the key is dropped.
    pub fn update_payload(resource: &ResolvedResource, body: Value) -> Result<Payload, AppError> {
        let body = body_to_map(body)?;
        let mut out = Payload::new();
        for (key, v) in body {
            if !resource.update_fields.contains(&key) {
                continue;
            }
            let Some(field) = resource.field(&key) else { continue };
            if v.is_null() && !field.nullable {
                return Err(AppError::Validation(format!("{} must not be null", key)));
            }
            let v = check_type(field, &v)?;
            if let Some(rule) = resource.validation.get(&key) {
                validate_field(&key, &v, rule)?;
            }
            out.insert(key, v);
        }
        Ok(out)
    }
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Check a payload value against the field type. Uuids come back in canonical lowercase form.
pub fn check_type(field: &FieldInfo, v: &Value) -> Result<Value, AppError> {
    coerce(field.field_type, v, false).ok_or_else(|| {
        AppError::Validation(format!(
            "{} must be of type {}",
            field.name,
            type_label(field.field_type)
        ))
    })
}

/// Convert `v` to the canonical JSON value for `ty`. `lenient` also accepts numbers and
/// booleans spelled as strings (path ids, filter values). Returns None when it does not fit.
pub fn coerce(ty: FieldType, v: &Value, lenient: bool) -> Option<Value> {
    if v.is_null() {
        return Some(Value::Null);
    }
    match ty {
        FieldType::String => v.as_str().map(|s| Value::String(s.to_string())),
        FieldType::Integer => match v {
            Value::Number(n) => n
                .as_i64()
                .map(Value::from)
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| Value::from(f as i64))),
            Value::String(s) if lenient => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        FieldType::Float => match v {
            Value::Number(_) => Some(v.clone()),
            Value::String(s) if lenient => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        FieldType::Boolean => match v {
            Value::Bool(_) => Some(v.clone()),
            Value::String(s) if lenient => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        FieldType::Uuid => v
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(|u| Value::String(u.to_string())),
        FieldType::Timestamp => v
            .as_str()
            .filter(|s| {
                chrono::DateTime::parse_from_rfc3339(s).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            })
            .map(|s| Value::String(s.to_string())),
        FieldType::Date => v
            .as_str()
            .filter(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
            .map(|s| Value::String(s.to_string())),
        FieldType::Json => Some(v.clone()),
    }
}

fn type_label(ty: FieldType) -> &'static str {
    match ty {
        FieldType::String => "string",
        FieldType::Integer => "integer",
        FieldType::Float => "float",
        FieldType::Boolean => "boolean",
        FieldType::Uuid => "uuid",
        FieldType::Timestamp => "timestamp",
        FieldType::Date => "date",
        FieldType::Json => "json",
    }
}

fn validate_field(col: &str, v: &Value, compiled: &CompiledRule) -> Result<(), AppError> {
    let rule = &compiled.rule;
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(re) = &compiled.pattern {
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

/// Equality used for `allowed` rules and in-memory filtering: numbers compare by value.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}
