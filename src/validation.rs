//! Request body validation against declared field rules.
//!
//! Every rule is checked and every failure collected, so a single response
//! reports the complete list of problems instead of the first one found.

use crate::config::{FieldConfig, FieldType, ResolvedResource};
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Full validation for create and PUT: required fields must be present
    /// and non-null, and every provided value must pass its field's rules.
    pub fn validate(
        resource: &ResolvedResource,
        body: &HashMap<String, Value>,
    ) -> Result<(), AppError> {
        let mut reasons = Vec::new();
        for field in &resource.fields {
            match body.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        reasons.push(format!("{} is required", field.name));
                    }
                }
                Some(value) => check_field(field, value, &mut reasons),
            }
        }
        finish(reasons)
    }

    /// Partial validation for PATCH: only provided fields are checked, but an
    /// explicit null is rejected on required fields.
    pub fn validate_partial(
        resource: &ResolvedResource,
        body: &HashMap<String, Value>,
    ) -> Result<(), AppError> {
        let mut reasons = Vec::new();
        for field in &resource.fields {
            match body.get(&field.name) {
                None => {}
                Some(Value::Null) => {
                    if field.required {
                        reasons.push(format!("{} is required", field.name));
                    }
                }
                Some(value) => check_field(field, value, &mut reasons),
            }
        }
        finish(reasons)
    }
}

fn finish(reasons: Vec<String>) -> Result<(), AppError> {
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation { reasons })
    }
}

fn check_field(field: &FieldConfig, value: &Value, reasons: &mut Vec<String>) {
    if !type_matches(field.field_type, value) {
        reasons.push(format!(
            "{} must be of type {:?}",
            field.name, field.field_type
        ));
        return;
    }

    if let Some(s) = value.as_str() {
        if let Some(min) = field.min_length {
            if s.chars().count() < min as usize {
                reasons.push(format!(
                    "{} must be at least {} characters",
                    field.name, min
                ));
            }
        }
        if let Some(max) = field.max_length {
            if s.chars().count() > max as usize {
                reasons.push(format!("{} must be at most {} characters", field.name, max));
            }
        }
        if let Some(pattern) = &field.pattern {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(s) {
                        reasons.push(format!("{} does not match the required pattern", field.name));
                    }
                }
                Err(_) => reasons.push(format!("{} has an unusable pattern rule", field.name)),
            }
        }
        if let Some(format) = &field.format {
            check_format(field, format, s, reasons);
        }
    }

    if let Some(allowed) = &field.allowed {
        if !allowed.iter().any(|candidate| value_eq(candidate, value)) {
            reasons.push(format!("{} is not one of the allowed values", field.name));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(minimum) = field.minimum {
            if n < minimum {
                reasons.push(format!("{} must be at least {}", field.name, minimum));
            }
        }
        if let Some(maximum) = field.maximum {
            if n > maximum {
                reasons.push(format!("{} must be at most {}", field.name, maximum));
            }
        }
    }
}

fn type_matches(field_type: FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::Text => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Uuid => value
            .as_str()
            .map(|s| uuid::Uuid::parse_str(s).is_ok())
            .unwrap_or(false),
        FieldType::Timestamp => value
            .as_str()
            .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
        FieldType::Json => true,
    }
}

fn check_format(field: &FieldConfig, format: &str, s: &str, reasons: &mut Vec<String>) {
    let ok = match format {
        "email" => s.contains('@') && s.len() >= 3,
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    };
    if !ok {
        reasons.push(format!("{} is not a valid {}", field.name, format));
    }
}

/// JSON equality with numeric coercion, so `allowed: [1]` matches `1.0`.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolved::IdType;
    use crate::config::{Operation, ResolvedResource};
    use serde_json::json;
    use std::collections::HashSet;

    fn resource(fields: Vec<FieldConfig>) -> ResolvedResource {
        ResolvedResource {
            path_segment: "items".to_string(),
            table_name: "items".to_string(),
            id_column: "id".to_string(),
            id_type: IdType::Int,
            fields,
            operations: vec![Operation::Create],
            sensitive_fields: HashSet::new(),
            relations: vec![],
        }
    }

    fn body(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn collects_every_failure() {
        let r = resource(vec![
            FieldConfig {
                name: "name".to_string(),
                required: true,
                ..Default::default()
            },
            FieldConfig {
                name: "age".to_string(),
                field_type: FieldType::Integer,
                minimum: Some(0.0),
                ..Default::default()
            },
        ]);
        let err = RequestValidator::validate(&r, &body(&[("age", json!(-4))])).unwrap_err();
        match err {
            AppError::Validation { reasons } => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons.iter().any(|r| r.contains("name is required")));
                assert!(reasons.iter().any(|r| r.contains("age must be at least")));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn type_mismatch_short_circuits_other_rules() {
        let r = resource(vec![FieldConfig {
            name: "name".to_string(),
            min_length: Some(3),
            ..Default::default()
        }]);
        let err = RequestValidator::validate(&r, &body(&[("name", json!(42))])).unwrap_err();
        match err {
            AppError::Validation { reasons } => assert_eq!(reasons.len(), 1),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn partial_skips_absent_but_rejects_null_required() {
        let r = resource(vec![
            FieldConfig {
                name: "name".to_string(),
                required: true,
                ..Default::default()
            },
            FieldConfig {
                name: "notes".to_string(),
                ..Default::default()
            },
        ]);
        assert!(RequestValidator::validate_partial(&r, &body(&[])).is_ok());
        assert!(RequestValidator::validate_partial(&r, &body(&[("notes", Value::Null)])).is_ok());
        assert!(RequestValidator::validate_partial(&r, &body(&[("name", Value::Null)])).is_err());
    }

    #[test]
    fn enforces_length_pattern_and_allowed() {
        let r = resource(vec![
            FieldConfig {
                name: "code".to_string(),
                min_length: Some(2),
                max_length: Some(4),
                pattern: Some("^[A-Z]+$".to_string()),
                ..Default::default()
            },
            FieldConfig {
                name: "status".to_string(),
                allowed: Some(vec![json!("open"), json!("closed")]),
                ..Default::default()
            },
        ]);
        assert!(
            RequestValidator::validate(&r, &body(&[("code", json!("AB")), ("status", json!("open"))]))
                .is_ok()
        );
        let err = RequestValidator::validate(
            &r,
            &body(&[("code", json!("toolongand lowercase")), ("status", json!("other"))]),
        )
        .unwrap_err();
        match err {
            AppError::Validation { reasons } => assert_eq!(reasons.len(), 3),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn validates_uuid_timestamp_and_email() {
        let r = resource(vec![
            FieldConfig {
                name: "ref".to_string(),
                field_type: FieldType::Uuid,
                ..Default::default()
            },
            FieldConfig {
                name: "due".to_string(),
                field_type: FieldType::Timestamp,
                ..Default::default()
            },
            FieldConfig {
                name: "email".to_string(),
                format: Some("email".to_string()),
                ..Default::default()
            },
        ]);
        assert!(RequestValidator::validate(
            &r,
            &body(&[
                ("ref", json!("8c5be012-52b7-4d00-8315-1c0a4f8c9a2e")),
                ("due", json!("2024-05-01T10:00:00Z")),
                ("email", json!("dev@example.com")),
            ]),
        )
        .is_ok());
        let err = RequestValidator::validate(
            &r,
            &body(&[
                ("ref", json!("not-a-uuid")),
                ("due", json!("yesterday")),
                ("email", json!("nope")),
            ]),
        )
        .unwrap_err();
        match err {
            AppError::Validation { reasons } => assert_eq!(reasons.len(), 3),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
