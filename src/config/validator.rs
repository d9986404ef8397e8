//! Structural validation of resource declarations, run once at startup.

use crate::config::resolved::{RelationKind, CREATED_AT, UPDATED_AT};
use crate::config::types::ResourceConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Column names every store manages itself; declared fields must not shadow them.
const RESERVED: &[&str] = &["id", CREATED_AT, UPDATED_AT];

/// Checks the whole declaration set for structural problems: duplicate
/// resources or fields, reserved names, bad regexes, and relations that
/// point at resources or keys that do not exist.
pub fn validate(resources: &[ResourceConfig]) -> Result<(), ConfigError> {
    let mut seen_paths = HashSet::new();
    for resource in resources {
        if !seen_paths.insert(resource.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(
                resource.path_segment.clone(),
            ));
        }
    }

    let by_path: HashMap<&str, &ResourceConfig> = resources
        .iter()
        .map(|r| (r.path_segment.as_str(), r))
        .collect();

    for resource in resources {
        validate_fields(resource)?;
        validate_relations(resource, &by_path)?;
    }
    Ok(())
}

fn validate_fields(resource: &ResourceConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for field in &resource.fields {
        if RESERVED.contains(&field.name.as_str()) {
            return Err(ConfigError::ReservedField {
                resource: resource.path_segment.clone(),
                field: field.name.clone(),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                resource: resource.path_segment.clone(),
                field: field.name.clone(),
            });
        }
        if let Some(pattern) = &field.pattern {
            Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "resource {}: field '{}' has invalid pattern: {}",
                    resource.path_segment, field.name, e
                ))
            })?;
        }
    }
    Ok(())
}

fn validate_relations(
    resource: &ResourceConfig,
    by_path: &HashMap<&str, &ResourceConfig>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for relation in &resource.relations {
        if !seen.insert(relation.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "resource {}: duplicate relation '{}'",
                resource.path_segment, relation.name
            )));
        }
        let Some(target) = by_path.get(relation.target.as_str()) else {
            return Err(ConfigError::UnknownRelationTarget {
                resource: resource.path_segment.clone(),
                relation: relation.name.clone(),
                target: relation.target.clone(),
            });
        };
        // The FK lives on this resource for to_one, on the target for to_many.
        let fk_holder = match relation.kind {
            RelationKind::ToOne => resource,
            RelationKind::ToMany => target,
        };
        let declared = fk_holder
            .fields
            .iter()
            .any(|f| f.name == relation.foreign_key);
        if !declared {
            return Err(ConfigError::UnknownRelationKey {
                resource: resource.path_segment.clone(),
                relation: relation.name.clone(),
                field: relation.foreign_key.clone(),
            });
        }
    }
    Ok(())
}
