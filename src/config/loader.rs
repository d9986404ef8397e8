//! Load resource declarations from JSON and resolve them into the runtime model.

use crate::config::resolved::{RelationKind, RelationSpec, ResolvedModel, ResolvedResource};
use crate::config::types::ResourceConfig;
use crate::config::validator::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Reads a JSON array of resource declarations from disk.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<ResourceConfig>, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| ConfigError::Load(format!("parse {}: {}", path.display(), e)))
}

/// Validates declarations and flattens them into the resolved model the
/// router and stores work against.
pub fn resolve(resources: &[ResourceConfig]) -> Result<ResolvedModel, ConfigError> {
    validate(resources)?;

    let mut resolved = Vec::with_capacity(resources.len());
    for resource in resources {
        let relations = resource
            .relations
            .iter()
            .map(|rel| {
                let (our_key, their_key) = match rel.kind {
                    RelationKind::ToOne => (rel.foreign_key.clone(), "id".to_string()),
                    RelationKind::ToMany => ("id".to_string(), rel.foreign_key.clone()),
                };
                RelationSpec {
                    name: rel.name.clone(),
                    kind: rel.kind,
                    target_path: rel.target.clone(),
                    our_key,
                    their_key,
                }
            })
            .collect();

        resolved.push(ResolvedResource {
            path_segment: resource.path_segment.clone(),
            table_name: resource
                .table
                .clone()
                .unwrap_or_else(|| resource.path_segment.clone()),
            id_column: "id".to_string(),
            id_type: resource.id_type,
            fields: resource.fields.clone(),
            operations: resource.operations.clone(),
            sensitive_fields: resource.sensitive_fields.iter().cloned().collect(),
            relations,
        });
    }

    let resource_by_path: HashMap<String, ResolvedResource> = resolved
        .iter()
        .map(|r| (r.path_segment.clone(), r.clone()))
        .collect();

    Ok(ResolvedModel {
        resources: resolved,
        resource_by_path,
    })
}
