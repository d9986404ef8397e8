//! Generic CRUD handlers. The path's first segment selects the resource;
//! everything else is driven by its resolved declaration.

use crate::config::resolved::IdType;
use crate::config::{Operation, RelationKind, ResolvedResource};
use crate::error::AppError;
use crate::response::{created_one, ok_many, ok_one};
use crate::state::AppState;
use crate::store::Page;
use crate::validation::RequestValidator;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::collections::HashMap;

/// Parses a path id strictly against the resource's declared id type.
pub(crate) fn parse_id(raw: &str, id_type: IdType) -> Result<Value, AppError> {
    match id_type {
        IdType::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::BadRequest(format!("invalid id: {raw}"))),
        IdType::Uuid => uuid::Uuid::parse_str(raw)
            .map(|u| Value::from(u.to_string()))
            .map_err(|_| AppError::BadRequest(format!("invalid id: {raw}"))),
        IdType::Text => Ok(Value::from(raw)),
    }
}

pub(crate) fn body_to_map(body: Value) -> Result<HashMap<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".to_string())),
    }
}

/// Removes declared sensitive fields before an entity leaves the API.
pub(crate) fn strip_sensitive(resource: &ResolvedResource, entity: &mut Value) {
    if let Value::Object(map) = entity {
        for field in &resource.sensitive_fields {
            map.remove(field);
        }
    }
}

fn resolve_resource<'a>(
    state: &'a AppState,
    path: &str,
    op: Operation,
) -> Result<&'a ResolvedResource, AppError> {
    let resource = state
        .model
        .resource_by_path(path)
        .ok_or_else(|| AppError::NotFound(format!("unknown resource: {path}")))?;
    if !resource.allows(op) {
        return Err(AppError::BadRequest(format!(
            "{} not allowed on {}",
            op.name(),
            path
        )));
    }
    Ok(resource)
}

/// Coerces a query-string value into the column's JSON type so filters
/// compare like-for-like.
fn query_value_for_field(resource: &ResolvedResource, column: &str, raw: &str) -> Value {
    use crate::config::FieldType;
    let coerced = if column == resource.id_column {
        match resource.id_type {
            IdType::Int => raw.parse::<i64>().ok().map(Value::from),
            IdType::Uuid | IdType::Text => None,
        }
    } else {
        match resource.field_type(column) {
            Some(FieldType::Integer) => raw.parse::<i64>().ok().map(Value::from),
            Some(FieldType::Number) => raw.parse::<f64>().ok().map(Value::from),
            Some(FieldType::Boolean) => raw.parse::<bool>().ok().map(Value::from),
            _ => None,
        }
    };
    coerced.unwrap_or_else(|| Value::from(raw))
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::List)?;
    let limit = query.get("limit").and_then(|v| v.parse().ok());
    let offset = query.get("offset").and_then(|v| v.parse().ok());
    // Only declared columns filter; unknown query keys are ignored so both
    // stores see the same filter set.
    let filters: Vec<(String, Value)> = query
        .iter()
        .filter(|(key, _)| key.as_str() != "limit" && key.as_str() != "offset")
        .filter(|(key, _)| {
            key.as_str() == resource.id_column || resource.field(key).is_some()
        })
        .map(|(key, raw)| (key.clone(), query_value_for_field(resource, key, raw)))
        .collect();
    let mut rows = state
        .store
        .list(resource, &filters, Page::new(limit, offset))
        .await?;
    for row in &mut rows {
        strip_sensitive(resource, row);
    }
    Ok(ok_many(rows).into_response())
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::Read)?;
    let id = parse_id(&id, resource.id_type)?;
    let mut entity = state
        .store
        .get(resource, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", path_segment, id)))?;
    strip_sensitive(resource, &mut entity);
    Ok(ok_one(entity).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::Create)?;
    let body = body_to_map(body)?;
    RequestValidator::validate(resource, &body)?;
    let mut entity = state.store.insert(resource, &body).await?;
    strip_sensitive(resource, &mut entity);
    Ok(created_one(entity).into_response())
}

/// PUT: full replacement semantics, so the whole body is validated like a
/// create before the merge is applied.
pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::Update)?;
    let id = parse_id(&id, resource.id_type)?;
    let body = body_to_map(body)?;
    RequestValidator::validate(resource, &body)?;
    let mut entity = state
        .store
        .update(resource, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", path_segment, id)))?;
    strip_sensitive(resource, &mut entity);
    Ok(ok_one(entity).into_response())
}

/// PATCH: only provided fields are validated and written.
pub async fn merge(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::Update)?;
    let id = parse_id(&id, resource.id_type)?;
    let body = body_to_map(body)?;
    RequestValidator::validate_partial(resource, &body)?;
    let mut entity = state
        .store
        .update(resource, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", path_segment, id)))?;
    strip_sensitive(resource, &mut entity);
    Ok(ok_one(entity).into_response())
}

/// DELETE responds with the removed entity so clients can confirm what went.
pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::Delete)?;
    let id = parse_id(&id, resource.id_type)?;
    let mut entity = state
        .store
        .delete(resource, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", path_segment, id)))?;
    strip_sensitive(resource, &mut entity);
    Ok(ok_one(entity).into_response())
}

/// GET /api/<resource>/:id/<relation>. The parent must exist before the
/// relation is considered, so a bad parent id is 404 even for a bad
/// relation name.
pub async fn relation_index(
    State(state): State<AppState>,
    Path((path_segment, id, relation)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let resource = resolve_resource(&state, &path_segment, Operation::Read)?;
    let id = parse_id(&id, resource.id_type)?;
    let parent = state
        .store
        .get(resource, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", path_segment, id)))?;

    let spec = resource
        .relation(&relation)
        .ok_or_else(|| AppError::NotFound(format!("unknown relation: {relation}")))?;
    let target = state
        .model
        .resource_by_path(&spec.target_path)
        .ok_or_else(|| AppError::Internal(format!("unresolved relation target: {}", spec.target_path)))?;

    let our_value = parent.get(&spec.our_key).cloned().unwrap_or(Value::Null);
    match spec.kind {
        RelationKind::ToMany => {
            let filters = vec![(spec.their_key.clone(), our_value)];
            let mut rows = state
                .store
                .list(target, &filters, Page::default())
                .await?;
            for row in &mut rows {
                strip_sensitive(target, row);
            }
            Ok(ok_many(rows).into_response())
        }
        RelationKind::ToOne => {
            if our_value.is_null() {
                return Ok(ok_one(Value::Null).into_response());
            }
            let mut entity = state
                .store
                .get(target, &our_value)
                .await?
                .unwrap_or(Value::Null);
            strip_sensitive(target, &mut entity);
            Ok(ok_one(entity).into_response())
        }
    }
}
