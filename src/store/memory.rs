//! In-memory store backed by per-resource BTreeMaps. Used when no database
//! is configured and by the HTTP test suite.

use crate::config::resolved::{IdType, CREATED_AT, UPDATED_AT};
use crate::config::ResolvedResource;
use crate::store::{Page, Store, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Row key that keeps integer ids in numeric order and string ids in
/// lexicographic order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IdKey {
    Int(i64),
    Text(String),
}

impl IdKey {
    fn from_value(id: &Value) -> Option<IdKey> {
        match id {
            Value::Number(n) => n.as_i64().map(IdKey::Int),
            Value::String(s) => Some(IdKey::Text(s.clone())),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            IdKey::Int(n) => Value::from(*n),
            IdKey::Text(s) => Value::from(s.clone()),
        }
    }
}

#[derive(Default)]
struct Collection {
    rows: BTreeMap<IdKey, Map<String, Value>>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

fn now() -> Value {
    Value::from(Utc::now().to_rfc3339())
}

/// Equality with numeric coercion so a filter of `"3"` matches the stored 3.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn unique_violation(
    resource: &ResolvedResource,
    rows: &BTreeMap<IdKey, Map<String, Value>>,
    body: &HashMap<String, Value>,
    exclude: Option<&IdKey>,
) -> Option<String> {
    for field in resource.fields.iter().filter(|f| f.unique) {
        let Some(candidate) = body.get(&field.name) else {
            continue;
        };
        if candidate.is_null() {
            continue;
        }
        let taken = rows.iter().any(|(key, row)| {
            Some(key) != exclude
                && row
                    .get(&field.name)
                    .map(|existing| value_eq(existing, candidate))
                    .unwrap_or(false)
        });
        if taken {
            return Some(format!(
                "duplicate value for unique field '{}'",
                field.name
            ));
        }
    }
    None
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(
        &self,
        resource: &ResolvedResource,
        filters: &[(String, Value)],
        page: Page,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let Some(collection) = collections.get(&resource.table_name) else {
            return Ok(Vec::new());
        };
        let rows = collection
            .rows
            .values()
            .filter(|row| {
                filters.iter().all(|(column, wanted)| {
                    row.get(column)
                        .map(|found| value_eq(found, wanted))
                        .unwrap_or(false)
                })
            })
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|row| Value::Object(row.clone()))
            .collect();
        Ok(rows)
    }

    async fn get(
        &self,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let Some(key) = IdKey::from_value(id) else {
            return Ok(None);
        };
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(&resource.table_name)
            .and_then(|c| c.rows.get(&key))
            .map(|row| Value::Object(row.clone())))
    }

    async fn insert(
        &self,
        resource: &ResolvedResource,
        body: &HashMap<String, Value>,
    ) -> Result<Value, StoreError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let collection = collections
            .entry(resource.table_name.clone())
            .or_default();

        if let Some(cause) = unique_violation(resource, &collection.rows, body, None) {
            return Err(StoreError::Conflict(cause));
        }

        let key = match body.get(&resource.id_column).filter(|v| !v.is_null()) {
            Some(provided) => {
                let key = IdKey::from_value(provided).ok_or_else(|| {
                    StoreError::Backend(format!("unusable id value: {provided}"))
                })?;
                if collection.rows.contains_key(&key) {
                    return Err(StoreError::Conflict(format!("id already exists: {provided}")));
                }
                if let IdKey::Int(n) = key {
                    collection.next_id = collection.next_id.max(n);
                }
                key
            }
            None => match resource.id_type {
                IdType::Int => {
                    collection.next_id += 1;
                    IdKey::Int(collection.next_id)
                }
                IdType::Uuid | IdType::Text => {
                    IdKey::Text(uuid::Uuid::new_v4().to_string())
                }
            },
        };

        let mut row = Map::new();
        row.insert(resource.id_column.clone(), key.to_value());
        for field in &resource.fields {
            let value = body.get(&field.name).cloned().unwrap_or(Value::Null);
            row.insert(field.name.clone(), value);
        }
        let stamp = now();
        row.insert(CREATED_AT.to_string(), stamp.clone());
        row.insert(UPDATED_AT.to_string(), stamp);

        let entity = Value::Object(row.clone());
        collection.rows.insert(key, row);
        Ok(entity)
    }

    async fn update(
        &self,
        resource: &ResolvedResource,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let Some(key) = IdKey::from_value(id) else {
            return Ok(None);
        };
        let mut collections = self.collections.write().map_err(poisoned)?;
        let Some(collection) = collections.get_mut(&resource.table_name) else {
            return Ok(None);
        };
        if !collection.rows.contains_key(&key) {
            return Ok(None);
        }
        if let Some(cause) = unique_violation(resource, &collection.rows, body, Some(&key)) {
            return Err(StoreError::Conflict(cause));
        }
        let Some(row) = collection.rows.get_mut(&key) else {
            return Ok(None);
        };
        for field in &resource.fields {
            if let Some(value) = body.get(&field.name) {
                row.insert(field.name.clone(), value.clone());
            }
        }
        row.insert(UPDATED_AT.to_string(), now());
        Ok(Some(Value::Object(row.clone())))
    }

    async fn delete(
        &self,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let Some(key) = IdKey::from_value(id) else {
            return Ok(None);
        };
        let mut collections = self.collections.write().map_err(poisoned)?;
        Ok(collections
            .get_mut(&resource.table_name)
            .and_then(|c| c.rows.remove(&key))
            .map(Value::Object))
    }

    async fn count(&self, resource: &ResolvedResource) -> Result<u64, StoreError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(&resource.table_name)
            .map(|c| c.rows.len() as u64)
            .unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, Operation};
    use serde_json::json;
    use std::collections::HashSet;

    fn resource() -> ResolvedResource {
        ResolvedResource {
            path_segment: "tasks".to_string(),
            table_name: "tasks".to_string(),
            id_column: "id".to_string(),
            id_type: IdType::Int,
            fields: vec![
                FieldConfig {
                    name: "description".to_string(),
                    required: true,
                    ..Default::default()
                },
                FieldConfig {
                    name: "slug".to_string(),
                    unique: true,
                    ..Default::default()
                },
            ],
            operations: vec![Operation::List, Operation::Create],
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

    #[tokio::test]
    async fn insert_generates_sequential_ids_and_timestamps() {
        let store = MemoryStore::new();
        let r = resource();
        let first = store
            .insert(&r, &body(&[("description", json!("one"))]))
            .await
            .unwrap();
        let second = store
            .insert(&r, &body(&[("description", json!("two"))]))
            .await
            .unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert!(first["created_at"].is_string());
        assert_eq!(first["created_at"], first["updated_at"]);
        assert_eq!(first["slug"], Value::Null);
    }

    #[tokio::test]
    async fn insert_honors_provided_id_and_rejects_collisions() {
        let store = MemoryStore::new();
        let r = resource();
        let row = store
            .insert(&r, &body(&[("id", json!(7)), ("description", json!("x"))]))
            .await
            .unwrap();
        assert_eq!(row["id"], json!(7));
        let next = store
            .insert(&r, &body(&[("description", json!("y"))]))
            .await
            .unwrap();
        assert_eq!(next["id"], json!(8));
        let err = store
            .insert(&r, &body(&[("id", json!(7)), ("description", json!("z"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn unique_field_conflicts_on_insert_but_not_self_update() {
        let store = MemoryStore::new();
        let r = resource();
        let row = store
            .insert(
                &r,
                &body(&[("description", json!("a")), ("slug", json!("alpha"))]),
            )
            .await
            .unwrap();
        let err = store
            .insert(
                &r,
                &body(&[("description", json!("b")), ("slug", json!("alpha"))]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // Re-writing its own slug is not a conflict.
        let updated = store
            .update(&r, &row["id"], &body(&[("slug", json!("alpha"))]))
            .await
            .unwrap();
        assert!(updated.is_some());
    }

    #[tokio::test]
    async fn update_merges_and_refreshes_updated_at() {
        let store = MemoryStore::new();
        let r = resource();
        let row = store
            .insert(&r, &body(&[("description", json!("before"))]))
            .await
            .unwrap();
        let updated = store
            .update(&r, &row["id"], &body(&[("description", json!("after"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["description"], json!("after"));
        assert_eq!(updated["created_at"], row["created_at"]);
        let missing = store
            .update(&r, &json!(999), &body(&[("description", json!("x"))]))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_returns_removed_row() {
        let store = MemoryStore::new();
        let r = resource();
        let row = store
            .insert(&r, &body(&[("description", json!("gone"))]))
            .await
            .unwrap();
        let removed = store.delete(&r, &row["id"]).await.unwrap().unwrap();
        assert_eq!(removed["id"], row["id"]);
        assert!(store.delete(&r, &row["id"]).await.unwrap().is_none());
        assert_eq!(store.count(&r).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let store = MemoryStore::new();
        let r = resource();
        for i in 0..5 {
            let description = if i % 2 == 0 { "even" } else { "odd" };
            store
                .insert(&r, &body(&[("description", json!(description))]))
                .await
                .unwrap();
        }
        let evens = store
            .list(
                &r,
                &[("description".to_string(), json!("even"))],
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(evens.len(), 3);
        let window = store
            .list(&r, &[], Page::new(Some(2), Some(1)))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0]["id"], json!(2));
        assert_eq!(window[1]["id"], json!(3));
    }

    #[tokio::test]
    async fn uuid_resources_get_generated_string_ids() {
        let store = MemoryStore::new();
        let mut r = resource();
        r.id_type = IdType::Uuid;
        let row = store
            .insert(&r, &body(&[("description", json!("x"))]))
            .await
            .unwrap();
        let id = row["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}
