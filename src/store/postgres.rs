//! Postgres store over a sqlx pool. Queries come from the SQL builder and
//! rows decode back into JSON objects using the resource's declared types.

use crate::config::resolved::{IdType, CREATED_AT, UPDATED_AT};
use crate::config::{FieldType, ResolvedResource};
use crate::sql::{builder, BindValue, QueryBuf};
use crate::store::{Page, Store, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for param in &q.params {
            query = query.bind(BindValue::from_json(param));
        }
        query.fetch_all(&self.pool).await.map_err(map_sqlx)
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for param in &q.params {
            query = query.bind(BindValue::from_json(param));
        }
        query.fetch_optional(&self.pool).await.map_err(map_sqlx)
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // 23505 is Postgres unique_violation.
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn row_to_entity(resource: &ResolvedResource, row: &PgRow) -> Result<Value, StoreError> {
    let mut entity = Map::new();

    let id = match resource.id_type {
        IdType::Int => {
            let v: i64 = row.try_get(resource.id_column.as_str()).map_err(decode)?;
            Value::from(v)
        }
        IdType::Uuid => {
            let v: uuid::Uuid = row.try_get(resource.id_column.as_str()).map_err(decode)?;
            Value::from(v.to_string())
        }
        IdType::Text => {
            let v: String = row.try_get(resource.id_column.as_str()).map_err(decode)?;
            Value::from(v)
        }
    };
    entity.insert(resource.id_column.clone(), id);

    for field in &resource.fields {
        let name = field.name.as_str();
        let value = match field.field_type {
            FieldType::Text => row
                .try_get::<Option<String>, _>(name)
                .map_err(decode)?
                .map(Value::from),
            FieldType::Integer => row
                .try_get::<Option<i64>, _>(name)
                .map_err(decode)?
                .map(Value::from),
            FieldType::Number => row
                .try_get::<Option<f64>, _>(name)
                .map_err(decode)?
                .map(Value::from),
            FieldType::Boolean => row
                .try_get::<Option<bool>, _>(name)
                .map_err(decode)?
                .map(Value::from),
            FieldType::Uuid => row
                .try_get::<Option<uuid::Uuid>, _>(name)
                .map_err(decode)?
                .map(|u| Value::from(u.to_string())),
            FieldType::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .map_err(decode)?
                .map(|t| Value::from(t.to_rfc3339())),
            FieldType::Json => row
                .try_get::<Option<Value>, _>(name)
                .map_err(decode)?,
        };
        entity.insert(field.name.clone(), value.unwrap_or(Value::Null));
    }

    for column in [CREATED_AT, UPDATED_AT] {
        let stamp: Option<DateTime<Utc>> = row.try_get(column).map_err(decode)?;
        entity.insert(
            column.to_string(),
            stamp.map(|t| Value::from(t.to_rfc3339())).unwrap_or(Value::Null),
        );
    }

    Ok(Value::Object(entity))
}

fn decode(e: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("row decode: {e}"))
}

#[async_trait]
impl Store for PgStore {
    async fn list(
        &self,
        resource: &ResolvedResource,
        filters: &[(String, Value)],
        page: Page,
    ) -> Result<Vec<Value>, StoreError> {
        let q = builder::select_list(resource, filters, page);
        let rows = self.fetch_all(&q).await?;
        rows.iter().map(|row| row_to_entity(resource, row)).collect()
    }

    async fn get(
        &self,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let q = builder::select_by_id(resource, id);
        let row = self.fetch_optional(&q).await?;
        row.map(|row| row_to_entity(resource, &row)).transpose()
    }

    async fn insert(
        &self,
        resource: &ResolvedResource,
        body: &HashMap<String, Value>,
    ) -> Result<Value, StoreError> {
        let q = builder::insert(resource, body);
        let row = self
            .fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Backend("insert returned no row".to_string()))?;
        row_to_entity(resource, &row)
    }

    async fn update(
        &self,
        resource: &ResolvedResource,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let q = builder::update(resource, id, body);
        let row = self.fetch_optional(&q).await?;
        row.map(|row| row_to_entity(resource, &row)).transpose()
    }

    async fn delete(
        &self,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let q = builder::delete(resource, id);
        let row = self.fetch_optional(&q).await?;
        row.map(|row| row_to_entity(resource, &row)).transpose()
    }

    async fn count(&self, resource: &ResolvedResource) -> Result<u64, StoreError> {
        let q = builder::count_rows(resource);
        tracing::debug!(sql = %q.sql, "query");
        let count: i64 = sqlx::query_scalar(&q.sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(count as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
