//! Startup schema management: database creation and per-resource tables.

use crate::config::resolved::{IdType, CREATED_AT, UPDATED_AT};
use crate::config::{FieldType, ResolvedModel, ResolvedResource};
use crate::store::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

fn column_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "TEXT",
        FieldType::Integer => "BIGINT",
        FieldType::Number => "DOUBLE PRECISION",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Uuid => "UUID",
        FieldType::Timestamp => "TIMESTAMPTZ",
        FieldType::Json => "JSONB",
    }
}

fn id_column_def(id_type: IdType) -> &'static str {
    match id_type {
        IdType::Int => "BIGSERIAL PRIMARY KEY",
        IdType::Uuid => "UUID PRIMARY KEY DEFAULT gen_random_uuid()",
        IdType::Text => "TEXT PRIMARY KEY",
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// DDL for one resource. Idempotent; existing tables are left alone.
pub fn create_table_sql(resource: &ResolvedResource) -> String {
    let mut columns = Vec::with_capacity(resource.fields.len() + 3);
    columns.push(format!(
        "{} {}",
        quote_ident(&resource.id_column),
        id_column_def(resource.id_type)
    ));
    for field in &resource.fields {
        let mut def = format!(
            "{} {}",
            quote_ident(&field.name),
            column_type(field.field_type)
        );
        if field.required {
            def.push_str(" NOT NULL");
        }
        if field.unique {
            def.push_str(" UNIQUE");
        }
        columns.push(def);
    }
    columns.push(format!(
        "{} TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        quote_ident(CREATED_AT)
    ));
    columns.push(format!(
        "{} TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        quote_ident(UPDATED_AT)
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&resource.table_name),
        columns.join(", ")
    )
}

/// Creates every resource table that does not exist yet.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), StoreError> {
    for resource in &model.resources {
        let sql = create_table_sql(resource);
        tracing::info!(table = %resource.table_name, "ensuring table");
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migrate {}: {}", resource.table_name, e)))?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Option<(String, String)> {
    let without_query = url.split('?').next().unwrap_or(url);
    let idx = without_query.rfind('/')?;
    let db_name = &without_query[idx + 1..];
    if db_name.is_empty() {
        return None;
    }
    let server_url = format!("{}/postgres", &without_query[..idx]);
    Some((server_url, db_name.to_string()))
}

/// Connects to the server's `postgres` database and creates the target
/// database when missing. CREATE DATABASE cannot be parameterized, so the
/// name is identifier-quoted instead.
pub async fn ensure_database_exists(url: &str) -> Result<(), StoreError> {
    let Some((server_url, db_name)) = parse_db_name_from_url(url) else {
        return Err(StoreError::Backend(format!(
            "cannot determine database name from url: {url}"
        )));
    };

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&server_url)
        .await
        .map_err(|e| StoreError::Backend(format!("connect to admin database: {e}")))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&admin)
            .await
            .map_err(|e| StoreError::Backend(format!("check database: {e}")))?;

    if !exists {
        tracing::info!(database = %db_name, "creating database");
        let sql = format!("CREATE DATABASE {}", quote_ident(&db_name));
        sqlx::query(&sql)
            .execute(&admin)
            .await
            .map_err(|e| StoreError::Backend(format!("create database: {e}")))?;
    }

    admin.close().await;
    Ok(())
}
