//! Parameterized SQL construction from resolved resources.
//!
//! Identifiers come from validated config, never from request input, but
//! they are still quoted. Values always travel as placeholders; every
//! placeholder carries an explicit cast so text-encoded binds land in the
//! column's real type.

use crate::config::resolved::{IdType, UPDATED_AT};
use crate::config::{FieldType, ResolvedResource};
use crate::store::Page;
use serde_json::Value;
use std::collections::HashMap;

/// A SQL string plus its bind values, in placeholder order.
#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn push_param(&mut self, value: Value, cast: Option<&str>) {
        self.params.push(value);
        self.sql.push_str(&placeholder(self.params.len(), cast));
    }
}

fn quoted(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn placeholder(n: usize, cast: Option<&str>) -> String {
    match cast {
        Some(cast) => format!("${}::{}", n, cast),
        None => format!("${}", n),
    }
}

fn field_cast(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Text => None,
        FieldType::Integer => Some("bigint"),
        FieldType::Number => Some("double precision"),
        FieldType::Boolean => Some("boolean"),
        FieldType::Uuid => Some("uuid"),
        FieldType::Timestamp => Some("timestamptz"),
        FieldType::Json => Some("jsonb"),
    }
}

fn id_cast(id_type: IdType) -> Option<&'static str> {
    match id_type {
        IdType::Int => Some("bigint"),
        IdType::Uuid => Some("uuid"),
        IdType::Text => None,
    }
}

fn cast_for_column(resource: &ResolvedResource, column: &str) -> Option<&'static str> {
    if column == resource.id_column {
        id_cast(resource.id_type)
    } else {
        resource.field_type(column).and_then(field_cast)
    }
}

fn column_list(resource: &ResolvedResource) -> String {
    resource
        .column_names()
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT with equality filters and a pagination window. Filter columns not
/// present on the resource are ignored.
pub fn select_list(
    resource: &ResolvedResource,
    filters: &[(String, Value)],
    page: Page,
) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!(
        "SELECT {} FROM {}",
        column_list(resource),
        quoted(&resource.table_name)
    );
    let known: Vec<&(String, Value)> = filters
        .iter()
        .filter(|(column, _)| {
            column == &resource.id_column || resource.field(column).is_some()
        })
        .collect();
    for (i, (column, value)) in known.iter().enumerate() {
        q.sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        q.sql.push_str(&quoted(column));
        q.sql.push_str(" = ");
        q.push_param(value.clone(), cast_for_column(resource, column));
    }
    q.sql.push_str(&format!(
        " ORDER BY {} LIMIT {} OFFSET {}",
        quoted(&resource.id_column),
        page.limit,
        page.offset
    ));
    q
}

pub fn select_by_id(resource: &ResolvedResource, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ",
        column_list(resource),
        quoted(&resource.table_name),
        quoted(&resource.id_column)
    );
    q.push_param(id.clone(), id_cast(resource.id_type));
    q
}

/// INSERT of the provided fields. The id is only written when the body
/// carries one; otherwise the column default generates it.
pub fn insert(resource: &ResolvedResource, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut columns = Vec::new();
    let mut values = Vec::new();

    if let Some(id) = body.get(&resource.id_column).filter(|v| !v.is_null()) {
        columns.push(quoted(&resource.id_column));
        values.push((id.clone(), id_cast(resource.id_type)));
    }
    for field in &resource.fields {
        if let Some(value) = body.get(&field.name) {
            columns.push(quoted(&field.name));
            values.push((value.clone(), field_cast(field.field_type)));
        }
    }

    if columns.is_empty() {
        q.sql = format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(&resource.table_name),
            column_list(resource)
        );
        return q;
    }

    q.sql = format!(
        "INSERT INTO {} ({}) VALUES (",
        quoted(&resource.table_name),
        columns.join(", ")
    );
    for (i, (value, cast)) in values.into_iter().enumerate() {
        if i > 0 {
            q.sql.push_str(", ");
        }
        q.push_param(value, cast);
    }
    q.sql.push_str(&format!(") RETURNING {}", column_list(resource)));
    q
}

/// UPDATE of the provided fields, always refreshing `updated_at`.
pub fn update(
    resource: &ResolvedResource,
    id: &Value,
    body: &HashMap<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!("UPDATE {} SET ", quoted(&resource.table_name));
    // Iterate declared fields so the SET order is deterministic.
    for field in &resource.fields {
        if let Some(value) = body.get(&field.name) {
            q.sql.push_str(&quoted(&field.name));
            q.sql.push_str(" = ");
            q.push_param(value.clone(), field_cast(field.field_type));
            q.sql.push_str(", ");
        }
    }
    q.sql.push_str(&format!("{} = NOW() WHERE {} = ", quoted(UPDATED_AT), quoted(&resource.id_column)));
    q.push_param(id.clone(), id_cast(resource.id_type));
    q.sql.push_str(&format!(" RETURNING {}", column_list(resource)));
    q
}

pub fn delete(resource: &ResolvedResource, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ",
        quoted(&resource.table_name),
        quoted(&resource.id_column)
    );
    q.push_param(id.clone(), id_cast(resource.id_type));
    q.sql.push_str(&format!(" RETURNING {}", column_list(resource)));
    q
}

pub fn count_rows(resource: &ResolvedResource) -> QueryBuf {
    QueryBuf {
        sql: format!("SELECT COUNT(*) FROM {}", quoted(&resource.table_name)),
        params: Vec::new(),
    }
}
