//! Raw resource declarations matching the JSON config.

use crate::config::resolved::{IdType, RelationKind};
use serde::{Deserialize, Serialize};

/// Field value type. Drives validation, SQL column types, and row decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Integer,
    Number,
    Boolean,
    Uuid,
    Timestamp,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// One declared field with its validation rules inline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Name used in the nested route (`/api/<resource>/:id/<name>`).
    pub name: String,
    /// Path segment of the related resource.
    pub target: String,
    pub kind: RelationKind,
    /// FK column: on this resource for to_one, on the target for to_many.
    pub foreign_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub path_segment: String,
    /// Table name; defaults to the path segment.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub id_type: IdType,
    pub fields: Vec<FieldConfig>,
    #[serde(default = "default_operations")]
    pub operations: Vec<Operation>,
    /// Field names that must never appear in API responses (password hashes, secrets).
    #[serde(default)]
    pub sensitive_fields: Vec<String>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
}

fn default_operations() -> Vec<Operation> {
    vec![
        Operation::List,
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ]
}
