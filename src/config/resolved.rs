//! Resolved resource model: config validated and flattened for runtime use.

use crate::config::types::{FieldConfig, FieldType, Operation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Implicit timestamp columns stamped by every store.
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Id type for parsing path ids and generating new ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    Uuid,
    #[default]
    Int,
    Text,
}

/// Direction of a relation: to_one (we hold the FK) or to_many (they hold the FK).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ToOne,
    ToMany,
}

/// Runtime join spec for a nested relation route.
#[derive(Clone, Debug)]
pub struct RelationSpec {
    pub name: String,
    pub kind: RelationKind,
    pub target_path: String,
    /// Our column used in the join (our FK for to_one; our id for to_many).
    pub our_key: String,
    /// Their column used in the join (their id for to_one; their FK for to_many).
    pub their_key: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub path_segment: String,
    pub table_name: String,
    pub id_column: String,
    pub id_type: IdType,
    pub fields: Vec<FieldConfig>,
    pub operations: Vec<Operation>,
    /// Field names to strip from all API responses (sensitive data).
    pub sensitive_fields: HashSet<String>,
    pub relations: Vec<RelationSpec>,
}

impl ResolvedResource {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.field(name).map(|f| f.field_type)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// All persisted column names: id, declared fields, timestamps.
    pub fn column_names(&self) -> Vec<String> {
        let mut cols = Vec::with_capacity(self.fields.len() + 3);
        cols.push(self.id_column.clone());
        cols.extend(self.fields.iter().map(|f| f.name.clone()));
        cols.push(CREATED_AT.to_string());
        cols.push(UPDATED_AT.to_string());
        cols
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
    pub resource_by_path: HashMap<String, ResolvedResource>,
}

impl ResolvedModel {
    pub fn resource_by_path(&self, path: &str) -> Option<&ResolvedResource> {
        self.resource_by_path.get(path)
    }
}
