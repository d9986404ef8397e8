//! Storage abstraction: the same CRUD surface over Postgres or memory.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::ResolvedResource;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend: {0}")]
    Backend(String),
}

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Pagination window for list queries. Limits are clamped to [1, MAX_LIMIT].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Page {
            limit,
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Backend-neutral persistence operations. Entities travel as JSON objects;
/// the resource describes columns, id handling, and uniqueness.
#[async_trait]
pub trait Store: Send + Sync {
    /// Rows matching all equality filters, in stable id order.
    async fn list(
        &self,
        resource: &ResolvedResource,
        filters: &[(String, Value)],
        page: Page,
    ) -> Result<Vec<Value>, StoreError>;

    async fn get(
        &self,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Value>, StoreError>;

    /// Inserts a row, stamping timestamps and generating an id when the body
    /// does not carry one. Unique violations surface as `Conflict`.
    async fn insert(
        &self,
        resource: &ResolvedResource,
        body: &HashMap<String, Value>,
    ) -> Result<Value, StoreError>;

    /// Merges the provided fields into an existing row and refreshes
    /// `updated_at`. Returns `None` when the id does not exist.
    async fn update(
        &self,
        resource: &ResolvedResource,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Removes a row, returning it when it existed.
    async fn delete(
        &self,
        resource: &ResolvedResource,
        id: &Value,
    ) -> Result<Option<Value>, StoreError>;

    async fn count(&self, resource: &ResolvedResource) -> Result<u64, StoreError>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit() {
        assert_eq!(Page::new(None, None), Page { limit: 100, offset: 0 });
        assert_eq!(Page::new(Some(0), None).limit, 1);
        assert_eq!(Page::new(Some(5000), Some(20)), Page { limit: 1000, offset: 20 });
    }
}
