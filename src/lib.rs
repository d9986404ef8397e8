//! crudkit: schema-driven CRUD REST backend with pluggable storage.
//!
//! Resources are declared in JSON, resolved at startup, and served through
//! one generic router: list/read/create/update/delete plus nested relation
//! listing, JWT-backed auth routes, and either a Postgres or an in-memory
//! store behind the same trait.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod store;
pub mod validation;

pub use auth::TokenSigner;
pub use config::{
    load_from_path, resolve, FieldConfig, FieldType, Operation, RelationConfig, RelationKind,
    ResolvedModel, ResolvedResource, ResourceConfig,
};
pub use error::{AppError, ConfigError};
pub use migration::{apply_migrations, ensure_database_exists};
pub use routes::api_router;
pub use state::AppState;
pub use store::{MemoryStore, Page, PgStore, Store, StoreError};
