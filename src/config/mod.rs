pub mod loader;
pub mod resolved;
pub mod types;
pub mod validator;

pub use loader::{load_from_path, resolve};
pub use resolved::{IdType, RelationKind, RelationSpec, ResolvedModel, ResolvedResource};
pub use types::{FieldConfig, FieldType, Operation, RelationConfig, ResourceConfig};
pub use validator::validate;
