//! Domain layer: paths, values, schemas, and node state
//!
//! This layer is independent of external concerns (no I/O, no config loading,
//! no orchestration).

pub mod error;
pub mod node;
pub mod path;
pub mod schema;
pub mod value;

pub use error::{DomainError, DomainResult};
pub use node::{ManagedInstance, ModelInstance, ModelNode, NodeState, Projection};
pub use path::ModelPath;
pub use schema::{
    Access, ManagedType, PropertyDescriptor, PropertySchema, SchemaDescriptor, StructSchema,
};
pub use value::{PropertyKind, Value};
