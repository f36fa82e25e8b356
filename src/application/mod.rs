//! Application layer: schema store, views, rules, and the model registry
//!
//! This layer orchestrates domain state and depends on the factory boundary
//! traits for concrete-type construction.

pub mod error;
pub mod projection;
pub mod proxy;
pub mod registry;
pub mod rules;
pub mod schema_store;

pub use error::{ModelError, ModelResult};
pub use projection::{ManagedProjection, ModelView, TypedView};
pub use proxy::ProxyFactory;
pub use registry::{ModelRegistry, NodeHandle};
pub use rules::{InputReference, InputValue, ManagedRule, Rule, RuleContext, SpecializationRule};
pub use schema_store::SchemaStore;
