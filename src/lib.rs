//! modelgraph: lazy, rule-based realization of typed configuration nodes.
//!
//! A registry of hierarchically-addressed nodes whose concrete backing
//! instances are produced on first access by bound specialization rules, and
//! exposed to callers through schema-driven views instead of raw instances.
//!
//! The moving parts, leaves first:
//! - [`application::SchemaStore`] caches a structural schema per declared type.
//! - [`application::ProxyFactory`] turns a schema plus a node into a
//!   [`application::ModelView`], the tagged-view replacement for a dynamic proxy.
//! - [`infrastructure::FactoryRegistry`] is the external seam through which
//!   concrete types enter the graph.
//! - [`application::Rule`] implementations declare their inputs and realize
//!   nodes; [`application::SpecializationRule`] layers factory-built instances
//!   over the managed defaults.
//! - [`application::ModelRegistry`] orchestrates: input-first ordering, cycle
//!   detection, memoized and coalesced realization.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod util;

pub use application::{
    InputReference, InputValue, ManagedProjection, ManagedRule, ModelError, ModelRegistry,
    ModelResult, ModelView, NodeHandle, ProxyFactory, Rule, RuleContext, SchemaStore,
    SpecializationRule, TypedView,
};
pub use config::RegistrySettings;
pub use domain::{
    Access, DomainError, ManagedInstance, ManagedType, ModelInstance, ModelPath, NodeState,
    PropertyDescriptor, PropertyKind, SchemaDescriptor, StructSchema, Value,
};
pub use infrastructure::{
    FactoryRegistry, FnFactory, InstanceFactory, ServiceContainer, FACTORY_REGISTRY_SERVICE,
};
