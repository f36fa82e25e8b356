//! Boundary traits for external collaborators
//!
//! Concrete domain types enter the graph only through these seams. The
//! registry itself never names a concrete binary or artifact type; host tools
//! and tests plug in their own factories.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::application::error::{ModelError, ModelResult};
use crate::domain::{ModelInstance, ModelPath};

/// Service key under which the factory registry is published to rules.
pub const FACTORY_REGISTRY_SERVICE: &str = "factory-registry";

/// Constructs concrete backing instances for abstract declared types.
pub trait InstanceFactory: Send + Sync {
    /// Whether this factory can build `type_name`.
    fn supports(&self, type_name: &str) -> bool;

    /// Build a concrete instance for the node at `owner`.
    fn create(
        &self,
        type_name: &str,
        owner: &ModelPath,
        display_name: &str,
    ) -> ModelResult<Box<dyn ModelInstance>>;
}

/// Pluggable set of named factories, dispatched by requested type.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<Vec<(String, Arc<dyn InstanceFactory>)>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named factory. Registration order is dispatch order.
    pub fn register(&self, name: impl Into<String>, factory: Arc<dyn InstanceFactory>) {
        let name = name.into();
        debug!(factory = %name, "registering instance factory");
        self.factories.write().unwrap().push((name, factory));
    }

    /// Build an instance of `type_name` via the first supporting factory.
    pub fn create(
        &self,
        type_name: &str,
        owner: &ModelPath,
        display_name: &str,
    ) -> ModelResult<Box<dyn ModelInstance>> {
        let factories = self.factories.read().unwrap();
        for (name, factory) in factories.iter() {
            if factory.supports(type_name) {
                debug!(factory = %name, type_name, owner = %owner, "dispatching create");
                return factory.create(type_name, owner, display_name);
            }
        }
        Err(ModelError::UnsupportedType {
            type_name: type_name.to_string(),
            path: owner.clone(),
        })
    }
}

/// Adapter turning a closure into a factory for a single declared type.
pub struct FnFactory<F> {
    type_name: String,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(&ModelPath, &str) -> ModelResult<Box<dyn ModelInstance>> + Send + Sync,
{
    pub fn new(type_name: impl Into<String>, build: F) -> Self {
        Self {
            type_name: type_name.into(),
            build,
        }
    }
}

impl<F> InstanceFactory for FnFactory<F>
where
    F: Fn(&ModelPath, &str) -> ModelResult<Box<dyn ModelInstance>> + Send + Sync,
{
    fn supports(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }

    fn create(
        &self,
        type_name: &str,
        owner: &ModelPath,
        display_name: &str,
    ) -> ModelResult<Box<dyn ModelInstance>> {
        if !self.supports(type_name) {
            return Err(ModelError::UnsupportedType {
                type_name: type_name.to_string(),
                path: owner.clone(),
            });
        }
        (self.build)(owner, display_name)
    }
}
