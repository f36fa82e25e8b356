//! Service container for dependency injection
//!
//! Wires settings, the schema store, and the factory registry into a ready
//! model registry, publishing the factory registry as a rule input service.

use std::sync::Arc;

use crate::application::registry::ModelRegistry;
use crate::application::schema_store::SchemaStore;
use crate::config::RegistrySettings;
use crate::infrastructure::traits::{FactoryRegistry, FACTORY_REGISTRY_SERVICE};

/// Container holding the wired-up registry and its collaborators.
pub struct ServiceContainer {
    /// Registry settings
    pub settings: RegistrySettings,

    /// Shared schema cache
    pub schema_store: Arc<SchemaStore>,

    /// External factory seam, published as a rule input service
    pub factories: Arc<FactoryRegistry>,

    /// The wired model registry
    pub registry: ModelRegistry,
}

impl ServiceContainer {
    /// Create a container with fresh collaborators.
    pub fn new(settings: RegistrySettings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(SchemaStore::new()),
            Arc::new(FactoryRegistry::new()),
        )
    }

    /// Create a container with custom collaborators (for testing).
    pub fn with_deps(
        settings: RegistrySettings,
        schema_store: Arc<SchemaStore>,
        factories: Arc<FactoryRegistry>,
    ) -> Self {
        let registry = ModelRegistry::new(settings.clone(), schema_store.clone());
        registry.register_service(FACTORY_REGISTRY_SERVICE, factories.clone());

        Self {
            settings,
            schema_store,
            factories,
            registry,
        }
    }
}
