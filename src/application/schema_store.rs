//! Schema store: derives and caches structural schemas per declared type.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::application::error::ModelResult;
use crate::domain::{DomainError, ManagedType, SchemaDescriptor, StructSchema};

/// Caches one compiled schema per declared type.
///
/// Descriptors are registered up front (bind time); `schema_for` compiles on
/// first request and memoizes. The cache is never invalidated once populated
/// for a type, so every caller observes the same `Arc`.
#[derive(Default)]
pub struct SchemaStore {
    descriptors: RwLock<HashMap<String, SchemaDescriptor>>,
    cache: RwLock<HashMap<String, Arc<StructSchema>>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bind-time descriptor. Re-registration before the first
    /// `schema_for` replaces the descriptor; after that the cached schema wins.
    pub fn register(&self, descriptor: SchemaDescriptor) {
        debug!(type_name = %descriptor.type_name, "registering schema descriptor");
        self.descriptors
            .write()
            .unwrap()
            .insert(descriptor.type_name.clone(), descriptor);
    }

    /// Register the descriptor shipped by a declared type.
    pub fn register_type<T: ManagedType>(&self) {
        self.register(T::descriptor());
    }

    /// Pure, memoized schema lookup.
    ///
    /// Safe to call concurrently from multiple realization paths: the first
    /// compiled schema wins the cache slot, so concurrent callers converge on
    /// one shared instance.
    pub fn schema_for(&self, type_name: &str) -> ModelResult<Arc<StructSchema>> {
        if let Some(schema) = self.cache.read().unwrap().get(type_name) {
            return Ok(schema.clone());
        }

        let descriptor = self
            .descriptors
            .read()
            .unwrap()
            .get(type_name)
            .cloned()
            .ok_or_else(|| DomainError::Schema {
                type_name: type_name.to_string(),
                reason: "no descriptor registered".to_string(),
            })?;

        let compiled = Arc::new(StructSchema::compile(&descriptor)?);
        let mut cache = self.cache.write().unwrap();
        let entry = cache
            .entry(type_name.to_string())
            .or_insert_with(|| compiled);
        Ok(entry.clone())
    }
}
