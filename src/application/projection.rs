//! Projections and views: schema-driven access to node storage.
//!
//! A `ModelView` is the tagged-view stand-in for a dynamic proxy: an explicit
//! struct holding the schema plus a back-reference to the node, with
//! table-driven accessors. Reads and writes go straight to the node's private
//! instance and never touch (or realize) any other node.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::application::error::{ModelError, ModelResult};
use crate::application::registry::NodeHandle;
use crate::domain::{
    Access, DomainError, ManagedType, ModelPath, Projection, StructSchema, Value,
};

/// Schema-backed projection for managed nodes.
///
/// The stock projection registered by the managed base rule; `writable`
/// controls whether views created from it accept mutation.
pub struct ManagedProjection {
    schema: Arc<StructSchema>,
    writable: bool,
}

impl ManagedProjection {
    pub fn new(schema: Arc<StructSchema>, writable: bool) -> Self {
        Self { schema, writable }
    }
}

impl Projection for ManagedProjection {
    fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    fn schema(&self) -> Arc<StructSchema> {
        self.schema.clone()
    }

    fn writable(&self) -> bool {
        self.writable
    }
}

/// Caller-facing view over a node's private storage.
///
/// Two views over the same node and schema are observationally equivalent;
/// they share no identity beyond the node they delegate to.
#[derive(Clone)]
pub struct ModelView {
    schema: Arc<StructSchema>,
    writable: bool,
    handle: NodeHandle,
}

impl std::fmt::Debug for ModelView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelView")
            .field("path", self.handle.path())
            .field("schema", &self.schema)
            .field("writable", &self.writable)
            .finish()
    }
}

impl ModelView {
    pub(crate) fn new(schema: Arc<StructSchema>, writable: bool, handle: NodeHandle) -> Self {
        Self {
            schema,
            writable,
            handle,
        }
    }

    pub fn path(&self) -> &ModelPath {
        self.handle.path()
    }

    /// Declared type this view exposes.
    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    pub fn schema(&self) -> &Arc<StructSchema> {
        &self.schema
    }

    /// Read a property through the schema.
    pub fn get(&self, property: &str) -> ModelResult<Value> {
        self.schema
            .property(property)
            .ok_or_else(|| DomainError::UnknownProperty {
                type_name: self.schema.type_name().to_string(),
                property: property.to_string(),
            })?;
        self.handle.read_property(property)
    }

    /// Write a property through the schema, honoring declared mutability and
    /// the node's lifecycle state.
    pub fn set(&self, property: &str, value: Value) -> ModelResult<()> {
        let prop = self
            .schema
            .property(property)
            .ok_or_else(|| DomainError::UnknownProperty {
                type_name: self.schema.type_name().to_string(),
                property: property.to_string(),
            })?;
        if prop.access == Access::ReadOnly || !self.writable {
            return Err(DomainError::ReadOnlyProperty {
                type_name: self.schema.type_name().to_string(),
                property: property.to_string(),
            }
            .into());
        }
        if value.kind() != prop.kind {
            return Err(DomainError::TypeMismatch {
                property: property.to_string(),
                expected: prop.kind,
                actual: value.kind(),
            }
            .into());
        }
        self.handle.write_property(property, value)
    }
}

/// Compile-time tagged wrapper over a [`ModelView`].
///
/// Verifies at construction that the view exposes `T`'s declared type, so the
/// tag cannot lie about what is underneath.
pub struct TypedView<T: ManagedType> {
    view: ModelView,
    _type: PhantomData<T>,
}

impl<T: ManagedType> TypedView<T> {
    pub fn new(view: ModelView) -> ModelResult<Self> {
        if view.type_name() != T::TYPE_NAME {
            return Err(ModelError::Domain(DomainError::Schema {
                type_name: T::TYPE_NAME.to_string(),
                reason: format!("view exposes {}, not {}", view.type_name(), T::TYPE_NAME),
            }));
        }
        Ok(Self {
            view,
            _type: PhantomData,
        })
    }

    pub fn get(&self, property: &str) -> ModelResult<Value> {
        self.view.get(property)
    }

    pub fn set(&self, property: &str, value: Value) -> ModelResult<()> {
        self.view.set(property, value)
    }

    pub fn path(&self) -> &ModelPath {
        self.view.path()
    }

    pub fn into_inner(self) -> ModelView {
        self.view
    }
}
