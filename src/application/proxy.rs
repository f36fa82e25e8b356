//! Proxy factory: synthesizes views satisfying a declared type's schema.
//!
//! There is no runtime code generation; the "proxy" is a [`ModelView`] whose
//! accessors are driven by the schema's property table and delegate to the
//! node's storage. Creating or using a view never realizes other nodes.

use std::sync::Arc;

use crate::application::projection::ModelView;
use crate::application::registry::NodeHandle;
use crate::domain::StructSchema;

/// Builds views over node storage. Stateless; one shared instance serves all
/// projections.
#[derive(Debug, Default)]
pub struct ProxyFactory;

impl ProxyFactory {
    pub fn new() -> Self {
        Self
    }

    /// Produce a view of `handle` typed by `schema`.
    ///
    /// Views created for the same node and schema are observationally
    /// equivalent but are distinct objects.
    pub fn create_view(
        &self,
        schema: Arc<StructSchema>,
        writable: bool,
        handle: NodeHandle,
    ) -> ModelView {
        ModelView::new(schema, writable, handle)
    }
}
