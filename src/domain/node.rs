//! Model nodes: graph vertices with realization state.
//!
//! A node owns its concrete backing instance exclusively; consumers only ever
//! see it through projections. State transitions follow
//! `Unrealized -> Realizing -> Realized -> Closed`, with `Realizing -> Failed`
//! as the terminal failure branch.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use generational_arena::Index;

use crate::domain::error::DomainError;
use crate::domain::path::ModelPath;
use crate::domain::schema::StructSchema;
use crate::domain::value::Value;

/// Realization state machine of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unrealized,
    Realizing,
    Realized,
    Failed,
    Closed,
}

/// Dynamically-typed private instance backing a node.
///
/// Property access goes by name; this is the seam that lets schema-driven
/// views delegate to arbitrary concrete types without reflection.
pub trait ModelInstance: Any + Send + Sync {
    /// Declared type this instance implements.
    fn type_name(&self) -> &str;

    /// Read a property by name; None when the instance has no such property.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Write a property by name.
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), DomainError>;

    fn as_any(&self) -> &dyn Any;
}

/// Record-backed instance keyed by property name, initialized from a schema.
///
/// The stock instance for managed nodes; factories may return their own
/// `ModelInstance` implementations instead.
#[derive(Debug)]
pub struct ManagedInstance {
    type_name: String,
    values: BTreeMap<String, Value>,
}

impl ManagedInstance {
    /// Build an instance holding a neutral default for every schema property.
    pub fn from_schema(schema: &StructSchema) -> Self {
        let values = schema
            .properties()
            .map(|p| (p.name.clone(), Value::default_for(p.kind)))
            .collect();
        Self {
            type_name: schema.type_name().to_string(),
            values,
        }
    }

    /// Override a property value (builder style, for factories and tests).
    pub fn with_value(mut self, name: &str, value: Value) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }
}

impl ModelInstance for ManagedInstance {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), DomainError> {
        match self.values.get_mut(name) {
            None => Err(DomainError::UnknownProperty {
                type_name: self.type_name.clone(),
                property: name.to_string(),
            }),
            Some(slot) if slot.kind() != value.kind() => Err(DomainError::TypeMismatch {
                property: name.to_string(),
                expected: slot.kind(),
                actual: value.kind(),
            }),
            Some(slot) => {
                *slot = value;
                Ok(())
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Typed capability attached to a node.
///
/// A projection knows which declared type it exposes and whether views made
/// from it accept writes; the proxy factory turns it into a caller-facing view.
pub trait Projection: Send + Sync {
    /// Declared type this projection exposes.
    fn type_name(&self) -> &str;

    /// Schema backing views created from this projection.
    fn schema(&self) -> Arc<StructSchema>;

    /// Whether views from this projection accept writes.
    fn writable(&self) -> bool;
}

/// Addressable vertex in the model graph.
pub struct ModelNode {
    path: ModelPath,
    pub(crate) parent: Option<Index>,
    pub(crate) children: Vec<Index>,
    state: NodeState,
    instance: Option<Box<dyn ModelInstance>>,
    projections: Vec<Arc<dyn Projection>>,
    immutable_after_realize: bool,
    failed_rule: Option<String>,
}

impl ModelNode {
    pub fn new(path: ModelPath, parent: Option<Index>) -> Self {
        Self {
            path,
            parent,
            children: Vec::new(),
            state: NodeState::Unrealized,
            instance: None,
            projections: Vec::new(),
            immutable_after_realize: false,
            failed_rule: None,
        }
    }

    pub fn path(&self) -> &ModelPath {
        &self.path
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Display name handed to factories: the path's last segment.
    pub fn display_name(&self) -> &str {
        self.path.name()
    }

    /// Rule identity recorded when realization failed.
    pub fn failed_rule(&self) -> Option<&str> {
        self.failed_rule.as_deref()
    }

    /// Projections in registration order; the first one is preferred for
    /// default views.
    pub fn projections(&self) -> &[Arc<dyn Projection>] {
        &self.projections
    }

    /// Enter the Realizing phase. Only legal from Unrealized.
    pub fn begin_realize(&mut self) -> Result<(), DomainError> {
        if self.state != NodeState::Unrealized {
            return Err(DomainError::IllegalTransition {
                path: self.path.clone(),
                from: self.state,
                to: NodeState::Realizing,
            });
        }
        self.state = NodeState::Realizing;
        Ok(())
    }

    /// Atomically install the private instance and projections, completing
    /// the Realizing -> Realized transition. The instance is set exactly once.
    pub fn commit(
        &mut self,
        instance: Box<dyn ModelInstance>,
        projections: Vec<Arc<dyn Projection>>,
        immutable_after_realize: bool,
    ) -> Result<(), DomainError> {
        if self.state != NodeState::Realizing {
            return Err(DomainError::IllegalTransition {
                path: self.path.clone(),
                from: self.state,
                to: NodeState::Realized,
            });
        }
        if self.instance.is_some() {
            return Err(DomainError::DuplicateRealization {
                path: self.path.clone(),
            });
        }
        self.instance = Some(instance);
        self.projections = projections;
        self.immutable_after_realize = immutable_after_realize;
        self.state = NodeState::Realized;
        Ok(())
    }

    /// Terminal failure; records the rule identity for diagnostics.
    pub fn fail(&mut self, rule: &str) {
        self.state = NodeState::Failed;
        self.failed_rule = Some(rule.to_string());
    }

    /// Back out of Realizing when a declared input never resolved; the rule
    /// has not run, so the node stays addressable and unrealized.
    pub fn reset_to_unrealized(&mut self) {
        if self.state == NodeState::Realizing {
            self.state = NodeState::Unrealized;
        }
    }

    /// Registry teardown.
    pub fn close(&mut self) {
        self.state = NodeState::Closed;
    }

    /// Read a property from the private instance.
    pub fn read_property(&self, name: &str) -> Result<Value, DomainError> {
        let instance = self.instance.as_ref().ok_or(DomainError::ImmutableState {
            path: self.path.clone(),
            state: self.state,
        })?;
        instance
            .get_property(name)
            .ok_or_else(|| DomainError::UnknownProperty {
                type_name: instance.type_name().to_string(),
                property: name.to_string(),
            })
    }

    /// Write a property into the private instance, honoring the node's
    /// lifecycle: closed nodes and nodes frozen after realization reject
    /// all mutation.
    pub fn write_property(&mut self, name: &str, value: Value) -> Result<(), DomainError> {
        match self.state {
            NodeState::Realized if !self.immutable_after_realize => {}
            NodeState::Realizing => {}
            state => {
                return Err(DomainError::ImmutableState {
                    path: self.path.clone(),
                    state,
                })
            }
        }
        let instance = self.instance.as_mut().ok_or(DomainError::ImmutableState {
            path: self.path.clone(),
            state: self.state,
        })?;
        instance.set_property(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{Access, SchemaDescriptor, StructSchema};
    use crate::domain::value::PropertyKind;

    fn schema() -> StructSchema {
        StructSchema::compile(
            &SchemaDescriptor::new("Sample")
                .property("name", PropertyKind::String, Access::ReadWrite),
        )
        .unwrap()
    }

    #[test]
    fn given_unrealized_node_when_committing_without_realizing_then_illegal_transition() {
        let mut node = ModelNode::new(ModelPath::parse("a").unwrap(), None);
        let instance = Box::new(ManagedInstance::from_schema(&schema()));

        let err = node.commit(instance, Vec::new(), false).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition { .. }));
    }

    #[test]
    fn given_realizing_node_when_committing_then_realized_and_readable() {
        let mut node = ModelNode::new(ModelPath::parse("a").unwrap(), None);
        node.begin_realize().unwrap();
        let instance = Box::new(ManagedInstance::from_schema(&schema()));

        node.commit(instance, Vec::new(), false).unwrap();

        assert_eq!(node.state(), NodeState::Realized);
        assert_eq!(
            node.read_property("name").unwrap(),
            Value::String(String::new())
        );
    }

    #[test]
    fn given_frozen_node_when_writing_then_immutable_state() {
        let mut node = ModelNode::new(ModelPath::parse("a").unwrap(), None);
        node.begin_realize().unwrap();
        let instance = Box::new(ManagedInstance::from_schema(&schema()));
        node.commit(instance, Vec::new(), true).unwrap();

        let err = node.write_property("name", Value::from("x")).unwrap_err();
        assert!(matches!(err, DomainError::ImmutableState { .. }));
    }

    #[test]
    fn given_unknown_property_when_setting_on_managed_instance_then_errors() {
        let mut instance = ManagedInstance::from_schema(&schema());
        assert!(matches!(
            instance.set_property("nope", Value::from("x")),
            Err(DomainError::UnknownProperty { .. })
        ));
        assert!(matches!(
            instance.set_property("name", Value::from(1i64)),
            Err(DomainError::TypeMismatch { .. })
        ));
    }
}
