//! Specialization rules: pluggable realization logic with declared inputs.
//!
//! A rule declares what it needs (other nodes, services) and, once the
//! registry has resolved those inputs, stages the node's private instance and
//! projections into a [`RuleContext`]. The registry commits the staged state
//! atomically, so a failing rule applies nothing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::application::error::{ModelError, ModelResult};
use crate::application::projection::{ManagedProjection, ModelView};
use crate::application::schema_store::SchemaStore;
use crate::domain::{
    DomainError, ManagedInstance, ModelInstance, ModelPath, Projection, StructSchema,
};
use crate::infrastructure::traits::{FactoryRegistry, FACTORY_REGISTRY_SERVICE};

/// Reference to something a rule needs resolved before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputReference {
    /// Another node, realized before this rule executes.
    Node(ModelPath),
    /// A registry service, looked up by key.
    Service(String),
}

impl fmt::Display for InputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputReference::Node(path) => write!(f, "node {}", path),
            InputReference::Service(key) => write!(f, "service {}", key),
        }
    }
}

/// A resolved input, aligned positionally with `declared_inputs()`.
#[derive(Clone)]
pub enum InputValue {
    Node(ModelView),
    Service(Arc<dyn Any + Send + Sync>),
}

impl InputValue {
    /// The input as a node view.
    pub fn node(&self) -> ModelResult<&ModelView> {
        match self {
            InputValue::Node(view) => Ok(view),
            InputValue::Service(_) => Err(ModelError::Config {
                message: "input is a service, not a node".to_string(),
            }),
        }
    }

    /// The input as a typed service.
    pub fn service<T: Any + Send + Sync>(&self) -> ModelResult<Arc<T>> {
        match self {
            InputValue::Service(service) => {
                service.clone().downcast::<T>().map_err(|_| ModelError::Config {
                    message: format!(
                        "service input is not of the requested type {}",
                        std::any::type_name::<T>()
                    ),
                })
            }
            InputValue::Node(_) => Err(ModelError::Config {
                message: "input is a node, not a service".to_string(),
            }),
        }
    }
}

/// Staging area handed to an executing rule.
///
/// Everything a rule produces lands here first; the registry applies instance
/// and projections to the node in one step after the rule returns Ok.
pub struct RuleContext {
    path: ModelPath,
    schema_store: Arc<SchemaStore>,
    staged_instance: Option<Box<dyn ModelInstance>>,
    staged_projections: Vec<Arc<dyn Projection>>,
    immutable_after_realize: bool,
    defaults_applied: bool,
}

impl RuleContext {
    pub(crate) fn new(
        path: ModelPath,
        schema_store: Arc<SchemaStore>,
        immutable_after_realize: bool,
    ) -> Self {
        Self {
            path,
            schema_store,
            staged_instance: None,
            staged_projections: Vec::new(),
            immutable_after_realize,
            defaults_applied: false,
        }
    }

    pub fn path(&self) -> &ModelPath {
        &self.path
    }

    /// Display name handed to factories: the path's last segment.
    pub fn display_name(&self) -> &str {
        self.path.name()
    }

    pub fn schema_store(&self) -> &Arc<SchemaStore> {
        &self.schema_store
    }

    pub fn has_instance(&self) -> bool {
        self.staged_instance.is_some()
    }

    /// Stage the node's private instance. At most one per realization.
    pub fn set_private_instance(&mut self, instance: Box<dyn ModelInstance>) -> ModelResult<()> {
        if self.staged_instance.is_some() {
            return Err(DomainError::DuplicateRealization {
                path: self.path.clone(),
            }
            .into());
        }
        self.staged_instance = Some(instance);
        Ok(())
    }

    /// Stage a projection; registration order is preserved and the first
    /// projection becomes the node's default view.
    pub fn add_projection(&mut self, projection: Arc<dyn Projection>) {
        self.staged_projections.push(projection);
    }

    /// Freeze (or unfreeze) the node against writes once realized.
    pub fn set_immutable_after_realize(&mut self, flag: bool) {
        self.immutable_after_realize = flag;
    }

    pub(crate) fn mark_defaults_applied(&mut self) {
        self.defaults_applied = true;
    }

    pub(crate) fn defaults_applied(&self) -> bool {
        self.defaults_applied
    }

    #[allow(clippy::type_complexity)]
    pub(crate) fn into_parts(
        self,
    ) -> Option<(Box<dyn ModelInstance>, Vec<Arc<dyn Projection>>, bool)> {
        let instance = self.staged_instance?;
        Some((
            instance,
            self.staged_projections,
            self.immutable_after_realize,
        ))
    }
}

/// A unit of graph realization logic bound to a node.
pub trait Rule: Send + Sync {
    /// Identity used in diagnostics.
    fn name(&self) -> &str;

    /// Required inputs, resolved by the registry before `execute` runs.
    /// Must be stable and side-effect-free to call repeatedly.
    fn declared_inputs(&self) -> Vec<InputReference>;

    /// Realize the node, staging its private instance and projections.
    /// `inputs` aligns positionally with `declared_inputs()`.
    fn execute(&self, ctx: &mut RuleContext, inputs: &[InputValue]) -> ModelResult<()>;
}

/// Base rule for managed nodes: schema-driven default projection plus a
/// record-backed default instance.
pub struct ManagedRule {
    type_name: String,
    name: String,
}

impl ManagedRule {
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let name = format!("managed({})", type_name);
        Self { type_name, name }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Default projection setup shared by all managed rules. Runs exactly
    /// once per realization, before any specialization logic.
    pub fn apply_defaults(&self, ctx: &mut RuleContext) -> ModelResult<Arc<StructSchema>> {
        let schema = ctx.schema_store().schema_for(&self.type_name)?;
        if !ctx.defaults_applied() {
            ctx.add_projection(Arc::new(ManagedProjection::new(schema.clone(), true)));
            ctx.mark_defaults_applied();
        }
        Ok(schema)
    }
}

impl Rule for ManagedRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_inputs(&self) -> Vec<InputReference> {
        Vec::new()
    }

    fn execute(&self, ctx: &mut RuleContext, _inputs: &[InputValue]) -> ModelResult<()> {
        let schema = self.apply_defaults(ctx)?;
        if !ctx.has_instance() {
            ctx.set_private_instance(Box::new(ManagedInstance::from_schema(&schema)))?;
        }
        Ok(())
    }
}

/// Rule that delegates concrete construction to the factory-registry service,
/// layered over the managed defaults.
pub struct SpecializationRule {
    base: ManagedRule,
    name: String,
}

impl SpecializationRule {
    pub fn new(type_name: impl Into<String>) -> Self {
        let base = ManagedRule::new(type_name);
        let name = format!("specialize({})", base.type_name());
        Self { base, name }
    }
}

impl Rule for SpecializationRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_inputs(&self) -> Vec<InputReference> {
        vec![InputReference::Service(
            FACTORY_REGISTRY_SERVICE.to_string(),
        )]
    }

    fn execute(&self, ctx: &mut RuleContext, inputs: &[InputValue]) -> ModelResult<()> {
        self.base.apply_defaults(ctx)?;

        let factories: Arc<FactoryRegistry> = inputs
            .first()
            .ok_or_else(|| ModelError::Config {
                message: format!("rule {} resolved no inputs", self.name),
            })?
            .service()?;

        let path = ctx.path().clone();
        let display_name = path.name().to_string();
        debug!(type_name = self.base.type_name(), path = %path, "creating specialized instance");
        let instance = factories.create(self.base.type_name(), &path, &display_name)?;
        ctx.set_private_instance(instance)?;
        Ok(())
    }
}
