//! Model registry: resolves paths to nodes and drives rule realization.
//!
//! Nodes live in a generational arena keyed by path; referencing `a.b.c`
//! materializes unrealized ancestors. Realization is lazy, memoized, and
//! coalesced: the first caller runs the bound rule (inputs first, depth-first),
//! concurrent callers for the same node wait and observe the same result.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, RwLock};

use generational_arena::{Arena, Index};
use itertools::Itertools;
use rayon::prelude::*;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::error::{ModelError, ModelResult};
use crate::application::projection::{ModelView, TypedView};
use crate::application::proxy::ProxyFactory;
use crate::application::rules::{InputReference, InputValue, Rule, RuleContext};
use crate::application::schema_store::SchemaStore;
use crate::config::RegistrySettings;
use crate::domain::{DomainError, ManagedType, ModelNode, ModelPath, NodeState, Value};

pub(crate) struct RegistryShared {
    inner: Mutex<Inner>,
    realized: Condvar,
    schema_store: Arc<SchemaStore>,
    settings: RegistrySettings,
    services: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    proxy_factory: ProxyFactory,
}

struct Inner {
    arena: Arena<ModelNode>,
    by_path: HashMap<ModelPath, Index>,
    bindings: HashMap<ModelPath, Arc<dyn Rule>>,
    subtree_bindings: Vec<(ModelPath, Arc<dyn Rule>)>,
    closed: bool,
}

/// Back-reference from views to a node's storage.
///
/// Property access locks the registry briefly and touches only this node, so
/// reads through a view can never realize other nodes as a side effect.
#[derive(Clone)]
pub struct NodeHandle {
    shared: Arc<RegistryShared>,
    idx: Index,
    path: ModelPath,
}

impl NodeHandle {
    pub fn path(&self) -> &ModelPath {
        &self.path
    }

    pub fn state(&self) -> NodeState {
        let inner = self.shared.inner.lock().unwrap();
        inner
            .arena
            .get(self.idx)
            .map(|n| n.state())
            .unwrap_or(NodeState::Closed)
    }

    pub(crate) fn read_property(&self, property: &str) -> ModelResult<Value> {
        let inner = self.shared.inner.lock().unwrap();
        let node = inner.arena.get(self.idx).ok_or_else(|| ModelError::Config {
            message: format!("node {} no longer exists", self.path),
        })?;
        node.read_property(property).map_err(Into::into)
    }

    pub(crate) fn write_property(&self, property: &str, value: Value) -> ModelResult<()> {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.closed {
            return Err(DomainError::ImmutableState {
                path: self.path.clone(),
                state: NodeState::Closed,
            }
            .into());
        }
        let node = inner
            .arena
            .get_mut(self.idx)
            .ok_or_else(|| ModelError::Config {
                message: format!("node {} no longer exists", self.path),
            })?;
        node.write_property(property, value).map_err(Into::into)
    }
}

/// Orchestrator of the model graph.
///
/// Cloning is cheap and shares the underlying graph.
#[derive(Clone)]
pub struct ModelRegistry {
    shared: Arc<RegistryShared>,
}

impl ModelRegistry {
    pub fn new(settings: RegistrySettings, schema_store: Arc<SchemaStore>) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                inner: Mutex::new(Inner {
                    arena: Arena::new(),
                    by_path: HashMap::new(),
                    bindings: HashMap::new(),
                    subtree_bindings: Vec::new(),
                    closed: false,
                }),
                realized: Condvar::new(),
                schema_store,
                settings,
                services: RwLock::new(HashMap::new()),
                proxy_factory: ProxyFactory::new(),
            }),
        }
    }

    pub fn schema_store(&self) -> &Arc<SchemaStore> {
        &self.shared.schema_store
    }

    /// Publish a service rules can declare as an input.
    pub fn register_service<T: Any + Send + Sync>(&self, key: impl Into<String>, service: Arc<T>) {
        let key = key.into();
        debug!(key = %key, "registering service");
        self.shared.services.write().unwrap().insert(key, service);
    }

    /// Look up or create the (unrealized) node at `path`, materializing
    /// unrealized ancestors along the way.
    pub fn get_or_create(&self, path: &ModelPath) -> ModelResult<NodeHandle> {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.closed {
            return Err(DomainError::ImmutableState {
                path: path.clone(),
                state: NodeState::Closed,
            }
            .into());
        }
        let idx = Self::ensure_node(&mut inner, path);
        Ok(NodeHandle {
            shared: self.shared.clone(),
            idx,
            path: path.clone(),
        })
    }

    /// Bind a rule to exactly one path.
    #[instrument(level = "debug", skip(self, rule), fields(rule = rule.name()))]
    pub fn bind(&self, path: &ModelPath, rule: Arc<dyn Rule>) -> ModelResult<()> {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.closed {
            return Err(DomainError::ImmutableState {
                path: path.clone(),
                state: NodeState::Closed,
            }
            .into());
        }
        let idx = Self::ensure_node(&mut inner, path);
        match inner.arena[idx].state() {
            NodeState::Unrealized => {
                inner.bindings.insert(path.clone(), rule);
                Ok(())
            }
            state => Err(ModelError::Config {
                message: format!("cannot bind rule to {} in state {:?}", path, state),
            }),
        }
    }

    /// Bind a default rule for every descendant of `prefix` without an exact
    /// binding. Deeper prefixes win when several apply.
    #[instrument(level = "debug", skip(self, rule), fields(rule = rule.name()))]
    pub fn bind_subtree(&self, prefix: &ModelPath, rule: Arc<dyn Rule>) -> ModelResult<()> {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.closed {
            return Err(DomainError::ImmutableState {
                path: prefix.clone(),
                state: NodeState::Closed,
            }
            .into());
        }
        inner.subtree_bindings.push((prefix.clone(), rule));
        Ok(())
    }

    pub fn state_of(&self, path: &ModelPath) -> Option<NodeState> {
        let inner = self.shared.inner.lock().unwrap();
        inner.by_path.get(path).map(|&idx| inner.arena[idx].state())
    }

    /// Realize the node at `path` (inputs first) and return its default view.
    ///
    /// Memoized: a Realized node returns its cached state. Coalesced: callers
    /// finding the node mid-realization wait for the winner's result instead
    /// of re-running the rule.
    #[instrument(level = "debug", skip(self))]
    pub fn realize(&self, path: &ModelPath) -> ModelResult<ModelView> {
        let (rule, idx) = {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.closed {
                return Err(DomainError::ImmutableState {
                    path: path.clone(),
                    state: NodeState::Closed,
                }
                .into());
            }
            let idx = Self::ensure_node(&mut inner, path);
            loop {
                match inner.arena[idx].state() {
                    NodeState::Realized => {
                        return Self::default_view(&self.shared, &inner, idx);
                    }
                    NodeState::Failed => {
                        let rule = inner.arena[idx].failed_rule().unwrap_or("<unknown>");
                        return Err(ModelError::NodeFailed {
                            path: path.clone(),
                            rule: rule.to_string(),
                        });
                    }
                    NodeState::Closed => {
                        return Err(DomainError::ImmutableState {
                            path: path.clone(),
                            state: NodeState::Closed,
                        }
                        .into());
                    }
                    NodeState::Realizing => {
                        // another caller is realizing this node; wait for it
                        inner = self.shared.realized.wait(inner).unwrap();
                    }
                    NodeState::Unrealized => {
                        let rule = Self::lookup_rule(&inner, path).ok_or_else(|| {
                            ModelError::NoRuleBound { path: path.clone() }
                        })?;
                        Self::check_cycles(&inner, path)?;
                        inner.arena[idx].begin_realize()?;
                        break (rule, idx);
                    }
                }
            }
        };

        debug!(path = %path, rule = rule.name(), "realizing node");

        // Resolve declared inputs depth-first, without holding the lock.
        let references = rule.declared_inputs();
        let mut inputs = Vec::with_capacity(references.len());
        for reference in &references {
            match self.resolve_input(reference) {
                Ok(value) => inputs.push(value),
                Err(err) => {
                    // The rule never ran; the node stays addressable and
                    // unrealized.
                    self.reset_node(idx);
                    let err = match err {
                        ModelError::NoRuleBound { .. } | ModelError::Config { .. } => {
                            ModelError::DanglingInput {
                                path: path.clone(),
                                rule: rule.name().to_string(),
                                input: reference.to_string(),
                            }
                        }
                        other => other,
                    };
                    return Err(err);
                }
            }
        }

        let mut ctx = RuleContext::new(
            path.clone(),
            self.shared.schema_store.clone(),
            self.shared.settings.immutable_after_realize,
        );
        if let Err(err) = rule.execute(&mut ctx, &inputs) {
            self.fail_node(idx, rule.name());
            return Err(ModelError::RuleFailed {
                path: path.clone(),
                rule: rule.name().to_string(),
                source: Box::new(err),
            });
        }

        let Some((instance, projections, immutable)) = ctx.into_parts() else {
            self.fail_node(idx, rule.name());
            return Err(ModelError::RuleFailed {
                path: path.clone(),
                rule: rule.name().to_string(),
                source: Box::new(ModelError::Config {
                    message: "rule staged no private instance".to_string(),
                }),
            });
        };

        let mut inner = self.shared.inner.lock().unwrap();
        let committed = inner.arena[idx].commit(instance, projections, immutable);
        self.shared.realized.notify_all();
        match committed {
            Ok(()) => {
                debug!(path = %path, "node realized");
                Self::default_view(&self.shared, &inner, idx)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Realize several paths, fanning independent subtrees out across the
    /// rayon pool. Per-node coalescing keeps overlapping requests safe.
    pub fn realize_many(&self, paths: &[ModelPath]) -> Vec<ModelResult<ModelView>> {
        paths.par_iter().map(|path| self.realize(path)).collect()
    }

    /// Lazy read access: realize on demand, then view.
    pub fn view_of(&self, path: &ModelPath) -> ModelResult<ModelView> {
        self.realize(path)
    }

    /// Lazy typed access through a compile-time tag.
    pub fn view_as<T: ManagedType>(&self, path: &ModelPath) -> ModelResult<TypedView<T>> {
        TypedView::new(self.realize(path)?)
    }

    /// Tear the registry down: every node transitions to Closed and all
    /// further realization or mutation attempts fail.
    #[instrument(level = "debug", skip(self))]
    pub fn close(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        inner.closed = true;
        for (_, node) in inner.arena.iter_mut() {
            node.close();
        }
        drop(inner);
        self.shared.realized.notify_all();
        debug!("registry closed");
    }

    /// Render the node hierarchy with realization states, one tree per root.
    pub fn render_tree(&self) -> Vec<Tree<String>> {
        let inner = self.shared.inner.lock().unwrap();
        let mut roots: Vec<Index> = inner
            .arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| idx)
            .collect();
        roots.sort_by(|a, b| inner.arena[*a].path().cmp(inner.arena[*b].path()));
        roots
            .iter()
            .map(|&idx| Self::render_node(&inner, idx, self.shared.settings.render_unrealized))
            .collect()
    }

    // ============================================================
    // INTERNALS
    // ============================================================

    fn ensure_node(inner: &mut Inner, path: &ModelPath) -> Index {
        let mut parent: Option<Index> = None;
        for prefix in path.prefixes() {
            let current = match inner.by_path.get(&prefix).copied() {
                Some(idx) => idx,
                None => {
                    let idx = inner.arena.insert(ModelNode::new(prefix.clone(), parent));
                    if let Some(parent_idx) = parent {
                        inner.arena[parent_idx].children.push(idx);
                    }
                    inner.by_path.insert(prefix.clone(), idx);
                    debug!(path = %prefix, "created unrealized node");
                    idx
                }
            };
            parent = Some(current);
        }
        match parent {
            Some(idx) => idx,
            // unreachable: a parsed path has at least one segment
            None => {
                let idx = inner.arena.insert(ModelNode::new(path.clone(), None));
                inner.by_path.insert(path.clone(), idx);
                idx
            }
        }
    }

    fn lookup_rule(inner: &Inner, path: &ModelPath) -> Option<Arc<dyn Rule>> {
        if let Some(rule) = inner.bindings.get(path) {
            return Some(rule.clone());
        }
        inner
            .subtree_bindings
            .iter()
            .filter(|(prefix, _)| prefix.is_ancestor_of(path))
            .max_by_key(|(prefix, _)| prefix.depth())
            .map(|(_, rule)| rule.clone())
    }

    /// DFS over the declared-input graph; reports a cycle before any rule in
    /// it executes.
    fn check_cycles(inner: &Inner, start: &ModelPath) -> ModelResult<()> {
        let mut stack = Vec::new();
        let mut done = HashSet::new();
        Self::visit_inputs(inner, start, &mut stack, &mut done)
    }

    fn visit_inputs(
        inner: &Inner,
        path: &ModelPath,
        stack: &mut Vec<ModelPath>,
        done: &mut HashSet<ModelPath>,
    ) -> ModelResult<()> {
        if done.contains(path) {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|p| p == path) {
            let chain = stack[pos..]
                .iter()
                .chain(std::iter::once(path))
                .map(ToString::to_string)
                .join(" -> ");
            return Err(ModelError::GraphCycle { chain });
        }
        if let Some(&idx) = inner.by_path.get(path) {
            if inner.arena[idx].state() == NodeState::Realized {
                done.insert(path.clone());
                return Ok(());
            }
        }
        let Some(rule) = Self::lookup_rule(inner, path) else {
            // missing bindings surface later as NoRuleBound / DanglingInput
            done.insert(path.clone());
            return Ok(());
        };
        stack.push(path.clone());
        for input in rule.declared_inputs() {
            if let InputReference::Node(next) = input {
                Self::visit_inputs(inner, &next, stack, done)?;
            }
        }
        stack.pop();
        done.insert(path.clone());
        Ok(())
    }

    fn resolve_input(&self, reference: &InputReference) -> ModelResult<InputValue> {
        match reference {
            InputReference::Node(path) => Ok(InputValue::Node(self.realize(path)?)),
            InputReference::Service(key) => {
                let services = self.shared.services.read().unwrap();
                services
                    .get(key)
                    .cloned()
                    .map(InputValue::Service)
                    .ok_or_else(|| ModelError::Config {
                        message: format!("service {} not registered", key),
                    })
            }
        }
    }

    fn reset_node(&self, idx: Index) {
        let mut inner = self.shared.inner.lock().unwrap();
        if let Some(node) = inner.arena.get_mut(idx) {
            node.reset_to_unrealized();
        }
        drop(inner);
        self.shared.realized.notify_all();
    }

    fn fail_node(&self, idx: Index, rule: &str) {
        let mut inner = self.shared.inner.lock().unwrap();
        if let Some(node) = inner.arena.get_mut(idx) {
            node.fail(rule);
        }
        drop(inner);
        self.shared.realized.notify_all();
    }

    fn default_view(
        shared: &Arc<RegistryShared>,
        inner: &Inner,
        idx: Index,
    ) -> ModelResult<ModelView> {
        let node = &inner.arena[idx];
        // first-registered projection is the default
        let projection =
            node.projections()
                .first()
                .cloned()
                .ok_or_else(|| ModelError::Config {
                    message: format!("node {} has no projections", node.path()),
                })?;
        let handle = NodeHandle {
            shared: shared.clone(),
            idx,
            path: node.path().clone(),
        };
        Ok(shared
            .proxy_factory
            .create_view(projection.schema(), projection.writable(), handle))
    }

    fn render_node(inner: &Inner, idx: Index, render_unrealized: bool) -> Tree<String> {
        let node = &inner.arena[idx];
        let label = format!("{} [{:?}]", node.path().name(), node.state());
        let mut children = node.children.clone();
        children.sort_by(|a, b| inner.arena[*a].path().cmp(inner.arena[*b].path()));
        let mut tree = Tree::new(label);
        for child_idx in children {
            let child = &inner.arena[child_idx];
            if !render_unrealized
                && child.state() == NodeState::Unrealized
                && child.children.is_empty()
            {
                continue;
            }
            tree.push(Self::render_node(inner, child_idx, render_unrealized));
        }
        tree
    }
}
