//! Concurrent realization: coalescing and independent subtrees

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use modelgraph::application::{
    InputReference, InputValue, ManagedRule, ModelResult, Rule, RuleContext,
};
use modelgraph::config::RegistrySettings;
use modelgraph::domain::{Access, ModelPath, NodeState, PropertyKind, SchemaDescriptor, Value};
use modelgraph::infrastructure::ServiceContainer;
use modelgraph::util::testing::init_test_setup;

/// Managed rule that dawdles long enough for callers to pile up.
struct SlowRule {
    base: ManagedRule,
    executions: Arc<AtomicUsize>,
}

impl SlowRule {
    fn new(type_name: &str) -> (Self, Arc<AtomicUsize>) {
        let executions = Arc::new(AtomicUsize::new(0));
        (
            Self {
                base: ManagedRule::new(type_name),
                executions: executions.clone(),
            },
            executions,
        )
    }
}

impl Rule for SlowRule {
    fn name(&self) -> &str {
        "slow-managed"
    }

    fn declared_inputs(&self) -> Vec<InputReference> {
        Vec::new()
    }

    fn execute(&self, ctx: &mut RuleContext, inputs: &[InputValue]) -> ModelResult<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        self.base.execute(ctx, inputs)
    }
}

fn widget_container() -> ServiceContainer {
    init_test_setup();
    let container = ServiceContainer::new(RegistrySettings::default());
    container.schema_store.register(
        SchemaDescriptor::new("Widget")
            .property("label", PropertyKind::String, Access::ReadWrite),
    );
    container
}

fn path(raw: &str) -> ModelPath {
    ModelPath::parse(raw).unwrap()
}

#[test]
fn given_concurrent_callers_when_realizing_one_node_then_rule_runs_once() {
    // Arrange
    let container = widget_container();
    let registry = container.registry.clone();
    let target = path("shared.widget");
    let (rule, executions) = SlowRule::new("Widget");
    registry.bind(&target, Arc::new(rule)).unwrap();

    // Act - two callers race for the same node
    let mut handles = Vec::new();
    for _ in 0..4 {
        let registry = registry.clone();
        let target = target.clone();
        handles.push(thread::spawn(move || {
            let view = registry.realize(&target).unwrap();
            view.get("label").unwrap()
        }));
    }
    let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Assert - coalesced: one execution, every caller observes the same state
    assert_eq!(executions.load(Ordering::SeqCst), 1);
    for value in &results {
        assert_eq!(value, &results[0]);
    }
    assert_eq!(registry.state_of(&target), Some(NodeState::Realized));
}

#[test]
fn given_independent_subtrees_when_realizing_many_then_all_resolve() {
    // Arrange - eight sibling subtrees, no ordering constraints between them
    let container = widget_container();
    let registry = &container.registry;
    let mut paths = Vec::new();
    let mut counters = Vec::new();
    for i in 0..8 {
        let node = path(&format!("subtree_{}.widget", i));
        let (rule, executions) = SlowRule::new("Widget");
        registry.bind(&node, Arc::new(rule)).unwrap();
        paths.push(node);
        counters.push(executions);
    }

    // Act
    let results = registry.realize_many(&paths);

    // Assert
    assert!(results.iter().all(Result::is_ok));
    for executions in &counters {
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn given_mixed_batch_when_realizing_many_then_failures_stay_local() {
    // Arrange - one unbound path in the middle of a healthy batch
    let container = widget_container();
    let registry = &container.registry;
    let good_a = path("good_a.widget");
    let good_b = path("good_b.widget");
    let (rule_a, _) = SlowRule::new("Widget");
    let (rule_b, _) = SlowRule::new("Widget");
    registry.bind(&good_a, Arc::new(rule_a)).unwrap();
    registry.bind(&good_b, Arc::new(rule_b)).unwrap();
    let batch = vec![good_a.clone(), path("unbound.widget"), good_b.clone()];

    // Act
    let results = registry.realize_many(&batch);

    // Assert - sibling failure does not poison the rest
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    assert_eq!(registry.state_of(&good_a), Some(NodeState::Realized));
    assert_eq!(registry.state_of(&good_b), Some(NodeState::Realized));
}

#[test]
fn given_shared_input_when_realizing_dependents_concurrently_then_input_runs_once() {
    // Arrange - two dependents declaring the same input node
    let container = widget_container();
    let registry = container.registry.clone();
    let common = path("common");
    let (common_rule, common_executions) = SlowRule::new("Widget");
    registry.bind(&common, Arc::new(common_rule)).unwrap();

    struct DependentRule {
        base: ManagedRule,
        dep: ModelPath,
    }
    impl Rule for DependentRule {
        fn name(&self) -> &str {
            "dependent"
        }
        fn declared_inputs(&self) -> Vec<InputReference> {
            vec![InputReference::Node(self.dep.clone())]
        }
        fn execute(&self, ctx: &mut RuleContext, inputs: &[InputValue]) -> ModelResult<()> {
            // the declared input arrives as a live view over a realized node
            let view = inputs[0].node()?;
            view.get("label")?;
            self.base.execute(ctx, inputs)
        }
    }

    let left = path("left");
    let right = path("right");
    for node in [&left, &right] {
        registry
            .bind(
                node,
                Arc::new(DependentRule {
                    base: ManagedRule::new("Widget"),
                    dep: common.clone(),
                }),
            )
            .unwrap();
    }

    // Act
    let results = registry.realize_many(&[left.clone(), right.clone()]);

    // Assert
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(common_executions.load(Ordering::SeqCst), 1);
}
