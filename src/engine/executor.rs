//! Workflow executor.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, Span};

use super::result::{ExecutionLog, ExecutionResult, NodeOutputs};
use crate::capabilities::{CapabilityClient, CapabilityRegistry, HttpCapabilityClient};
use crate::config::{CapabilitiesConfig, Config, ExecutorConfig};
use crate::error::{Error, Result};
use crate::metrics;
use crate::nodes::{CapabilityNode, Node, NodeContext, NodeRegistry, NodeResult};
use crate::workflow::{
    cycle_error, validate_nodes, Graph, Node as WorkflowNode, NodeKind, SortOutcome, Workflow,
};

/// Workflow executor.
///
/// Holds no per-execution state, so one executor can serve many concurrent
/// `execute` calls.
pub struct Executor {
    registry: NodeRegistry,
    capabilities: Arc<CapabilityRegistry>,
    capability_node: CapabilityNode,
    timeout: Duration,
    enforce_node_deadline: bool,
}

impl Executor {
    /// Create a new executor.
    ///
    /// Capability calls go over HTTP to the default capability base URL
    /// until [`Executor::with_capability_client`] replaces the transport.
    pub fn new(registry: NodeRegistry, capabilities: CapabilityRegistry) -> Self {
        let defaults = ExecutorConfig::default();
        let capabilities = Arc::new(capabilities);
        let client: Arc<dyn CapabilityClient> = Arc::new(HttpCapabilityClient::from_config(
            &CapabilitiesConfig::default(),
        ));
        Self {
            registry,
            capability_node: CapabilityNode::new(capabilities.clone(), client),
            capabilities,
            timeout: defaults.timeout(),
            enforce_node_deadline: defaults.enforce_node_deadline,
        }
    }

    /// Build an executor from loaded configuration.
    pub fn from_config(config: &Config, capabilities: CapabilityRegistry) -> Self {
        let client = Arc::new(HttpCapabilityClient::from_config(&config.capabilities));
        Self::new(NodeRegistry::from_config(&config.http), capabilities)
            .with_capability_client(client)
            .with_timeout(config.executor.timeout())
            .with_node_deadline(config.executor.enforce_node_deadline)
    }

    /// Set the wall-clock ceiling for a whole execution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the transport used for capability nodes.
    pub fn with_capability_client(mut self, client: Arc<dyn CapabilityClient>) -> Self {
        self.capability_node = CapabilityNode::new(self.capabilities.clone(), client);
        self
    }

    /// Also cancel a handler that runs past the remaining execution time.
    ///
    /// Off by default: the deadline is otherwise only checked between nodes.
    pub fn with_node_deadline(mut self, enforce: bool) -> Self {
        self.enforce_node_deadline = enforce;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Execute a workflow with the given seed inputs.
    ///
    /// Never returns an error: every failure is folded into the result.
    #[instrument(
        name = "workflow.execute",
        skip(self, workflow, inputs),
        fields(
            workflow_name = %workflow.display_name(),
            node_count = workflow.nodes.len(),
            execution_id = tracing::field::Empty,
        )
    )]
    pub async fn execute(&self, workflow: &Workflow, inputs: Map<String, Value>) -> ExecutionResult {
        let execution_id = uuid::Uuid::new_v4().to_string();
        Span::current().record("execution_id", execution_id.as_str());

        let start = Instant::now();
        let mut log = ExecutionLog::new(&execution_id);

        if let Err(e) = validate_nodes(workflow) {
            log.error(e.to_string(), Some(json!({ "error_code": e.code() })));
            return self.finish(ExecutionResult::rejected(
                execution_id,
                &e,
                start.elapsed().as_secs_f64(),
                log,
            ));
        }

        let graph = Graph::new(&workflow.nodes, &workflow.edges);
        let order = match graph.topological_sort() {
            SortOutcome::Sorted(order) => order,
            SortOutcome::Cycle { blocked, .. } => {
                let e = cycle_error(&blocked);
                log.error(e.to_string(), Some(json!({ "error_code": e.code() })));
                return self.finish(ExecutionResult::rejected(
                    execution_id,
                    &e,
                    start.elapsed().as_secs_f64(),
                    log,
                ));
            }
        };

        log.info(
            format!("Starting workflow '{}'", workflow.display_name()),
            Some(json!({
                "nodes": workflow.nodes.len(),
                "edges": workflow.edges.len(),
                "inputs": inputs.keys().collect::<Vec<_>>(),
            })),
        );

        let mut node_outputs = NodeOutputs::new();

        for node_id in &order {
            let elapsed = start.elapsed();
            if elapsed > self.timeout {
                let e = Error::Timeout {
                    elapsed_seconds: elapsed.as_secs_f64(),
                    limit_seconds: self.timeout.as_secs_f64(),
                };
                log.warn(
                    format!("{}; stopping before node '{}'", e, node_id),
                    Some(json!({ "completed_nodes": node_outputs.len() })),
                );
                return self.finish(ExecutionResult::stopped(
                    execution_id,
                    &e,
                    node_outputs,
                    order.clone(),
                    start.elapsed().as_secs_f64(),
                    log,
                ));
            }

            let Some(node) = workflow.get_node(node_id) else {
                continue;
            };

            let gathered = gather_inputs(&graph, node_id, &node_outputs, &inputs);
            let ctx = NodeContext::new(&execution_id, node_id)
                .with_node_type(&node.node_type)
                .with_inputs(gathered);

            log.debug(
                format!("Executing node '{}' [{}]", node_id, node.node_type),
                Some(json!({ "inputs": ctx.inputs.keys().collect::<Vec<_>>() })),
            );

            let node_start = Instant::now();
            let remaining = self.timeout.saturating_sub(elapsed);
            match self.dispatch(node, &ctx, remaining).await {
                Ok(result) => {
                    log.info(
                        format!("Node '{}' completed", node_id),
                        Some(json!({
                            "node_type": node.node_type,
                            "duration_ms": node_start.elapsed().as_millis() as u64,
                            "metadata": result.metadata,
                        })),
                    );
                    node_outputs.insert(node_id.clone(), result.data);
                }
                Err(e) => {
                    let e = e.in_node(node_id);
                    log.error(
                        e.to_string(),
                        Some(json!({
                            "node_type": node.node_type,
                            "error_code": e.code(),
                            "error_kind": e.kind(),
                        })),
                    );
                    return self.finish(ExecutionResult::stopped(
                        execution_id,
                        &e,
                        node_outputs,
                        order.clone(),
                        start.elapsed().as_secs_f64(),
                        log,
                    ));
                }
            }
        }

        let outputs = collect_outputs(workflow, &order, &node_outputs);
        let execution_time = start.elapsed().as_secs_f64();
        log.info(
            format!("Workflow completed in {:.3}s", execution_time),
            Some(json!({ "outputs": outputs.keys().collect::<Vec<_>>() })),
        );

        self.finish(ExecutionResult::completed(
            execution_id,
            outputs,
            node_outputs,
            order,
            execution_time,
            log,
        ))
    }

    /// Run one node's handler.
    ///
    /// Registered node types win; any other type is treated as a capability.
    #[instrument(
        name = "node.execute",
        skip(self, node, ctx, remaining),
        fields(
            node_id = %node.id,
            node_type = %node.node_type,
            execution_id = %ctx.execution_id,
        )
    )]
    async fn dispatch(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
        remaining: Duration,
    ) -> Result<NodeResult> {
        if let Some(handler) = self.registry.get(&node.node_type) {
            return self.timed(node, ctx, remaining, handler.as_ref()).await;
        }
        match node.kind() {
            NodeKind::Capability(_) => {
                self.timed(node, ctx, remaining, &self.capability_node)
                    .await
            }
            _ => Err(Error::UnknownNodeType(node.node_type.clone())),
        }
    }

    async fn timed(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
        remaining: Duration,
        handler: &dyn Node,
    ) -> Result<NodeResult> {
        let node_start = Instant::now();
        let outcome = if self.enforce_node_deadline {
            match timeout(remaining, handler.execute(&node.config, ctx)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    elapsed_seconds: (self.timeout.saturating_sub(remaining) + node_start.elapsed())
                        .as_secs_f64(),
                    limit_seconds: self.timeout.as_secs_f64(),
                }),
            }
        } else {
            handler.execute(&node.config, ctx).await
        };

        let status = match &outcome {
            Ok(_) => "success",
            Err(Error::Timeout { .. }) => "timeout",
            Err(_) => "failed",
        };
        metrics::record_node_execution(&node.node_type, status);
        metrics::record_node_duration(node_start.elapsed(), &node.node_type);
        debug!("Node '{}' finished with status {}", node.id, status);

        outcome
    }

    fn finish(&self, result: ExecutionResult) -> ExecutionResult {
        metrics::record_workflow_execution(&result.status.to_string());
        metrics::record_workflow_duration(Duration::from_secs_f64(result.execution_time));
        info!(
            execution_id = %result.execution_id,
            status = %result.status,
            "Execution finished in {:.3}s",
            result.execution_time
        );
        result
    }
}

/// Build a node's input map from its incoming edges.
///
/// Sources are looked up in node outputs first, then in the seed inputs.
/// When the source value is a map holding `sourceHandle`, that entry is
/// copied; otherwise the whole value is. Edges are applied in declaration
/// order, so the last edge into a handle wins.
fn gather_inputs(
    graph: &Graph<'_>,
    node_id: &str,
    node_outputs: &NodeOutputs,
    seed_inputs: &Map<String, Value>,
) -> Map<String, Value> {
    let mut gathered = Map::new();
    for edge in graph.incoming(node_id) {
        let Some(source) = node_outputs
            .get(&edge.source)
            .or_else(|| seed_inputs.get(&edge.source))
        else {
            debug!(
                "No value for edge {} -> {} (source not produced or supplied)",
                edge.source, edge.target
            );
            continue;
        };

        let value = match source {
            Value::Object(map) => map.get(&edge.source_handle).unwrap_or(source).clone(),
            other => other.clone(),
        };
        gathered.insert(edge.target_handle.clone(), value);
    }
    gathered
}

/// Outputs of `output` nodes keyed by id, or `{result: <last node's output>}`.
fn collect_outputs(
    workflow: &Workflow,
    order: &[String],
    node_outputs: &NodeOutputs,
) -> Map<String, Value> {
    let mut outputs = Map::new();
    for id in workflow.output_node_ids() {
        if let Some(value) = node_outputs.get(id) {
            outputs.insert(id.to_string(), value.clone());
        }
    }

    if workflow.output_node_ids().is_empty() {
        let last = order
            .last()
            .and_then(|id| node_outputs.get(id))
            .cloned()
            .unwrap_or(Value::Null);
        outputs.insert("result".to_string(), last);
    }
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionStatus;
    use crate::error::ErrorKind;
    use crate::nodes::{test_registry, FakeClient};
    use crate::workflow::{parse_workflow, Edge};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test node that counts calls and fails or sleeps on request.
    struct ProbeNode {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
        sleep: Duration,
    }

    impl ProbeNode {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
                sleep: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Node for ProbeNode {
        fn node_type(&self) -> &str {
            self.name
        }

        async fn execute(&self, _config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.sleep.is_zero() {
                tokio::time::sleep(self.sleep).await;
            }
            if self.fail {
                return Err(Error::Node("probe failure".to_string()));
            }
            Ok(NodeResult::new(json!({ "output": ctx.inputs.len() })))
        }
    }

    fn executor() -> Executor {
        Executor::new(NodeRegistry::new(), test_registry())
            .with_capability_client(Arc::new(FakeClient::new(200, json!({"text": "ok"}))))
    }

    fn node(id: &str, node_type: &str, config: Value) -> WorkflowNode {
        WorkflowNode::new(id, node_type, config)
    }

    fn seeds(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_input_transform_output_chain() {
        let workflow = Workflow::new(
            vec![
                node("in", "input", json!({"defaultValue": 5})),
                node("pass", "transform", json!({"type": "passthrough"})),
                node("out", "output", json!({})),
            ],
            vec![Edge::new("in", "pass"), Edge::new("pass", "out")],
        );

        let result = executor().execute(&workflow, Map::new()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(Value::Object(result.outputs), json!({"out": {"result": 5}}));
        assert_eq!(result.order, vec!["in", "pass", "out"]);
        assert_eq!(result.all_outputs.len(), 3);
        assert!(result.partial_outputs.is_none());
        assert!(!result.log.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_runs_no_nodes() {
        let mut registry = NodeRegistry::empty();
        let probe = ProbeNode::new("probe");
        let calls = probe.calls.clone();
        registry.register(Arc::new(probe));

        let workflow = Workflow::new(
            vec![node("X", "probe", json!({})), node("Y", "probe", json!({}))],
            vec![Edge::new("X", "Y"), Edge::new("Y", "X")],
        );
        let result = Executor::new(registry, CapabilityRegistry::new())
            .execute(&workflow, Map::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("circular dependency"));
        assert_eq!(result.error_kind, Some(ErrorKind::Structural));
        assert!(result.all_outputs.is_empty());
        assert!(result.partial_outputs.is_none());
        assert!(!result.started());
        assert_eq!(result.log.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_self_loop_is_rejected() {
        let workflow = Workflow::new(
            vec![node("a", "merge", json!({}))],
            vec![Edge::new("a", "a")],
        );
        let result = executor().execute(&workflow, Map::new()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("circular dependency"));
    }

    #[tokio::test]
    async fn test_condition_true_branch() {
        let workflow = Workflow::new(
            vec![node("check", "condition", json!({"condition": "input > 10"}))],
            vec![Edge::new("input", "check").with_handles("output", "input")],
        );

        let result = executor().execute(&workflow, seeds(json!({"input": 15}))).await;

        assert!(result.success, "{:?}", result.error);
        let check = &result.all_outputs["check"];
        assert_eq!(check["true"], json!(15));
        assert_eq!(check["output"], json!(15));
        assert!(check.get("false").is_none());
    }

    #[tokio::test]
    async fn test_unknown_node_type_fails_with_partial_outputs() {
        let workflow = Workflow::new(
            vec![
                node("start", "input", json!({"defaultValue": 1})),
                node("mystery", "frobnicate", json!({})),
                node("out", "output", json!({})),
            ],
            vec![Edge::new("start", "mystery"), Edge::new("mystery", "out")],
        );

        let result = executor().execute(&workflow, Map::new()).await;

        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.failed_node.as_deref(), Some("mystery"));
        assert!(result.error.as_deref().unwrap().contains("Unknown node type"));
        assert_eq!(result.error_code.as_deref(), Some("UNKNOWN_NODE_TYPE"));
        let partial = result.partial_outputs.as_ref().unwrap();
        assert_eq!(partial.len(), 1);
        assert!(partial.contains_key("start"));
        assert_eq!(
            result.log.entries().last().unwrap().level,
            crate::engine::LogLevel::Error
        );
    }

    #[tokio::test]
    async fn test_loop_default_iteration_limit() {
        let items: Vec<u32> = (1..=2000).collect();
        let workflow = Workflow::new(
            vec![node("each", "loop", json!({}))],
            vec![Edge::new("items", "each").with_handles("output", "items")],
        );

        let result = executor().execute(&workflow, seeds(json!({"items": items}))).await;

        assert!(result.success, "{:?}", result.error);
        let each = &result.all_outputs["each"];
        assert_eq!(each["output"].as_array().unwrap().len(), 100);
        assert_eq!(each["count"], 100);
    }

    #[tokio::test]
    async fn test_order_respects_edges() {
        let workflow = Workflow::new(
            vec![
                node("out", "output", json!({})),
                node("join", "merge", json!({})),
                node("b", "input", json!({"defaultValue": "b"})),
                node("a", "input", json!({"defaultValue": "a"})),
            ],
            vec![
                Edge::new("a", "join").with_handles("output", "left"),
                Edge::new("b", "join").with_handles("output", "right"),
                Edge::new("join", "out"),
            ],
        );

        let result = executor().execute(&workflow, Map::new()).await;
        assert!(result.success, "{:?}", result.error);

        let pos = |id: &str| result.order.iter().position(|x| x == id).unwrap();
        for edge in &workflow.edges {
            assert!(pos(&edge.source) < pos(&edge.target));
        }
        assert_eq!(
            result.outputs["out"],
            json!({"result": {"left": "a", "right": "b"}})
        );
    }

    #[tokio::test]
    async fn test_repeated_runs_produce_identical_outputs() {
        let source = r#"
nodes:
  - id: nums
    type: input
    config: { defaultValue: [3, 1, 4, 1, 5] }
  - id: big
    type: transform
    config: { type: filter, expression: "item > 1" }
  - id: total
    type: transform
    config: { type: reduce, expression: "acc + item" }
  - id: shout
    type: code
    config: { code: "total * 2" }
edges:
  - { source: nums, target: big }
  - { source: big, target: total }
  - { source: total, target: shout, targetHandle: total }
"#;
        let workflow = parse_workflow(source).unwrap();
        let exec = executor();

        let first = exec.execute(&workflow, Map::new()).await;
        let second = exec.execute(&workflow, Map::new()).await;

        assert!(first.success, "{:?}", first.error);
        assert_eq!(first.all_outputs, second.all_outputs);
        assert_eq!(first.outputs, second.outputs);
        assert_ne!(first.execution_id, second.execution_id);
        assert_eq!(Value::Object(first.outputs), json!({"result": {"output": 24}}));
    }

    #[tokio::test]
    async fn test_one_output_per_reached_node() {
        let mut registry = NodeRegistry::new();
        let mut failing = ProbeNode::new("explode");
        failing.fail = true;
        registry.register(Arc::new(failing));

        let workflow = Workflow::new(
            vec![
                node("a", "input", json!({"defaultValue": 1})),
                node("b", "merge", json!({})),
                node("boom", "explode", json!({})),
                node("never", "output", json!({})),
            ],
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "boom"),
                Edge::new("boom", "never"),
            ],
        );

        let result = Executor::new(registry, CapabilityRegistry::new())
            .execute(&workflow, Map::new())
            .await;

        assert_eq!(result.failed_node.as_deref(), Some("boom"));
        assert_eq!(result.error_kind, Some(ErrorKind::NodeExecution));
        let partial = result.partial_outputs.as_ref().unwrap();
        let keys: Vec<&String> = partial.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(result.all_outputs.len(), 2);
        assert!(result.started());
    }

    #[tokio::test]
    async fn test_edge_copies_only_source_handle() {
        let workflow = Workflow::new(
            vec![node("B", "merge", json!({}))],
            vec![Edge::new("A", "B").with_handles("x", "y")],
        );

        let result = executor()
            .execute(&workflow, seeds(json!({"A": {"x": 5, "z": 9}})))
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.all_outputs["B"], json!({"output": {"y": 5}}));
        assert!(!result.all_outputs.contains_key("A"));
    }

    #[tokio::test]
    async fn test_bare_source_value_is_copied_whole() {
        let workflow = Workflow::new(
            vec![node("m", "merge", json!({}))],
            vec![
                Edge::new("query", "m").with_handles("output", "q"),
                Edge::new("opts", "m").with_handles("limit", "o"),
            ],
        );

        let result = executor()
            .execute(
                &workflow,
                seeds(json!({"query": "rust", "opts": {"page": 2}})),
            )
            .await;

        assert_eq!(
            result.all_outputs["m"],
            json!({"output": {"q": "rust", "o": {"page": 2}}})
        );
    }

    #[tokio::test]
    async fn test_node_output_shadows_seed_with_same_name() {
        let workflow = Workflow::new(
            vec![
                node("a", "input", json!({"defaultValue": "from node"})),
                node("out", "output", json!({})),
            ],
            vec![Edge::new("a", "out")],
        );

        let result = executor()
            .execute(&workflow, seeds(json!({"a": {"output": "from seed"}})))
            .await;

        assert_eq!(result.outputs["out"], json!({"result": "from node"}));
    }

    #[tokio::test]
    async fn test_duplicate_target_handle_last_edge_wins() {
        let workflow = Workflow::new(
            vec![
                node("first", "input", json!({"defaultValue": 1})),
                node("second", "input", json!({"defaultValue": 2})),
                node("out", "output", json!({})),
            ],
            vec![Edge::new("first", "out"), Edge::new("second", "out")],
        );

        let result = executor().execute(&workflow, Map::new()).await;
        assert_eq!(result.outputs["out"], json!({"result": 2}));
    }

    #[tokio::test]
    async fn test_fallback_output_is_last_node() {
        let workflow = Workflow::new(
            vec![
                node("a", "input", json!({"defaultValue": [1, 2]})),
                node("b", "transform", json!({"type": "json_stringify"})),
            ],
            vec![Edge::new("a", "b")],
        );

        let result = executor().execute(&workflow, Map::new()).await;
        assert_eq!(
            Value::Object(result.outputs),
            json!({"result": {"output": "[1,2]"}})
        );
    }

    #[tokio::test]
    async fn test_unresolved_identifier_is_literal() {
        let workflow = Workflow::new(vec![node("c", "code", json!({"code": "foo"}))], vec![]);
        let result = executor().execute(&workflow, Map::new()).await;
        assert_eq!(result.all_outputs["c"], json!({"output": "foo"}));
    }

    #[tokio::test]
    async fn test_division_by_zero_is_zero() {
        let workflow = Workflow::new(
            vec![node("c", "code", json!({"code": "a / b"}))],
            vec![
                Edge::new("a", "c").with_handles("output", "a"),
                Edge::new("b", "c").with_handles("output", "b"),
            ],
        );
        let result = executor()
            .execute(&workflow, seeds(json!({"a": 10, "b": 0})))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.all_outputs["c"], json!({"output": 0}));
    }

    #[tokio::test]
    async fn test_empty_workflow_fails_with_single_log_entry() {
        let result = executor().execute(&Workflow::default(), Map::new()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("no nodes"));
        assert_eq!(result.error_kind, Some(ErrorKind::Structural));
        assert_eq!(result.log.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_node_ids_rejected() {
        let workflow = Workflow::new(
            vec![node("a", "merge", json!({})), node("a", "merge", json!({}))],
            vec![],
        );
        let result = executor().execute(&workflow, Map::new()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("Duplicate node ID"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_checked_between_nodes() {
        let workflow = Workflow::new(
            vec![
                node("wait", "delay", json!({"seconds": 2})),
                node("after", "merge", json!({})),
            ],
            vec![Edge::new("wait", "after")],
        );

        let result = executor()
            .with_timeout(Duration::from_secs(1))
            .execute(&workflow, Map::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
        assert!(result.failed_node.is_none());
        let partial = result.partial_outputs.as_ref().unwrap();
        assert!(partial.contains_key("wait"));
        assert!(!partial.contains_key("after"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_deadline_interrupts_handler() {
        let mut registry = NodeRegistry::new();
        let mut slow = ProbeNode::new("slow");
        slow.sleep = Duration::from_secs(60);
        registry.register(Arc::new(slow));

        let workflow = Workflow::new(vec![node("s", "slow", json!({}))], vec![]);
        let exec = Executor::new(registry, CapabilityRegistry::new())
            .with_timeout(Duration::from_secs(5))
            .with_node_deadline(true);

        let started = Instant::now();
        let result = exec.execute(&workflow, Map::new()).await;

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.failed_node.as_deref(), Some("s"));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_node_deadline_handler_overruns() {
        let mut registry = NodeRegistry::new();
        let mut slow = ProbeNode::new("slow");
        slow.sleep = Duration::from_secs(10);
        registry.register(Arc::new(slow));

        let workflow = Workflow::new(vec![node("s", "slow", json!({}))], vec![]);
        let result = Executor::new(registry, CapabilityRegistry::new())
            .with_timeout(Duration::from_secs(5))
            .execute(&workflow, Map::new())
            .await;

        assert!(result.success, "{:?}", result.error);
    }

    #[tokio::test]
    async fn test_capability_node_dispatch() {
        let client = Arc::new(FakeClient::new(200, json!({"text": "summary"})));
        let exec = Executor::new(NodeRegistry::new(), test_registry())
            .with_capability_client(client.clone());

        let workflow = Workflow::new(
            vec![
                node("doc", "input", json!({"defaultValue": "long text"})),
                node("sum", "language", json!({"params": {"max_tokens": 10}})),
                node("out", "output", json!({})),
            ],
            vec![
                Edge::new("doc", "sum").with_handles("output", "prompt"),
                Edge::new("sum", "out"),
            ],
        );

        let result = exec.execute(&workflow, Map::new()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.outputs["out"], json!({"result": {"text": "summary"}}));
        let request = client.last_request().unwrap();
        assert_eq!(request.params["prompt"], json!("long text"));
        assert_eq!(request.params["max_tokens"], json!(10));
    }

    #[tokio::test]
    async fn test_unavailable_capability_fails_node() {
        let workflow = Workflow::new(vec![node("pic", "image", json!({}))], vec![]);
        let result = executor().execute(&workflow, Map::new()).await;

        assert!(!result.success);
        assert_eq!(result.failed_node.as_deref(), Some("pic"));
        assert_eq!(result.error_kind, Some(ErrorKind::CapabilityUnavailable));
        assert!(result.error.as_deref().unwrap().contains("not available"));
    }

    #[tokio::test]
    async fn test_capability_error_status_fails_node() {
        let exec = Executor::new(NodeRegistry::new(), test_registry())
            .with_capability_client(Arc::new(FakeClient::new(500, json!({"message": "overloaded"}))));
        let workflow = Workflow::new(vec![node("gen", "language", json!({}))], vec![]);

        let result = exec.execute(&workflow, Map::new()).await;

        assert_eq!(result.failed_node.as_deref(), Some("gen"));
        assert_eq!(result.error_code.as_deref(), Some("CAPABILITY_ERROR"));
        assert!(result.error.as_deref().unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_result_serializes_to_json() {
        let workflow = Workflow::new(vec![node("a", "merge", json!({}))], vec![]);
        let result = executor().execute(&workflow, Map::new()).await;

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["status"], "completed");
        assert!(value["log"].is_array());
        assert!(value.get("error").is_none());
        assert_eq!(value["order"], json!(["a"]));
    }
}
