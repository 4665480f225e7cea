//! Node trait and context types.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Result of node execution.
#[derive(Debug, Clone)]
pub struct NodeResult {
    /// Output map stored under the node's id
    pub data: Value,
    /// Metadata (timing, status, etc.) recorded in the execution log
    pub metadata: Value,
}

impl NodeResult {
    /// Create a new result with just data.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            metadata: serde_json::json!({}),
        }
    }

    /// Create a result with data and metadata.
    pub fn with_metadata(data: Value, metadata: Value) -> Self {
        Self { data, metadata }
    }
}

/// Context passed to a node during execution.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    /// Execution ID
    pub execution_id: String,

    /// ID of the node being executed
    pub node_id: String,

    /// Declared `type` tag of the node
    pub node_type: String,

    /// Gathered inputs, keyed by target handle
    pub inputs: Map<String, Value>,
}

impl NodeContext {
    /// Create a new context.
    pub fn new(execution_id: &str, node_id: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            node_id: node_id.to_string(),
            ..Self::default()
        }
    }

    /// Set the node type tag.
    pub fn with_node_type(mut self, node_type: &str) -> Self {
        self.node_type = node_type.to_string();
        self
    }

    /// Set the gathered inputs.
    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set a single input handle.
    pub fn with_input(mut self, handle: &str, value: Value) -> Self {
        self.inputs.insert(handle.to_string(), value);
        self
    }

    /// Get one input handle. A `null` value counts as absent.
    pub fn input(&self, handle: &str) -> Option<&Value> {
        self.inputs.get(handle).filter(|v| !v.is_null())
    }

    /// The `input` handle if present and non-null, else the whole input map.
    pub fn primary_input(&self) -> Value {
        match self.input("input") {
            Some(value) => value.clone(),
            None => Value::Object(self.inputs.clone()),
        }
    }
}

/// Deserialize an optional number that may also be written as a numeric string.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde::Deserialize as _;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a number, got '{}'", s))),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Trait that all node types must implement.
#[async_trait]
pub trait Node: Send + Sync {
    /// Get the node type name (e.g., "http", "transform", "loop").
    fn node_type(&self) -> &str;

    /// Execute the node with the given configuration and context.
    ///
    /// # Arguments
    /// * `config` - Node-specific configuration from the workflow definition
    /// * `ctx` - Execution context with the gathered inputs
    ///
    /// # Returns
    /// The node's output map wrapped in NodeResult
    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult>;

    /// Get a description of this node type.
    fn description(&self) -> &str {
        "A workflow node"
    }
}
