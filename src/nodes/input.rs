//! Input node - entry point that exposes a value to the graph.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::types::{Node, NodeContext, NodeResult};
use crate::error::{Error, Result};

/// Input node implementation.
pub struct InputNode;

impl InputNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InputNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputConfig {
    /// Used when no `value` handle is wired in
    #[serde(default)]
    default_value: Option<Value>,
    /// `json` parses string values, keeping the raw string when parsing fails
    #[serde(default)]
    input_type: Option<String>,
}

#[async_trait]
impl Node for InputNode {
    fn node_type(&self) -> &str {
        "input"
    }

    fn description(&self) -> &str {
        "Expose a supplied value or a configured default as output"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: InputConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid input config: {}", e)))?;

        let mut value = ctx
            .input("value")
            .cloned()
            .or(config.default_value)
            .unwrap_or(Value::Null);

        if config.input_type.as_deref() == Some("json") {
            if let Value::String(raw) = &value {
                match serde_json::from_str::<Value>(raw) {
                    Ok(parsed) => value = parsed,
                    Err(e) => debug!(node_id = %ctx.node_id, "Keeping raw string input: {}", e),
                }
            }
        }

        Ok(NodeResult::new(json!({ "output": value })))
    }
}
