//! Condition node - route a value to a `true` or `false` handle.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::types::{Node, NodeContext, NodeResult};
use crate::error::{Error, Result};
use crate::expression::{evaluate, is_truthy};

/// Condition node implementation.
pub struct ConditionNode;

impl ConditionNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConditionNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ConditionConfig {
    condition: String,
}

#[async_trait]
impl Node for ConditionNode {
    fn node_type(&self) -> &str {
        "condition"
    }

    fn description(&self) -> &str {
        "Evaluate an expression and emit the input on the true or false handle"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: ConditionConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid condition config: {}", e)))?;

        let value = ctx.primary_input();
        let mut scope = Map::new();
        scope.insert("input".to_string(), value.clone());
        scope.extend(ctx.inputs.clone());

        let outcome = is_truthy(&evaluate(&config.condition, &scope));
        let branch = if outcome { "true" } else { "false" };

        let mut data = Map::new();
        data.insert(branch.to_string(), value.clone());
        data.insert("output".to_string(), value);

        Ok(NodeResult::with_metadata(
            Value::Object(data),
            json!({ "condition_result": outcome }),
        ))
    }
}
