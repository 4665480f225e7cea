//! Loop node - turn an input into an indexed, bounded list of items.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{lenient_number, Node, NodeContext, NodeResult};
use crate::error::{Error, Result};

/// Hard ceiling on the number of items a loop emits.
pub const MAX_LOOP_ITERATIONS: usize = 1000;

const DEFAULT_MAX_ITERATIONS: f64 = 100.0;

/// Loop node implementation.
pub struct LoopNode;

impl LoopNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoopNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoopConfig {
    #[serde(default, deserialize_with = "lenient_number")]
    max_iterations: Option<f64>,
}

fn iteration_limit(max_iterations: Option<f64>) -> usize {
    let requested = max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
    if requested.is_nan() {
        return 0;
    }
    requested.clamp(0.0, MAX_LOOP_ITERATIONS as f64) as usize
}

fn to_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}

#[async_trait]
impl Node for LoopNode {
    fn node_type(&self) -> &str {
        "loop"
    }

    fn description(&self) -> &str {
        "Emit up to maxIterations indexed items (ceiling 1000)"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: LoopConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid loop config: {}", e)))?;

        let items = to_items(ctx.input("items").or_else(|| ctx.input("input")));
        let total = items.len();
        let limit = iteration_limit(config.max_iterations);

        let output: Vec<Value> = items
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, item)| json!({ "index": index, "item": item }))
            .collect();
        let count = output.len();

        Ok(NodeResult::with_metadata(
            json!({ "output": output, "count": count }),
            json!({ "total_items": total, "truncated": total > count }),
        ))
    }
}
