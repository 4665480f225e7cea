//! Split node - expose the keys of a map as separate output handles.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::{Node, NodeContext, NodeResult};
use crate::error::Result;

/// Split node implementation.
pub struct SplitNode;

impl SplitNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SplitNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for SplitNode {
    fn node_type(&self) -> &str {
        "split"
    }

    fn description(&self) -> &str {
        "Split a map input into one output handle per key"
    }

    async fn execute(&self, _config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let data = match ctx.input("input") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(other) => json!({ "output": other }),
            None => json!({ "output": null }),
        };
        Ok(NodeResult::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_split_map_into_handles() {
        let ctx = NodeContext::new("exec-1", "s").with_input("input", json!({"a": 1, "b": [2]}));
        let result = SplitNode::new().execute(&json!({}), &ctx).await.unwrap();
        assert_eq!(result.data, json!({"a": 1, "b": [2]}));
    }

    #[tokio::test]
    async fn test_split_wraps_non_map() {
        let ctx = NodeContext::new("exec-1", "s").with_input("input", json!([1, 2, 3]));
        let result = SplitNode::new().execute(&json!({}), &ctx).await.unwrap();
        assert_eq!(result.data, json!({"output": [1, 2, 3]}));
    }
}
