//! Merge node - fan several edges into one map.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::{Node, NodeContext, NodeResult};
use crate::error::Result;

/// Merge node implementation.
pub struct MergeNode;

impl MergeNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MergeNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for MergeNode {
    fn node_type(&self) -> &str {
        "merge"
    }

    fn description(&self) -> &str {
        "Combine every incoming handle into a single map"
    }

    async fn execute(&self, _config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        Ok(NodeResult::with_metadata(
            json!({ "output": Value::Object(ctx.inputs.clone()) }),
            json!({ "inputs_count": ctx.inputs.len() }),
        ))
    }
}
