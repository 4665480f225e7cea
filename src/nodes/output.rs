//! Output node - marks a final result of the workflow.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::{Node, NodeContext, NodeResult};
use crate::error::Result;

/// Output node implementation.
pub struct OutputNode;

impl OutputNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OutputNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for OutputNode {
    fn node_type(&self) -> &str {
        "output"
    }

    fn description(&self) -> &str {
        "Collect a final workflow result"
    }

    async fn execute(&self, _config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        Ok(NodeResult::new(json!({ "result": ctx.primary_input() })))
    }
}
