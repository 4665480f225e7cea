//! Code node - evaluate an expression against the node's inputs.
//!
//! Only the `expression` language is accepted; there is no general-purpose
//! script execution.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{Node, NodeContext, NodeResult};
use crate::error::{Error, Result};
use crate::expression::evaluate;

/// Code node implementation.
pub struct CodeNode;

impl CodeNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodeNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CodeConfig {
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    code: String,
}

fn default_language() -> String {
    "expression".to_string()
}

#[async_trait]
impl Node for CodeNode {
    fn node_type(&self) -> &str {
        "code"
    }

    fn description(&self) -> &str {
        "Evaluate an expression over the inputs"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: CodeConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid code config: {}", e)))?;

        if config.language != "expression" {
            return Err(Error::Unsupported(format!(
                "code language '{}' (only 'expression' is available)",
                config.language
            )));
        }

        let output = evaluate(&config.code, &ctx.inputs);
        Ok(NodeResult::new(json!({ "output": output })))
    }
}
