//! Transform node - reshape data with built-in operations.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::template::{render_template, Encoding};
use super::types::{Node, NodeContext, NodeResult};
use crate::error::{Error, Result};
use crate::expression::{evaluate, extract, is_truthy};

/// Transform node implementation.
pub struct TransformNode;

impl TransformNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TransformNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TransformConfig {
    #[serde(rename = "type", default = "default_type")]
    kind: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    initial: Option<Value>,
}

fn default_type() -> String {
    "passthrough".to_string()
}

impl TransformConfig {
    fn expression(&self) -> Result<&str> {
        self.expression.as_deref().ok_or_else(|| {
            Error::Node(format!(
                "Transform type '{}' requires an 'expression'",
                self.kind
            ))
        })
    }
}

#[async_trait]
impl Node for TransformNode {
    fn node_type(&self) -> &str {
        "transform"
    }

    fn description(&self) -> &str {
        "Transform data (passthrough, json_parse, json_stringify, extract, template, map, filter, reduce)"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: TransformConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid transform config: {}", e)))?;

        let input = ctx.primary_input();
        debug!(node_id = %ctx.node_id, kind = %config.kind, "Transforming input");

        let output = match config.kind.as_str() {
            "passthrough" => input,
            "json_parse" => match input {
                Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                other => other,
            },
            "json_stringify" => Value::String(serde_json::to_string(&input)?),
            "extract" => {
                let path = config.path.as_deref().ok_or_else(|| {
                    Error::Node("Transform type 'extract' requires a 'path'".to_string())
                })?;
                extract(&input, path).cloned().unwrap_or(Value::Null)
            }
            "template" => {
                let template = config.template.as_deref().unwrap_or_default();
                Value::String(render_template(template, &ctx.inputs, Encoding::Plain))
            }
            "map" => match input {
                Value::Array(items) => {
                    let expression = config.expression()?;
                    Value::Array(
                        items
                            .iter()
                            .enumerate()
                            .map(|(index, item)| {
                                evaluate(expression, &item_scope(&ctx.inputs, item, index, None))
                            })
                            .collect(),
                    )
                }
                other => other,
            },
            "filter" => match input {
                Value::Array(items) => {
                    let expression = config.expression()?;
                    Value::Array(
                        items
                            .into_iter()
                            .enumerate()
                            .filter(|(index, item)| {
                                let scope = item_scope(&ctx.inputs, item, *index, None);
                                is_truthy(&evaluate(expression, &scope))
                            })
                            .map(|(_, item)| item)
                            .collect(),
                    )
                }
                other => other,
            },
            "reduce" => match input {
                Value::Array(items) => {
                    let expression = config.expression()?;
                    let initial = config.initial.clone().unwrap_or_else(|| json!(0));
                    items.iter().enumerate().fold(initial, |acc, (index, item)| {
                        evaluate(expression, &item_scope(&ctx.inputs, item, index, Some(acc)))
                    })
                }
                other => other,
            },
            other => {
                return Err(Error::Node(format!(
                    "Unknown transform type '{}'",
                    other
                )))
            }
        };

        Ok(NodeResult::new(json!({ "output": output })))
    }
}

/// Scope for per-element expressions: the node's inputs plus `item`, `index`
/// and, for reduce, `acc`.
fn item_scope(
    inputs: &Map<String, Value>,
    item: &Value,
    index: usize,
    acc: Option<Value>,
) -> Map<String, Value> {
    let mut scope = inputs.clone();
    scope.insert("item".to_string(), item.clone());
    scope.insert("index".to_string(), json!(index));
    if let Some(acc) = acc {
        scope.insert("acc".to_string(), acc);
    }
    scope
}
