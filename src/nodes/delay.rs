//! Delay node - pause execution for a bounded duration.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::types::{lenient_number, Node, NodeContext, NodeResult};
use crate::error::{Error, Result};

/// Longest pause a single delay node may take.
pub const MAX_DELAY_SECONDS: f64 = 30.0;

/// Delay node that pauses execution, then passes its inputs through.
pub struct DelayNode;

impl DelayNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DelayNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct DelayConfig {
    /// Duration to wait in seconds (can be fractional, e.g., 0.5 for 500ms)
    #[serde(default, deserialize_with = "lenient_number")]
    seconds: Option<f64>,
}

impl DelayConfig {
    fn seconds(&self) -> f64 {
        self.seconds.unwrap_or(1.0)
    }
}

/// Clamp a requested delay to `[0, MAX_DELAY_SECONDS]`.
fn clamp_delay(seconds: f64) -> Duration {
    if !seconds.is_finite() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(seconds.clamp(0.0, MAX_DELAY_SECONDS))
}

#[async_trait]
impl Node for DelayNode {
    fn node_type(&self) -> &str {
        "delay"
    }

    fn description(&self) -> &str {
        "Pause for up to 30 seconds, then pass inputs through"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: DelayConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid delay config: {}", e)))?;

        let wait = clamp_delay(config.seconds());
        if !wait.is_zero() {
            info!(
                "Delay node pausing for {}ms (execution: {})",
                wait.as_millis(),
                ctx.execution_id
            );
            tokio::time::sleep(wait).await;
        }

        Ok(NodeResult::with_metadata(
            Value::Object(ctx.inputs.clone()),
            json!({ "waited_ms": wait.as_millis() as u64 }),
        ))
    }
}
