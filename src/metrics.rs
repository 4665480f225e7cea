//! Execution metrics for weft.
//!
//! Recorded through the `metrics` facade; the embedding application decides
//! whether and how to export them by installing a recorder.
//!
//! ## Metrics
//!
//! ### Counters
//! - `weft_workflows_executed_total` - Workflow executions by status
//! - `weft_nodes_executed_total` - Node executions by node_type and status
//!
//! ### Histograms
//! - `weft_workflow_duration_seconds` - Workflow execution duration
//! - `weft_node_duration_seconds` - Node execution duration by node_type

use metrics::{counter, histogram};
use std::time::Duration;

// =============================================================================
// Workflow Metrics
// =============================================================================

/// Record a workflow execution.
pub fn record_workflow_execution(status: &str) {
    counter!(
        "weft_workflows_executed_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record workflow execution duration.
pub fn record_workflow_duration(duration: Duration) {
    histogram!("weft_workflow_duration_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Node Metrics
// =============================================================================

/// Record a node execution.
pub fn record_node_execution(node_type: &str, status: &str) {
    counter!(
        "weft_nodes_executed_total",
        "node_type" => node_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record node execution duration.
pub fn record_node_duration(duration: Duration, node_type: &str) {
    histogram!(
        "weft_node_duration_seconds",
        "node_type" => node_type.to_string()
    )
    .record(duration.as_secs_f64());
}
