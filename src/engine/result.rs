//! Execution results and the per-execution log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::error::{Error, ErrorKind};

/// Outputs keyed by node id.
pub type NodeOutputs = Map<String, Value>;

/// Terminal state of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    TimedOut,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One line of the execution log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Seconds since the execution started
    pub elapsed_seconds: f64,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Append-only log for a single execution.
///
/// Every entry is also emitted as a `tracing` event at the same level.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    execution_id: String,
    started: Instant,
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new(execution_id: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    pub fn debug(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Debug, message.into(), data);
    }

    pub fn info(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Info, message.into(), data);
    }

    pub fn warn(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Warn, message.into(), data);
    }

    pub fn error(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Error, message.into(), data);
    }

    fn push(&mut self, level: LogLevel, message: String, data: Option<Value>) {
        let execution_id = self.execution_id.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(execution_id, "{}", message),
            LogLevel::Info => tracing::info!(execution_id, "{}", message),
            LogLevel::Warn => tracing::warn!(execution_id, "{}", message),
            LogLevel::Error => tracing::error!(execution_id, "{}", message),
        }

        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
            level,
            message,
            data,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ExecutionLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

/// Outcome of one call to [`crate::engine::Executor::execute`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub status: ExecutionStatus,
    pub execution_id: String,
    /// Outputs of `output` nodes keyed by node id, or `{result: <last output>}`
    pub outputs: Map<String, Value>,
    /// Every node output produced, keyed by node id
    pub all_outputs: NodeOutputs,
    /// Wall-clock seconds
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_node: Option<String>,
    /// Node outputs up to the failure point, for runs that started and stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_outputs: Option<NodeOutputs>,
    /// Topological order that was computed (empty when ordering failed)
    pub order: Vec<String>,
    pub log: ExecutionLog,
}

impl ExecutionResult {
    pub(crate) fn completed(
        execution_id: String,
        outputs: Map<String, Value>,
        all_outputs: NodeOutputs,
        order: Vec<String>,
        execution_time: f64,
        log: ExecutionLog,
    ) -> Self {
        Self {
            success: true,
            status: ExecutionStatus::Completed,
            execution_id,
            outputs,
            all_outputs,
            execution_time,
            error: None,
            error_kind: None,
            error_code: None,
            failed_node: None,
            partial_outputs: None,
            order,
            log,
        }
    }

    /// A run that never executed a node.
    pub(crate) fn rejected(
        execution_id: String,
        error: &Error,
        execution_time: f64,
        log: ExecutionLog,
    ) -> Self {
        Self {
            success: false,
            status: ExecutionStatus::Failed,
            execution_id,
            outputs: Map::new(),
            all_outputs: Map::new(),
            execution_time,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            error_code: Some(error.code().to_string()),
            failed_node: error.node_id().map(str::to_string),
            partial_outputs: None,
            order: Vec::new(),
            log,
        }
    }

    /// A run that started and stopped at a node failure or timeout.
    pub(crate) fn stopped(
        execution_id: String,
        error: &Error,
        node_outputs: NodeOutputs,
        order: Vec<String>,
        execution_time: f64,
        log: ExecutionLog,
    ) -> Self {
        let status = if error.kind() == ErrorKind::Timeout {
            ExecutionStatus::TimedOut
        } else {
            ExecutionStatus::Failed
        };
        Self {
            success: false,
            status,
            execution_id,
            outputs: Map::new(),
            all_outputs: node_outputs.clone(),
            execution_time,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            error_code: Some(error.code().to_string()),
            failed_node: error.node_id().map(str::to_string),
            partial_outputs: Some(node_outputs),
            order,
            log,
        }
    }

    /// Whether the run got past structural validation.
    pub fn started(&self) -> bool {
        !self.order.is_empty()
    }
}
