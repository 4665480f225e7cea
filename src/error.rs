//! Error types for weft.
//!
//! Errors form a closed set so callers can match on the kind of failure
//! instead of parsing message text. Every variant maps onto one of the
//! [`ErrorKind`] categories reported in an execution result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for weft operations.
pub type Result<T> = std::result::Result<T, Error>;

/// weft error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The workflow graph itself is unusable (no nodes, duplicate ids, cycles).
    #[error("Structural error: {0}")]
    Structural(String),

    /// A handler failed while executing a specific node.
    #[error("Node '{node_id}' failed: {source}")]
    NodeExecution {
        node_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// The capability is registered but its backing service is not loaded.
    #[error("Capability '{0}' is not available")]
    CapabilityUnavailable(String),

    /// The capability service answered with a client or server error.
    #[error("Capability '{name}' returned status {status}: {message}")]
    Capability {
        name: String,
        status: u16,
        message: String,
    },

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Workflow timed out after {elapsed_seconds:.3}s (limit {limit_seconds:.3}s)")]
    Timeout {
        elapsed_seconds: f64,
        limit_seconds: f64,
    },

    /// Handler-internal failure (bad configuration, bad input shape).
    #[error("Node error: {0}")]
    Node(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories surfaced in [`crate::engine::ExecutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Never started: the graph could not be ordered or was empty.
    Structural,
    /// Started and a node handler failed.
    NodeExecution,
    /// Started and a node referenced a capability that is not loaded.
    CapabilityUnavailable,
    /// Started and the wall-clock ceiling was exceeded.
    Timeout,
    /// Network-level failure talking to a remote service.
    Transport,
    /// Definition or configuration could not be loaded.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Structural => write!(f, "structural"),
            ErrorKind::NodeExecution => write!(f, "node_execution"),
            ErrorKind::CapabilityUnavailable => write!(f, "capability_unavailable"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Config => write!(f, "config"),
        }
    }
}

impl Error {
    /// Wrap a handler error with the id of the node that raised it.
    pub fn in_node(self, node_id: &str) -> Self {
        match self {
            already @ Error::NodeExecution { .. } => already,
            other => Error::NodeExecution {
                node_id: node_id.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through node wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::NodeExecution { source, .. } => source.root(),
            other => other,
        }
    }

    /// Id of the node this error is attributed to, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Error::NodeExecution { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    /// Classify into the execution result taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::Structural(_) => ErrorKind::Structural,
            Error::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Config(_) | Error::Parse(_) | Error::Yaml(_) | Error::Io(_) => {
                ErrorKind::Config
            }
            Error::NodeExecution { .. }
            | Error::UnknownNodeType(_)
            | Error::Capability { .. }
            | Error::Unsupported(_)
            | Error::Node(_)
            | Error::Json(_) => ErrorKind::NodeExecution,
        }
    }

    /// Get the error code for programmatic parsing.
    pub fn code(&self) -> &'static str {
        match self.root() {
            Error::Structural(_) => "STRUCTURAL_ERROR",
            Error::NodeExecution { .. } => "NODE_EXECUTION_ERROR",
            Error::UnknownNodeType(_) => "UNKNOWN_NODE_TYPE",
            Error::CapabilityUnavailable(_) => "CAPABILITY_UNAVAILABLE",
            Error::Capability { .. } => "CAPABILITY_ERROR",
            Error::Unsupported(_) => "UNSUPPORTED",
            Error::Timeout { .. } => "TIMEOUT",
            Error::Node(_) => "NODE_ERROR",
            Error::Transport(_) => "TRANSPORT_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}
