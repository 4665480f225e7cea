//! Execution engine for workflows.

mod executor;
mod result;

pub use executor::Executor;
pub use result::{ExecutionLog, ExecutionResult, ExecutionStatus, LogEntry, LogLevel, NodeOutputs};
