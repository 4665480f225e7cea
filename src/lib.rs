//! weft - DAG workflow execution engine
//!
//! weft runs workflows described as a directed acyclic graph of typed nodes.
//! Edges copy a named output handle of one node into a named input handle of
//! another; nodes run one at a time in topological order.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same workflow and inputs produce the same outputs
//! - **Structured Results**: Every run returns an [`engine::ExecutionResult`]
//!   with outputs, partial outputs on failure and a per-execution log
//! - **Capabilities**: Unknown node types are dispatched to external
//!   capability services by name
//!
//! ## Example
//!
//! ```yaml
//! name: greet
//! nodes:
//!   - id: who
//!     type: input
//!     config:
//!       defaultValue: world
//!   - id: greeting
//!     type: transform
//!     config:
//!       type: template
//!       template: "Hello, {{ input }}!"
//!   - id: out
//!     type: output
//! edges:
//!   - source: who
//!     target: greeting
//!   - source: greeting
//!     target: out
//! ```

pub mod capabilities;
pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod metrics;
pub mod nodes;
pub mod workflow;

pub use engine::{ExecutionResult, ExecutionStatus, Executor};
pub use error::{Error, Result};
pub use workflow::{parse_workflow, parse_workflow_file, Workflow};
