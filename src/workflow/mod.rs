//! Workflow definition, parsing, ordering and validation.
//!
//! A workflow is a list of typed nodes plus edges that copy a named output
//! handle of one node into a named input handle of another.

mod graph;
mod parser;
mod types;
mod validator;

pub use graph::{topological_sort, Graph, SortOutcome};
pub use parser::{parse_workflow, parse_workflow_file};
pub use types::*;
pub use validator::{lint_workflow, validate_workflow};
pub(crate) use validator::{cycle_error, validate_nodes};
