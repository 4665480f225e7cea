//! Dependency-free helpers shared by the node handlers.
//!
//! - [`path`]: dotted/indexed lookups into nested values
//! - [`evaluator`]: the small comparison/arithmetic language used by
//!   `condition`, `transform` and `code` nodes

pub mod evaluator;
pub mod path;

pub use evaluator::{evaluate, is_truthy};
pub use path::{extract, extract_from_map};
