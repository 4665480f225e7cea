//! Node implementations.
//!
//! Nodes are the building blocks of workflows. Each built-in type consumes
//! the gathered input map plus its configuration and returns an output map.
//! Types that are not built in are dispatched to [`CapabilityNode`].

mod capability;
mod code;
mod condition;
mod delay;
mod http;
mod input;
mod loop_node;
mod merge;
mod output;
mod registry;
mod split;
pub mod template;
mod transform;
mod types;

pub use capability::CapabilityNode;
pub use code::CodeNode;
pub use condition::ConditionNode;
pub use delay::{DelayNode, MAX_DELAY_SECONDS};
pub use http::HttpNode;
pub use input::InputNode;
pub use loop_node::{LoopNode, MAX_LOOP_ITERATIONS};
pub use merge::MergeNode;
pub use output::OutputNode;
pub use registry::NodeRegistry;
pub use split::SplitNode;
pub use transform::TransformNode;
pub use types::{Node, NodeContext, NodeResult};

#[cfg(test)]
pub(crate) use capability::tests::{test_registry, FakeClient};
