//! Node registry - manages the built-in node types.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::types::{Node, NodeContext, NodeResult};
use super::{
    CodeNode, ConditionNode, DelayNode, HttpNode, InputNode, LoopNode, MergeNode, OutputNode,
    SplitNode, TransformNode,
};
use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Registry of available node types.
#[derive(Clone)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    /// Create a new registry with the built-in nodes.
    pub fn new() -> Self {
        Self::with_http(HttpNode::new())
    }

    /// Built-in nodes, with the `http` node configured from `http`.
    pub fn from_config(http: &HttpConfig) -> Self {
        Self::with_http(HttpNode::from_config(http))
    }

    fn with_http(http: HttpNode) -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(InputNode::new()));
        registry.register(Arc::new(OutputNode::new()));
        registry.register(Arc::new(TransformNode::new()));
        registry.register(Arc::new(ConditionNode::new()));
        registry.register(Arc::new(LoopNode::new()));
        registry.register(Arc::new(MergeNode::new()));
        registry.register(Arc::new(SplitNode::new()));
        registry.register(Arc::new(DelayNode::new()));
        registry.register(Arc::new(http));
        registry.register(Arc::new(CodeNode::new()));

        registry
    }

    /// Create an empty registry (for testing).
    pub fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register a node type, replacing any node with the same type name.
    pub fn register(&mut self, node: Arc<dyn Node>) {
        self.nodes.insert(node.node_type().to_string(), node);
    }

    /// Get a node by type name.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(node_type).cloned()
    }

    /// Check if a node type is registered.
    pub fn has(&self, node_type: &str) -> bool {
        self.nodes.contains_key(node_type)
    }

    /// Execute a node by type.
    pub async fn execute(
        &self,
        node_type: &str,
        config: &Value,
        ctx: &NodeContext,
    ) -> Result<NodeResult> {
        let node = self
            .get(node_type)
            .ok_or_else(|| Error::UnknownNodeType(node_type.to_string()))?;

        node.execute(config, ctx).await
    }

    /// List all registered node types, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Get descriptions of all registered nodes, sorted by type.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        let mut descriptions: Vec<(&str, &str)> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.description()))
            .collect();
        descriptions.sort_unstable_by_key(|(name, _)| *name);
        descriptions
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
