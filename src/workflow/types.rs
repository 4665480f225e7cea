//! Workflow type definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete workflow definition: a graph of typed nodes wired by edges.
///
/// # Example YAML
///
/// ```yaml
/// name: greet
/// nodes:
///   - id: who
///     type: input
///     config:
///       defaultValue: world
///   - id: greeting
///     type: transform
///     config:
///       type: template
///       template: "hello {{input}}"
///   - id: out
///     type: output
/// edges:
///   - source: who
///     target: greeting
///   - source: greeting
///     target: out
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    /// Optional human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Nodes in declaration order; this order breaks ties in execution order
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A node in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID within this workflow
    pub id: String,

    /// Node type tag; selects the handler
    #[serde(rename = "type")]
    pub node_type: String,

    /// Handler-specific configuration
    #[serde(default = "empty_object")]
    pub config: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Directed data dependency between two node handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,

    /// Key read from the source node's output map
    #[serde(rename = "sourceHandle", default = "default_source_handle")]
    pub source_handle: String,

    /// Key written into the target node's input map
    #[serde(rename = "targetHandle", default = "default_target_handle")]
    pub target_handle: String,
}

fn default_source_handle() -> String {
    "output".to_string()
}

fn default_target_handle() -> String {
    "input".to_string()
}

/// Closed classification of node type tags.
///
/// Any tag that is not a built-in is treated as the name of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Input,
    Output,
    Transform,
    Condition,
    Loop,
    Merge,
    Split,
    Delay,
    Http,
    Code,
    Capability(String),
}

impl NodeKind {
    /// Every built-in kind, in documentation order.
    pub const BUILTIN: [NodeKind; 10] = [
        NodeKind::Input,
        NodeKind::Output,
        NodeKind::Transform,
        NodeKind::Condition,
        NodeKind::Loop,
        NodeKind::Merge,
        NodeKind::Split,
        NodeKind::Delay,
        NodeKind::Http,
        NodeKind::Code,
    ];

    pub fn from_type(node_type: &str) -> Self {
        match node_type {
            "input" => NodeKind::Input,
            "output" => NodeKind::Output,
            "transform" => NodeKind::Transform,
            "condition" => NodeKind::Condition,
            "loop" => NodeKind::Loop,
            "merge" => NodeKind::Merge,
            "split" => NodeKind::Split,
            "delay" => NodeKind::Delay,
            "http" => NodeKind::Http,
            "code" => NodeKind::Code,
            other => NodeKind::Capability(other.to_string()),
        }
    }

    /// The type tag this kind is written as.
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::Transform => "transform",
            NodeKind::Condition => "condition",
            NodeKind::Loop => "loop",
            NodeKind::Merge => "merge",
            NodeKind::Split => "split",
            NodeKind::Delay => "delay",
            NodeKind::Http => "http",
            NodeKind::Code => "code",
            NodeKind::Capability(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, NodeKind::Capability(_))
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    pub fn new(id: &str, node_type: &str, config: Value) -> Self {
        Self {
            id: id.to_string(),
            node_type: node_type.to_string(),
            config,
        }
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::from_type(&self.node_type)
    }
}

impl Edge {
    /// Edge using the default `output` -> `input` handles.
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: default_source_handle(),
            target_handle: default_target_handle(),
        }
    }

    pub fn with_handles(mut self, source_handle: &str, target_handle: &str) -> Self {
        self.source_handle = source_handle.to_string();
        self.target_handle = target_handle.to_string();
        self
    }
}

impl Workflow {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            name: None,
            description: None,
            nodes,
            edges,
        }
    }

    /// Get a node by ID.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Display name, falling back to a placeholder for anonymous workflows.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Ids of nodes whose type is `output`, in declaration order.
    pub fn output_node_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.kind() == NodeKind::Output)
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Get all node types used in this workflow.
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.nodes.iter().map(|n| n.node_type.as_str()).collect();
        types.sort();
        types.dedup();
        types
    }
}
