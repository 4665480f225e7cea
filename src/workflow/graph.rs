//! Graph ordering: Kahn's algorithm over workflow nodes and edges.

use std::collections::{HashMap, VecDeque};

use super::types::{Edge, Node};

/// Outcome of ordering a node graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Every node, dependencies first. Empty for an empty node list.
    Sorted(Vec<String>),
    /// Some nodes could never reach in-degree zero.
    Cycle {
        /// Nodes that were ordered before the cycle blocked progress
        ordered: Vec<String>,
        /// Nodes stuck on or behind a cycle, in declaration order
        blocked: Vec<String>,
    },
}

/// Adjacency indices for a workflow graph.
///
/// Only edges whose endpoints are both nodes of the graph take part;
/// edges sourced from seed inputs carry data but impose no order.
#[derive(Debug, Clone)]
pub struct Graph<'w> {
    nodes: &'w [Node],
    incoming: HashMap<&'w str, Vec<&'w Edge>>,
    outgoing: HashMap<&'w str, Vec<&'w Edge>>,
}

impl<'w> Graph<'w> {
    pub fn new(nodes: &'w [Node], edges: &'w [Edge]) -> Self {
        let mut incoming: HashMap<&str, Vec<&Edge>> = HashMap::new();
        let mut outgoing: HashMap<&str, Vec<&Edge>> = HashMap::new();

        for node in nodes {
            incoming.entry(node.id.as_str()).or_default();
            outgoing.entry(node.id.as_str()).or_default();
        }

        for edge in edges {
            if let Some(list) = incoming.get_mut(edge.target.as_str()) {
                list.push(edge);
            }
            if let Some(list) = outgoing.get_mut(edge.source.as_str()) {
                list.push(edge);
            }
        }

        Self {
            nodes,
            incoming,
            outgoing,
        }
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.incoming.contains_key(node_id)
    }

    /// Edges into `node_id`, in edge declaration order (including seed-sourced edges).
    pub fn incoming(&self, node_id: &str) -> &[&'w Edge] {
        self.incoming
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Edges out of `node_id`, in edge declaration order.
    pub fn outgoing(&self, node_id: &str) -> &[&'w Edge] {
        self.outgoing
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Topologically order the nodes.
    ///
    /// The queue is seeded with zero in-degree nodes in declaration order, so
    /// the result is deterministic for a fixed input. A self-loop keeps its
    /// node at non-zero in-degree forever and is reported as a cycle.
    pub fn topological_sort(&self) -> SortOutcome {
        let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            let degree = self
                .incoming(&node.id)
                .iter()
                .filter(|e| self.contains(&e.source))
                .count();
            in_degree.insert(node.id.as_str(), degree);
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut ordered = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            ordered.push(id.to_string());
            for edge in self.outgoing(id) {
                if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(edge.target.as_str());
                    }
                }
            }
        }

        if ordered.len() < self.nodes.len() {
            let blocked = self
                .nodes
                .iter()
                .filter(|n| in_degree.get(n.id.as_str()).is_some_and(|d| *d > 0))
                .map(|n| n.id.clone())
                .collect();
            return SortOutcome::Cycle { ordered, blocked };
        }

        SortOutcome::Sorted(ordered)
    }
}

/// Order `nodes` by the dependencies expressed in `edges`.
pub fn topological_sort(nodes: &[Node], edges: &[Edge]) -> SortOutcome {
    Graph::new(nodes, edges).topological_sort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nodes(ids: &[&str]) -> Vec<Node> {
        ids.iter().map(|id| Node::new(id, "merge", json!({}))).collect()
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn test_empty_graph_is_sorted() {
        assert_eq!(topological_sort(&[], &[]), SortOutcome::Sorted(vec![]));
    }

    #[test]
    fn test_respects_every_edge() {
        let nodes = nodes(&["c", "a", "b", "d"]);
        let edges = vec![
            Edge::new("a", "b"),
            Edge::new("b", "c"),
            Edge::new("a", "c"),
            Edge::new("d", "c"),
        ];

        let SortOutcome::Sorted(order) = topological_sort(&nodes, &edges) else {
            panic!("expected a valid order");
        };

        assert_eq!(order.len(), 4);
        for edge in &edges {
            assert!(position(&order, &edge.source) < position(&order, &edge.target));
        }
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let nodes = nodes(&["z", "y", "x"]);
        let order = topological_sort(&nodes, &[]);
        assert_eq!(
            order,
            SortOutcome::Sorted(vec!["z".into(), "y".into(), "x".into()])
        );
    }

    #[test]
    fn test_two_node_cycle() {
        let nodes = nodes(&["x", "y"]);
        let edges = vec![Edge::new("x", "y"), Edge::new("y", "x")];

        match topological_sort(&nodes, &edges) {
            SortOutcome::Cycle { ordered, blocked } => {
                assert!(ordered.is_empty());
                assert_eq!(blocked, vec!["x".to_string(), "y".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let nodes = nodes(&["a", "b"]);
        let edges = vec![Edge::new("a", "b"), Edge::new("b", "b")];

        match topological_sort(&nodes, &edges) {
            SortOutcome::Cycle { ordered, blocked } => {
                assert_eq!(ordered, vec!["a".to_string()]);
                assert_eq!(blocked, vec!["b".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_seed_sourced_edges_do_not_block() {
        let nodes = nodes(&["a"]);
        let edges = vec![Edge::new("query", "a"), Edge::new("a", "elsewhere")];

        assert_eq!(
            topological_sort(&nodes, &edges),
            SortOutcome::Sorted(vec!["a".into()])
        );
        let graph = Graph::new(&nodes, &edges);
        assert_eq!(graph.incoming("a").len(), 1);
        assert_eq!(graph.outgoing("a").len(), 1);
    }

    #[test]
    fn test_parallel_edges_between_same_nodes() {
        let nodes = nodes(&["a", "b"]);
        let edges = vec![
            Edge::new("a", "b").with_handles("x", "x"),
            Edge::new("a", "b").with_handles("y", "y"),
        ];
        assert_eq!(
            topological_sort(&nodes, &edges),
            SortOutcome::Sorted(vec!["a".into(), "b".into()])
        );
    }
}
