//! Workflow validation.

use std::collections::{HashMap, HashSet};

use super::graph::{topological_sort, SortOutcome};
use super::types::Workflow;
use crate::error::{Error, Result};

/// Validate the structure of a workflow definition.
///
/// Checks for:
/// - At least one node
/// - Non-empty, unique node IDs
/// - Non-empty node types
/// - No circular dependencies (including self-loops)
///
/// Edges whose source is not a node are allowed: they may name a seed input
/// supplied at execution time.
pub fn validate_workflow(workflow: &Workflow) -> Result<()> {
    validate_nodes(workflow)?;

    if let SortOutcome::Cycle { blocked, .. } = topological_sort(&workflow.nodes, &workflow.edges)
    {
        return Err(cycle_error(&blocked));
    }

    Ok(())
}

/// Node-level checks only; the caller is expected to order the graph itself.
pub(crate) fn validate_nodes(workflow: &Workflow) -> Result<()> {
    if workflow.nodes.is_empty() {
        return Err(Error::Structural("Workflow has no nodes".into()));
    }

    let mut ids = HashSet::new();
    for node in &workflow.nodes {
        if node.id.is_empty() {
            return Err(Error::Structural("Node ID cannot be empty".into()));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(Error::Structural(format!("Duplicate node ID: {}", node.id)));
        }
        if node.node_type.is_empty() {
            return Err(Error::Structural(format!(
                "Node '{}' has empty type",
                node.id
            )));
        }
    }

    Ok(())
}

pub(crate) fn cycle_error(blocked: &[String]) -> Error {
    Error::Structural(format!(
        "Workflow contains a circular dependency involving: {}",
        blocked.join(", ")
    ))
}

/// Non-fatal findings about a workflow's wiring.
///
/// Reports edges that point at missing nodes (they are ignored at execution
/// time) and `(target, targetHandle)` pairs written by more than one edge
/// (the last edge in declaration order wins).
pub fn lint_workflow(workflow: &Workflow) -> Vec<String> {
    let ids: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut warnings = Vec::new();

    for edge in &workflow.edges {
        if !ids.contains(edge.target.as_str()) {
            warnings.push(format!(
                "Edge {} -> {} targets a node that does not exist",
                edge.source, edge.target
            ));
        }
        if !ids.contains(edge.source.as_str()) {
            warnings.push(format!(
                "Edge {} -> {} reads from '{}', which must be supplied as an input",
                edge.source, edge.target, edge.source
            ));
        }
    }

    let mut writers: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
    for edge in &workflow.edges {
        writers
            .entry((edge.target.as_str(), edge.target_handle.as_str()))
            .or_default()
            .push(edge.source.as_str());
    }
    let mut duplicates: Vec<_> = writers
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect();
    duplicates.sort();
    for ((target, handle), sources) in duplicates {
        warnings.push(format!(
            "Handle '{}' of node '{}' is written by {} edges ({}); the last one wins",
            handle,
            target,
            sources.len(),
            sources.join(", ")
        ));
    }

    warnings
}
