//! Root classification.

use std::collections::HashSet;

use crate::primitives::{Edge, NodeType};
use crate::registry::NodeRegistry;

/// Mark as `root` every node that is some edge's source, no edge's target,
/// and not an entity. Returns the new roots in registry order.
pub fn classify_roots(nodes: &mut NodeRegistry, edges: &[Edge]) -> Vec<String> {
    let targets: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
    let sources: HashSet<&str> = edges.iter().map(|e| e.source.as_str()).collect();

    let roots: Vec<String> = nodes
        .iter()
        .filter(|node| node.node_type != NodeType::Entity)
        .filter(|node| sources.contains(node.id.as_str()))
        .filter(|node| !targets.contains(node.id.as_str()))
        .map(|node| node.id.clone())
        .collect();

    for id in &roots {
        if let Some(node) = nodes.get_mut(id) {
            node.node_type = NodeType::Root;
        }
    }
    roots
}
