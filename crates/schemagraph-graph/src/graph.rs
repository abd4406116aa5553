use serde::Serialize;

use crate::primitives::{Edge, Node, NodeType};
use crate::registry::NodeRegistry;

/// A classified graph: every pass has run, no containers remain.
///
/// Serializes as `{"nodes": {id: element, ...}, "edges": [element, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    nodes: NodeRegistry,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: NodeRegistry, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.node_type == NodeType::Root)
    }

    /// First root in document order.
    pub fn first_root(&self) -> Option<&Node> {
        self.roots().next()
    }

    /// Edges whose source or target has no node. Empty for any assembled graph.
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| !self.nodes.contains(&e.source) || !self.nodes.contains(&e.target))
            .collect()
    }
}
