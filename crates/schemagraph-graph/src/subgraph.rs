//! Two-level subgraph views.
//!
//! A view starts at an anchor node, takes every edge leaving it, then, for
//! each node reached so far, adds the `child_outlink` edges leaving it (with
//! their targets) and the `relation` edges that stay inside the set. Nothing
//! deeper is visited.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::primitives::{Edge, EdgeKind, Node, NodeType};

/// Where a view starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The first node classified `root`, in document order.
    Root,
    Node(String),
}

impl Anchor {
    /// `"root"` selects the root sentinel; anything else is a node id.
    pub fn parse(id: &str) -> Self {
        if id == "root" {
            Anchor::Root
        } else {
            Anchor::Node(id.to_string())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A subgraph plus the anchor's display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubgraphView {
    pub name: Option<String>,
    pub subgraph: Subgraph,
}

pub fn extract_subgraph(graph: &Graph, anchor: &Anchor) -> Result<SubgraphView> {
    let (anchor_node, from_root) = match anchor {
        Anchor::Root => match graph.first_root() {
            Some(node) => (node, true),
            None => {
                warn!("graph has no root node; returning an empty view");
                return Ok(SubgraphView::default());
            }
        },
        Anchor::Node(id) => (
            graph.node(id).ok_or_else(|| GraphError::unknown("node", id))?,
            false,
        ),
    };

    let mut builder = ViewBuilder::new(graph);
    builder.add_node(&anchor_node.id);

    for (index, edge) in graph.edges().iter().enumerate() {
        if edge.source != anchor_node.id {
            continue;
        }
        let Some(target) = graph.node(&edge.target) else {
            continue;
        };
        // The root-level view shows events only.
        if from_root && target.node_type == NodeType::Entity {
            continue;
        }
        builder.add_edge(index);
        builder.add_node(&edge.target);
    }

    let level: Vec<String> = builder.node_ids.clone();
    let in_level: HashSet<&str> = level.iter().map(String::as_str).collect();
    for id in &level {
        for (index, edge) in graph.edges().iter().enumerate() {
            if edge.source != *id {
                continue;
            }
            match edge.kind {
                EdgeKind::ChildOutlink => {
                    builder.add_node(&edge.target);
                    builder.add_edge(index);
                }
                EdgeKind::Relation if in_level.contains(edge.target.as_str()) => {
                    builder.add_edge(index);
                }
                _ => {}
            }
        }
    }

    let name = anchor_node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| anchor_node.label.clone());
    Ok(SubgraphView {
        name: Some(name),
        subgraph: builder.finish(),
    })
}

struct ViewBuilder<'g> {
    graph: &'g Graph,
    node_ids: Vec<String>,
    seen_nodes: HashSet<String>,
    edge_indices: Vec<usize>,
    seen_edges: HashSet<usize>,
}

impl<'g> ViewBuilder<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            node_ids: Vec::new(),
            seen_nodes: HashSet::new(),
            edge_indices: Vec::new(),
            seen_edges: HashSet::new(),
        }
    }

    fn add_node(&mut self, id: &str) {
        if self.graph.node(id).is_some() && self.seen_nodes.insert(id.to_string()) {
            self.node_ids.push(id.to_string());
        }
    }

    fn add_edge(&mut self, index: usize) {
        if self.seen_edges.insert(index) {
            self.edge_indices.push(index);
        }
    }

    fn finish(self) -> Subgraph {
        let nodes = self
            .node_ids
            .iter()
            .filter_map(|id| self.graph.node(id).cloned())
            .collect();
        let edges = self
            .edge_indices
            .iter()
            .filter_map(|&i| self.graph.edges().get(i).cloned())
            .collect();
        Subgraph { nodes, edges }
    }
}
