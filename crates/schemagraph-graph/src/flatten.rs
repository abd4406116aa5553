//! Container flattening.
//!
//! A container is an event that only aggregates outlinks. It is removed and
//! its neighbours are wired to each other directly:
//!
//! - the hierarchical backbone survives as one `step_child` edge from the
//!   container's parent (source of an incoming `step_child`) to its
//!   `step_child` target,
//! - in-sources are the sources of the non-`step_child` incoming edges; the
//!   parent only contributes the backbone,
//! - a single in-source fans out to every former out-target,
//! - several (or zero) in-sources all point at the *first* out-target only.
//!
//! Containers are processed one at a time against the live edge list, so a
//! container that points at another container hands its sources on before the
//! second one is visited.

use tracing::debug;

use crate::primitives::{make_edge, Edge, EdgeKind};
use crate::registry::NodeRegistry;

/// Flatten every listed container; returns how many were removed.
pub fn flatten_containers(
    nodes: &mut NodeRegistry,
    edges: &mut Vec<Edge>,
    containers: &[String],
) -> usize {
    let mut removed = 0;
    for container in containers {
        if nodes.remove(container).is_none() {
            continue;
        }
        flatten_one(container, edges);
        removed += 1;
    }
    removed
}

fn flatten_one(container: &str, edges: &mut Vec<Edge>) {
    let mut in_sources: Vec<String> = Vec::new();
    let mut out_targets: Vec<String> = Vec::new();
    let mut parent_source: Option<String> = None;
    let mut parent_target: Option<String> = None;

    edges.retain(|edge| {
        let incoming = edge.target == container;
        let outgoing = edge.source == container;
        if incoming && !outgoing {
            if edge.kind == EdgeKind::StepChild {
                parent_source = Some(edge.source.clone());
            } else {
                push_unique(&mut in_sources, &edge.source);
            }
        } else if outgoing && !incoming {
            if edge.kind == EdgeKind::StepChild {
                parent_target = Some(edge.target.clone());
            }
            push_unique(&mut out_targets, &edge.target);
        }
        // Self-loops on the container go with it.
        !(incoming || outgoing)
    });

    if let (Some(source), Some(target)) = (&parent_source, &parent_target) {
        edges.push(make_edge(source, target, "", EdgeKind::StepChild));
    }

    if let [source] = in_sources.as_slice() {
        for target in &out_targets {
            edges.push(make_edge(source, target, "", EdgeKind::ChildOutlink));
        }
    } else if let Some(first) = out_targets.first() {
        for source in &in_sources {
            edges.push(make_edge(source, first, "", EdgeKind::ChildOutlink));
        }
    }

    debug!(
        container,
        in_sources = in_sources.len(),
        out_targets = out_targets.len(),
        "flattened container"
    );
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}
