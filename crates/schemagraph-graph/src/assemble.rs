//! Event graph assembly.
//!
//! The full pipeline for a document is:
//!
//! 1. entity nodes + relation edges (`extract`),
//! 2. one pass over the events in document order (this module),
//! 3. container flattening (`flatten`),
//! 4. root classification (`classify`).
//!
//! `assemble_unflattened` stops after step 2 so the structural rewrites of
//! each event can be inspected before containers disappear.

use schemagraph_model::{Document, Event, Gate};
use tracing::debug;

use crate::classify::classify_roots;
use crate::error::Result;
use crate::extract::{ensure_entity, extract_entities, extract_relations};
use crate::flatten::flatten_containers;
use crate::graph::Graph;
use crate::primitives::{extend, make_edge, make_node, Edge, EdgeKind, NodeOrigin, NodeType, Shape};
use crate::registry::NodeRegistry;

/// Output of the event pass, before containers are flattened.
#[derive(Debug, Clone, Default)]
pub struct AssembledGraph {
    pub nodes: NodeRegistry,
    pub edges: Vec<Edge>,
    /// Ids classified `container`, in the order they were found.
    pub containers: Vec<String>,
}

/// Compile `document` into a classified graph.
pub fn assemble(document: &Document) -> Result<Graph> {
    let AssembledGraph {
        mut nodes,
        mut edges,
        containers,
    } = assemble_unflattened(document)?;

    let flattened = flatten_containers(&mut nodes, &mut edges, &containers);
    let roots = classify_roots(&mut nodes, &edges);
    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        containers = flattened,
        roots = roots.len(),
        "assembled schema graph"
    );

    Ok(Graph::new(nodes, edges))
}

pub fn assemble_unflattened(document: &Document) -> Result<AssembledGraph> {
    let mut graph = AssembledGraph {
        nodes: extract_entities(document.entities().map(|(_, entity)| entity))?,
        edges: extract_relations(document.relations())?,
        containers: Vec::new(),
    };

    for event in &document.events {
        graph.add_event(event)?;
    }

    // Relation endpoints may name events declared anywhere, so they are
    // resolved only once every event has its node.
    let endpoints: Vec<String> = graph
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Relation)
        .flat_map(|e| [e.source.clone(), e.target.clone()])
        .collect();
    for id in endpoints {
        ensure_entity(&mut graph.nodes, &id);
    }

    Ok(graph)
}

impl AssembledGraph {
    fn add_event(&mut self, event: &Event) -> Result<()> {
        let record = event.record()?;
        let label = match event_label(&event.name) {
            label if label.is_empty() => event.id.clone(),
            label => label,
        };

        // Shared id space: an entity or placeholder with this id is upgraded
        // to the event.
        let node = self.nodes.get_or_insert_with(&event.id, || {
            make_node(&event.id, &label, NodeType::Parent, Shape::Diamond)
        });
        node.label = label;
        node.origin = NodeOrigin::Event;
        node.node_type = NodeType::Parent;
        extend(node, &record);

        if !event.has_children_field() {
            node.node_type = NodeType::Child;
            node.shape = Shape::Ellipse;
        } else if node
            .name()
            .map(|name| name.to_lowercase().contains("outlinks"))
            .unwrap_or(false)
        {
            node.node_type = NodeType::Container;
            if !self.containers.contains(&event.id) {
                self.containers.push(event.id.clone());
            }
        } else {
            node.node_type = NodeType::Parent;
            node.shape = Shape::Diamond;
        }
        let repeatable = node.is_repeatable();

        if repeatable {
            self.edges
                .push(make_edge(&event.id, &event.id, "", EdgeKind::ChildOutlink));
        }

        for participant in event.participant_list() {
            let entity_id = participant.entity_id();
            ensure_entity(&mut self.nodes, entity_id);
            let mut edge = make_edge(
                &event.id,
                entity_id,
                &participant.role_name,
                EdgeKind::StepParticipant,
            );
            edge.record_id = Some(participant.id.clone());
            self.edges.push(edge);
        }

        if event.has_children_field() {
            self.add_children(event);
        }

        for outlink in event.outlink_list() {
            self.nodes.get_or_insert_with(outlink, || {
                make_node(outlink, &outlink_label(outlink), NodeType::Child, Shape::Ellipse)
                    .with_origin(NodeOrigin::Placeholder)
            });
            self.edges
                .push(make_edge(&event.id, outlink, "", EdgeKind::ChildOutlink));
        }

        Ok(())
    }

    fn add_children(&mut self, event: &Event) {
        let gate = event.gate();
        let gate_id = if gate == Gate::Xor {
            let id = format!("{}xor", event.id);
            self.nodes
                .insert(make_node(&id, "XOR", NodeType::Gate, Shape::Rectangle));
            Some(id)
        } else {
            None
        };

        for child in event.child_ids() {
            // An existing node keeps its classification.
            self.nodes.get_or_insert_with(child, || {
                make_node(child, child, NodeType::Child, Shape::Ellipse)
                    .with_origin(NodeOrigin::Placeholder)
            });

            match (gate, gate_id.as_deref()) {
                (Gate::Xor, Some(gate_id)) => {
                    self.edges
                        .push(make_edge(gate_id, child, "", EdgeKind::ChildOutlink));
                    // One event→gate edge per child; parallel duplicates are
                    // part of the rendered contract.
                    self.edges
                        .push(make_edge(&event.id, gate_id, "", EdgeKind::StepChild));
                }
                (Gate::And, _) => {
                    self.edges
                        .push(make_edge(&event.id, child, "", EdgeKind::ChildOutlink));
                }
                _ => {
                    self.edges
                        .push(make_edge(&event.id, child, "", EdgeKind::StepChild));
                }
            }
        }
    }
}

/// `"Events/20001/Disease_Outbreak-Start"` → `"Disease Outbreak Start"`.
pub fn event_label(name: &str) -> String {
    last_segment(name).replace(['_', '-'], " ")
}

/// Outlink placeholders drop underscores instead of spacing them.
pub fn outlink_label(id: &str) -> String {
    last_segment(id).replace('_', "")
}

fn last_segment(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemagraph_model::{Participant, UNKNOWN_ENTITY_ID};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn count(edges: &[Edge], source: &str, target: &str, kind: EdgeKind) -> usize {
        edges
            .iter()
            .filter(|e| e.source == source && e.target == target && e.kind == kind)
            .count()
    }

    #[test]
    fn labels_use_trailing_segment() {
        assert_eq!(event_label("Events/20001/Disease_Outbreak-Start"), "Disease Outbreak Start");
        assert_eq!(event_label("plain"), "plain");
        assert_eq!(outlink_label("Events/20002/Report_Case"), "ReportCase");
        assert_eq!(outlink_label("Events/20002/"), "");
    }

    #[test]
    fn empty_trailing_segment_labels_event_with_its_id() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "Events/1/", "name": "Events/1/"},
            {"@id": "Events/2/", "name": "Step", "children": ["Events/3/"]},
            {"@id": "Events/3/", "name": "Events/3/"}
        ]})))
        .unwrap();

        assert_eq!(g.nodes.get("Events/1/").unwrap().label, "Events/1/");
        // Created as a placeholder first, then upgraded by its declaration.
        assert_eq!(g.nodes.get("Events/3/").unwrap().label, "Events/3/");
        assert_eq!(g.nodes.get("Events/2/").unwrap().label, "Step");
    }

    #[test]
    fn classification_follows_children_field_and_name() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "p", "name": "Parent", "children": []},
            {"@id": "c", "name": "Leaf"},
            {"@id": "o", "name": "Step Outlinks", "children": []}
        ]})))
        .unwrap();

        assert_eq!(g.nodes.get("p").unwrap().node_type, NodeType::Parent);
        assert_eq!(g.nodes.get("p").unwrap().shape, Shape::Diamond);
        assert_eq!(g.nodes.get("c").unwrap().node_type, NodeType::Child);
        assert_eq!(g.nodes.get("c").unwrap().shape, Shape::Ellipse);
        assert_eq!(g.nodes.get("o").unwrap().node_type, NodeType::Container);
        assert_eq!(g.containers, vec!["o".to_string()]);
    }

    #[test]
    fn xor_gate_emits_gate_node_and_parallel_edges() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "e", "name": "E", "children_gate": "xor", "children": ["a", "b", "c"]}
        ]})))
        .unwrap();

        let gate = g.nodes.get("exor").unwrap();
        assert_eq!(gate.node_type, NodeType::Gate);
        assert_eq!(gate.label, "XOR");
        assert_eq!(gate.shape, Shape::Rectangle);
        for child in ["a", "b", "c"] {
            assert_eq!(count(&g.edges, "exor", child, EdgeKind::ChildOutlink), 1);
        }
        assert_eq!(count(&g.edges, "e", "exor", EdgeKind::StepChild), 3);
    }

    #[test]
    fn and_gate_uses_child_outlinks_and_or_uses_step_child() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "and", "name": "And", "children_gate": "and", "children": ["x"]},
            {"@id": "or", "name": "Or", "children_gate": "weird", "children": ["y"]}
        ]})))
        .unwrap();
        assert_eq!(count(&g.edges, "and", "x", EdgeKind::ChildOutlink), 1);
        assert_eq!(count(&g.edges, "or", "y", EdgeKind::StepChild), 1);
        assert_eq!(g.nodes.get("x").unwrap().origin, NodeOrigin::Placeholder);
        assert_eq!(g.nodes.get("x").unwrap().label, "x");
    }

    #[test]
    fn placeholder_child_is_upgraded_by_later_event() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "p", "name": "P", "children": ["Events/2/Later_Step"]},
            {"@id": "Events/2/Later_Step", "name": "Events/2/Later_Step", "optional": true}
        ]})))
        .unwrap();
        let node = g.nodes.get("Events/2/Later_Step").unwrap();
        assert_eq!(node.origin, NodeOrigin::Event);
        assert_eq!(node.label, "Later Step");
        assert_eq!(node.node_type, NodeType::Child);
        assert!(node.optional);
    }

    #[test]
    fn existing_child_keeps_its_type() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "inner", "name": "Inner", "children": []},
            {"@id": "outer", "name": "Outer", "children": ["inner"]}
        ]})))
        .unwrap();
        assert_eq!(g.nodes.get("inner").unwrap().node_type, NodeType::Parent);
    }

    #[test]
    fn repeatable_adds_one_self_loop() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "r", "name": "R", "repeatable": true},
            {"@id": "p", "name": "P", "privateData": {"repeatable": true}},
            {"@id": "n", "name": "N", "repeatable": false}
        ]})))
        .unwrap();
        assert_eq!(count(&g.edges, "r", "r", EdgeKind::ChildOutlink), 1);
        assert_eq!(count(&g.edges, "p", "p", EdgeKind::ChildOutlink), 1);
        assert_eq!(count(&g.edges, "n", "n", EdgeKind::ChildOutlink), 0);
    }

    #[test]
    fn participants_resolve_or_fall_back_to_sentinel() {
        let mut d = doc(json!({"events": [
            {"@id": "e", "name": "E",
             "entities": [{"@id": "Entities/1/", "name": "person"}],
             "participants": [
                {"@id": "Participants/1/", "roleName": "victim", "entity": "Entities/1/"},
                {"@id": "Participants/2/", "roleName": "place", "entity": "Entities/9/"}
             ]}
        ]}));
        d.events[0]
            .participants
            .as_mut()
            .unwrap()
            .push(Participant::new("Participants/3/", "unknown", None));

        let g = assemble_unflattened(&d).unwrap();
        assert_eq!(count(&g.edges, "e", "Entities/1/", EdgeKind::StepParticipant), 1);
        assert_eq!(count(&g.edges, "e", "Entities/9/", EdgeKind::StepParticipant), 1);
        assert_eq!(count(&g.edges, "e", UNKNOWN_ENTITY_ID, EdgeKind::StepParticipant), 1);

        let placeholder = g.nodes.get("Entities/9/").unwrap();
        assert_eq!(placeholder.node_type, NodeType::Entity);
        assert_eq!(placeholder.origin, NodeOrigin::Placeholder);
        assert_eq!(g.nodes.get(UNKNOWN_ENTITY_ID).unwrap().label, "Entity");

        let victim = g
            .edges
            .iter()
            .find(|e| e.target == "Entities/1/")
            .unwrap();
        assert_eq!(victim.name, "victim");
        assert_eq!(victim.record_id.as_deref(), Some("Participants/1/"));
    }

    #[test]
    fn outlinks_create_placeholders() {
        let g = assemble_unflattened(&doc(json!({"events": [
            {"@id": "a", "name": "A", "outlinks": ["Events/7/Next_Step"]}
        ]})))
        .unwrap();
        let node = g.nodes.get("Events/7/Next_Step").unwrap();
        assert_eq!(node.label, "NextStep");
        assert_eq!(node.shape, Shape::Ellipse);
        assert_eq!(count(&g.edges, "a", "Events/7/Next_Step", EdgeKind::ChildOutlink), 1);
    }

    #[test]
    fn relation_endpoints_always_resolve() {
        let g = assemble(&doc(json!({"events": [
            {"@id": "e", "name": "E", "relations": [
                {"@id": "Relations/1/", "name": "rel", "relationSubject": "Entities/1/", "relationObject": "Entities/2/"}
            ]}
        ]})))
        .unwrap();
        assert!(g.dangling_edges().is_empty());
        assert_eq!(g.node("Entities/1/").unwrap().node_type, NodeType::Entity);
    }
}
