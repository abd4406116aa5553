//! Small fixed documents with fully known graphs.

use schemagraph_graph::{
    assemble, assemble_unflattened, extract::extract_entities, Anchor, EdgeKind, NodeOrigin,
    NodeType, SchemaSession,
};
use schemagraph_model::{Document, UNKNOWN_ENTITY_ID};
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    Document::from_value(value).expect("valid document")
}

#[test]
fn single_leaf_event() {
    let graph = assemble(&doc(json!({"events": [{"@id": "E1", "name": "E1"}]}))).unwrap();

    // The sentinel entity is always present; the event is the only event node.
    let events: Vec<_> = graph
        .nodes()
        .iter()
        .filter(|n| n.origin == NodeOrigin::Event)
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].node_type, NodeType::Child);
    assert!(graph.edges().is_empty());
}

#[test]
fn and_gate_with_undeclared_child() {
    let graph = assemble(&doc(json!({"events": [
        {"@id": "E1", "name": "E1", "children": ["E2"], "children_gate": "and"}
    ]})))
    .unwrap();

    let e2 = graph.node("E2").unwrap();
    assert_eq!(e2.node_type, NodeType::Child);
    assert_eq!(e2.origin, NodeOrigin::Placeholder);

    assert_eq!(graph.edges().len(), 1);
    let edge = &graph.edges()[0];
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("E1", "E2"));
    assert_eq!(edge.kind, EdgeKind::ChildOutlink);

    // E1 is the only source that is never a target.
    assert_eq!(graph.node("E1").unwrap().node_type, NodeType::Root);
    let unflattened = assemble_unflattened(&doc(json!({"events": [
        {"@id": "E1", "name": "E1", "children": ["E2"], "children_gate": "and"}
    ]})))
    .unwrap();
    assert_eq!(unflattened.nodes.get("E1").unwrap().node_type, NodeType::Parent);
}

#[test]
fn participant_entity_is_never_root() {
    let graph = assemble(&doc(json!({"events": [
        {"@id": "E1", "name": "E1",
         "entities": [{"@id": "X", "name": "thing"}],
         "participants": [{"@id": "P1", "roleName": "instrument", "entity": "X"}]}
    ]})))
    .unwrap();

    let edge = graph
        .edges()
        .iter()
        .find(|e| e.kind == EdgeKind::StepParticipant)
        .unwrap();
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("E1", "X"));
    assert_eq!(edge.name, "instrument");
    assert_eq!(graph.node("X").unwrap().node_type, NodeType::Entity);
}

#[test]
fn empty_document() {
    let document = doc(json!({"events": []}));

    let entities = extract_entities(document.entities().map(|(_, e)| e)).unwrap();
    assert_eq!(entities.len(), 1);
    assert!(entities.contains(UNKNOWN_ENTITY_ID));

    let graph = assemble(&document).unwrap();
    assert!(graph.nodes().iter().all(|n| n.origin != NodeOrigin::Event));
    assert!(graph.edges().is_empty());

    let mut session = SchemaSession::new();
    let view = session.load(document).unwrap();
    assert!(view.name.is_none());
    assert!(view.subgraph.nodes.is_empty());
}

#[test]
fn outlink_container_between_steps() {
    // Top -> [Start, Branches Outlinks]; the container fans Start's successors out.
    let graph = assemble(&doc(json!({"events": [
        {"@id": "Top", "name": "Top", "children": ["Start", "Fan", "A", "B"]},
        {"@id": "Start", "name": "Start", "outlinks": ["Fan"]},
        {"@id": "Fan", "name": "Branches Outlinks", "children": [], "outlinks": ["A", "B"]},
        {"@id": "A", "name": "A"},
        {"@id": "B", "name": "B"}
    ]})))
    .unwrap();

    assert!(graph.node("Fan").is_none());
    assert!(graph.dangling_edges().is_empty());

    // Top only reaches Fan through step_child, so Start is the single
    // in-source and fans out to every target.
    let to = |source: &str, target: &str| {
        graph
            .edges()
            .iter()
            .any(|e| e.source == source && e.target == target && e.kind == EdgeKind::ChildOutlink)
    };
    assert!(to("Start", "A"));
    assert!(to("Start", "B"));
    assert!(!to("Top", "A"));
    assert!(!to("Top", "B"));
}

#[test]
fn fresh_session_has_no_view() {
    let session = SchemaSession::new();
    assert!(session.subgraph(&Anchor::Root).is_err());
}
