//! Entity nodes and relation edges.

use schemagraph_model::{Entity, Relation, UNKNOWN_ENTITY_ID, UNKNOWN_ENTITY_NAME};
use tracing::debug;

use crate::error::Result;
use crate::primitives::{
    extend, extend_edge, make_edge, make_node, Edge, EdgeKind, Node, NodeOrigin, NodeType, Shape,
};
use crate::registry::NodeRegistry;

/// One entity node per distinct id (first declaration wins).
///
/// A document that declares no entities still gets the sentinel entity, so
/// participants without an entity reference always have a target.
pub fn extract_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Result<NodeRegistry> {
    let mut nodes = NodeRegistry::new();
    for entity in entities {
        if nodes.contains(&entity.id) {
            debug!(entity = %entity.id, "skipping duplicate entity declaration");
            continue;
        }
        let mut node = make_node(&entity.id, &entity.name, NodeType::Entity, Shape::Plain);
        extend(&mut node, &entity.record()?);
        nodes.insert(node);
    }

    if nodes.is_empty() {
        nodes.insert(sentinel_entity());
    }
    Ok(nodes)
}

/// One `relation` edge per relation record, subject → object.
pub fn extract_relations<'a>(
    relations: impl IntoIterator<Item = &'a Relation>,
) -> Result<Vec<Edge>> {
    let mut edges = Vec::new();
    for relation in relations {
        let mut edge = make_edge(
            &relation.subject,
            &relation.object,
            &relation.name,
            EdgeKind::Relation,
        );
        edge.record_id = Some(relation.id.clone());
        edge.predicate = Some(relation.predicate());
        extend_edge(&mut edge, &relation.record()?);
        edges.push(edge);
    }
    Ok(edges)
}

pub(crate) fn sentinel_entity() -> Node {
    make_node(UNKNOWN_ENTITY_ID, UNKNOWN_ENTITY_NAME, NodeType::Entity, Shape::Plain)
        .with_origin(NodeOrigin::Placeholder)
}

/// Make sure an entity-position reference resolves to some node.
pub(crate) fn ensure_entity(nodes: &mut NodeRegistry, id: &str) {
    if id == UNKNOWN_ENTITY_ID {
        nodes.get_or_insert_with(id, sentinel_entity);
    } else {
        nodes.get_or_insert_with(id, || {
            make_node(id, id, NodeType::Entity, Shape::Plain).with_origin(NodeOrigin::Placeholder)
        });
    }
}
