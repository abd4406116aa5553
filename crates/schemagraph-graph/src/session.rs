//! Editing session: the loaded document, its compiled graph, and the
//! mutations a viewer can request.
//!
//! Every structural mutation works on a copy of the document and swaps it in
//! together with the rebuilt graph, so a failed edit leaves the session as it
//! was. `update_fields` is the one field-only edit: it does not rebuild, and
//! callers re-fetch a view when they need the graph to reflect it.

use schemagraph_model::{Document, Entity, Event, Participant, Record, Relation};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::assemble::assemble;
use crate::catalogue::{entity_catalogue, EntitySummary};
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::subgraph::{extract_subgraph, Anchor, SubgraphView};

/// Keys whose values are coerced to booleans by `update_fields`.
const BOOLEAN_FIELDS: [&str; 3] = ["repeatable", "optional", "isSchema"];

#[derive(Debug, Clone)]
struct LoadedSchema {
    document: Document,
    graph: Graph,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaSession {
    loaded: Option<LoadedSchema>,
}

/// What `remove_element` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    pub event_removed: bool,
    pub children_removed: usize,
    pub outlinks_removed: usize,
}

impl RemovalSummary {
    pub fn is_empty(&self) -> bool {
        !self.event_removed && self.children_removed == 0 && self.outlinks_removed == 0
    }
}

impl SchemaSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session with `document` and return the root view.
    pub fn load(&mut self, document: Document) -> Result<SubgraphView> {
        let graph = assemble(&document)?;
        info!(
            events = document.events.len(),
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            "loaded schema document"
        );
        self.loaded = Some(LoadedSchema { document, graph });
        self.subgraph(&Anchor::Root)
    }

    pub fn load_json(&mut self, text: &str) -> Result<SubgraphView> {
        self.load(Document::from_json_str(text)?)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn document(&self) -> Result<&Document> {
        Ok(&self.state()?.document)
    }

    pub fn graph(&self) -> Result<&Graph> {
        Ok(&self.state()?.graph)
    }

    pub fn subgraph(&self, anchor: &Anchor) -> Result<SubgraphView> {
        extract_subgraph(&self.state()?.graph, anchor)
    }

    pub fn entity_catalogue(&self) -> Result<Vec<EntitySummary>> {
        Ok(entity_catalogue(&self.state()?.document))
    }

    // ------------------------------------------------------------------------
    // Field-only edit
    // ------------------------------------------------------------------------

    /// Overwrite fields on the event (or, failing that, the entity) with id
    /// `node_id`. `repeatable`, `optional` and `isSchema` are coerced to
    /// booleans; `id` is ignored. Afterwards every participant without an
    /// entity reference points at the sentinel entity.
    pub fn update_fields(&mut self, node_id: &str, updates: &Record) -> Result<&Document> {
        let loaded = self.loaded.as_mut().ok_or(GraphError::EmptyGraphState)?;
        let mut document = loaded.document.clone();

        if let Some(event) = document.event_mut(node_id) {
            let mut record = event.record()?;
            apply_updates(&mut record, updates);
            *event = Event::from_record(record)?;
        } else if let Some(entity) = document.entity_mut(node_id) {
            let mut record = entity.record()?;
            apply_updates(&mut record, updates);
            *entity = Entity::from_record(record)?;
        } else {
            warn!(node = node_id, "update target not found");
            return Err(GraphError::unknown("node", node_id));
        }

        let normalized = document.normalize_participants();
        info!(node = node_id, fields = updates.len(), normalized, "updated node fields");
        loaded.document = document;
        Ok(&loaded.document)
    }

    // ------------------------------------------------------------------------
    // Structural edits (rebuild the graph)
    // ------------------------------------------------------------------------

    /// Append `event` and list it as a child of `parent_id`.
    pub fn add_event(&mut self, event: Event, parent_id: &str) -> Result<&Document> {
        self.mutate_and_rebuild(|document| {
            if document.event(parent_id).is_none() {
                return Err(GraphError::unknown("event", parent_id));
            }
            let id = event.id.clone();
            document.events.push(event);
            if let Some(parent) = document.event_mut(parent_id) {
                parent.push_child(id.as_str());
            }
            info!(event = %id, parent = parent_id, "added event");
            Ok(())
        })?;
        self.document()
    }

    /// Delete the event `id` and strip it from every children and outlinks list.
    pub fn remove_element(&mut self, id: &str) -> Result<RemovalSummary> {
        self.mutate_and_rebuild(|document| {
            let mut summary = RemovalSummary::default();
            if let Some(pos) = document.events.iter().position(|e| e.id == id) {
                document.events.remove(pos);
                summary.event_removed = true;
            }
            for event in &mut document.events {
                if event.remove_child(id) {
                    summary.children_removed += 1;
                }
                if event.remove_outlink(id) {
                    summary.outlinks_removed += 1;
                }
            }
            if summary.is_empty() {
                return Err(GraphError::unknown("element", id));
            }
            info!(
                element = id,
                children = summary.children_removed,
                outlinks = summary.outlinks_removed,
                "removed element"
            );
            Ok(summary)
        })
    }

    pub fn add_entity(&mut self, event_id: &str, entity: Entity) -> Result<&Document> {
        self.mutate_and_rebuild(|document| {
            let event = document
                .event_mut(event_id)
                .ok_or_else(|| GraphError::unknown("event", event_id))?;
            info!(event = event_id, entity = %entity.id, "added entity");
            event.entities.get_or_insert_with(Vec::new).push(entity);
            Ok(())
        })?;
        self.document()
    }

    pub fn add_participant(&mut self, event_id: &str, participant: Participant) -> Result<&Document> {
        self.mutate_and_rebuild(|document| {
            let event = document
                .event_mut(event_id)
                .ok_or_else(|| GraphError::unknown("event", event_id))?;
            info!(event = event_id, participant = %participant.id, "added participant");
            event
                .participants
                .get_or_insert_with(Vec::new)
                .push(participant);
            Ok(())
        })?;
        self.document()
    }

    /// Add `to` to the outlinks of `from`; re-adding an existing outlink is a no-op.
    pub fn add_outlink(&mut self, from: &str, to: &str) -> Result<SubgraphView> {
        self.mutate_and_rebuild(|document| {
            let event = document
                .event_mut(from)
                .ok_or_else(|| GraphError::unknown("event", from))?;
            if event.push_outlink(to) {
                info!(from, to, "added outlink");
            }
            Ok(())
        })?;
        self.subgraph(&Anchor::Root)
    }

    /// Attach `relation` to the first event that declares `subject_id`.
    pub fn add_relation(&mut self, subject_id: &str, relation: Relation) -> Result<SubgraphView> {
        self.mutate_and_rebuild(|document| {
            let event = document
                .events
                .iter_mut()
                .find(|event| event.declares_entity(subject_id))
                .ok_or_else(|| GraphError::unknown("entity", subject_id))?;
            info!(event = %event.id, relation = %relation.id, "added relation");
            event.relations.get_or_insert_with(Vec::new).push(relation);
            Ok(())
        })?;
        self.subgraph(&Anchor::Root)
    }

    /// Remove the entity, its participants and every relation mentioning it.
    pub fn delete_entity(&mut self, entity_id: &str) -> Result<&Graph> {
        self.mutate_and_rebuild(|document| {
            let (mut entities, mut participants, mut relations) = (0, 0, 0);
            for event in &mut document.events {
                if let Some(list) = event.entities.as_mut() {
                    let before = list.len();
                    list.retain(|e| e.id != entity_id);
                    entities += before - list.len();
                }
                if let Some(list) = event.participants.as_mut() {
                    let before = list.len();
                    list.retain(|p| p.entity_id() != entity_id);
                    participants += before - list.len();
                }
                if let Some(list) = event.relations.as_mut() {
                    let before = list.len();
                    list.retain(|r| !r.mentions(entity_id));
                    relations += before - list.len();
                }
            }
            if entities + participants + relations == 0 {
                return Err(GraphError::unknown("entity", entity_id));
            }
            info!(entity = entity_id, entities, participants, relations, "deleted entity");
            Ok(())
        })?;
        self.graph()
    }

    fn state(&self) -> Result<&LoadedSchema> {
        self.loaded.as_ref().ok_or(GraphError::EmptyGraphState)
    }

    fn mutate_and_rebuild<T>(
        &mut self,
        edit: impl FnOnce(&mut Document) -> Result<T>,
    ) -> Result<T> {
        let loaded = self.loaded.as_mut().ok_or(GraphError::EmptyGraphState)?;
        let mut document = loaded.document.clone();
        let out = edit(&mut document).map_err(|err| {
            if matches!(err, GraphError::UnknownReference { .. }) {
                warn!(error = %err, "mutation target not found; document unchanged");
            }
            err
        })?;
        let graph = assemble(&document)?;
        *loaded = LoadedSchema { document, graph };
        Ok(out)
    }
}

fn apply_updates(record: &mut Record, updates: &Record) {
    for (key, value) in updates {
        if key == "id" {
            continue;
        }
        let value = if BOOLEAN_FIELDS.contains(&key.as_str()) {
            Value::Bool(coerce_bool(value))
        } else {
            value.clone()
        };
        record.insert(key.clone(), value);
    }
}

/// `"true"` and `true` are true; anything else is false.
fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}
