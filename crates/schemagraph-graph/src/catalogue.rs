//! Entity catalogue: one summary per declared entity, with the events that
//! declare it and the events whose participants use it.

use std::collections::HashMap;

use schemagraph_model::{Document, Entity};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub wd_node: Option<Value>,
    pub wd_label: Option<Value>,
    pub wd_description: Option<Value>,
    /// Names of the events declaring this entity.
    pub created_in: Vec<String>,
    /// Names of the events with a participant referencing this entity.
    pub participant_in: Vec<String>,
}

impl EntitySummary {
    fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            wd_node: entity.fields.get("wd_node").cloned(),
            wd_label: entity.fields.get("wd_label").cloned(),
            wd_description: entity.fields.get("wd_description").cloned(),
            created_in: Vec::new(),
            participant_in: Vec::new(),
        }
    }
}

/// Summaries in first-declaration order.
pub fn entity_catalogue(document: &Document) -> Vec<EntitySummary> {
    let mut summaries: Vec<EntitySummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (event, entity) in document.entities() {
        let slot = *index.entry(entity.id.as_str()).or_insert_with(|| {
            summaries.push(EntitySummary::from_entity(entity));
            summaries.len() - 1
        });
        push_unique(&mut summaries[slot].created_in, &event.name);
    }

    for (event, participant) in document.participants() {
        let Some(entity_id) = participant.entity.as_deref() else {
            continue;
        };
        if let Some(&slot) = index.get(entity_id) {
            push_unique(&mut summaries[slot].participant_in, &event.name);
        }
    }

    summaries
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
