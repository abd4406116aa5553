//! SDF event-schema documents.
//!
//! Only the keys the graph engine reads are typed (`@id`, `name`, the
//! structural lists and the cross-reference fields). Every other key lands in
//! the record's `fields` map so a loaded document serializes back with nothing
//! lost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ModelError, Result};

/// Raw key/value view of a record, as it appears in the document.
pub type Record = Map<String, Value>;

/// Entity id that participants fall back to when they name no entity.
pub const UNKNOWN_ENTITY_ID: &str = "Entities/20000/";
pub const UNKNOWN_ENTITY_NAME: &str = "Entity";

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub events: Vec<Event>,
    #[serde(flatten)]
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_gate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlinks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<Relation>>,
    #[serde(flatten)]
    pub fields: Record,
}

/// An entry of an event's `children` list.
///
/// SDF 3.0 lists bare ids; older documents wrap each child in a record with
/// per-child metadata (`child`, `comment`, `optional`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildRef {
    Id(String),
    Record(ChildRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub child: String,
    #[serde(flatten)]
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "roleName")]
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(flatten)]
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "relationSubject")]
    pub subject: String,
    #[serde(rename = "relationObject")]
    pub object: String,
    #[serde(flatten)]
    pub fields: Record,
}

/// Branching semantics of an event's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gate {
    #[default]
    Or,
    Xor,
    And,
}

impl Gate {
    /// Unrecognized or absent gate tags fall back to `or`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("xor") => Self::Xor,
            Some("and") => Self::And,
            _ => Self::Or,
        }
    }
}

// ============================================================================
// Document
// ============================================================================

impl Document {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ModelError::malformed("document", e))?;
        Self::from_value(value)
    }

    /// Parse a document, naming the offending event when one is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(ModelError::malformed("document", "expected a JSON object"));
        };
        let raw_events = match fields.remove("events") {
            Some(Value::Array(events)) => events,
            Some(_) => return Err(ModelError::malformed("document", "`events` is not an array")),
            None => return Err(ModelError::malformed("document", "missing field `events`")),
        };

        let mut events = Vec::with_capacity(raw_events.len());
        for (idx, raw) in raw_events.into_iter().enumerate() {
            let context = match raw.get("@id").and_then(Value::as_str) {
                Some(id) => format!("event {id}"),
                None => format!("event #{idx}"),
            };
            let event: Event =
                serde_json::from_value(raw).map_err(|e| ModelError::malformed(context, e))?;
            events.push(event);
        }

        Ok(Self { events, fields })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ModelError::malformed("document", e))
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn event_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == id)
    }

    /// Every entity declaration, in document order, with its declaring event.
    pub fn entities(&self) -> impl Iterator<Item = (&Event, &Entity)> {
        self.events
            .iter()
            .flat_map(|event| event.entity_list().iter().map(move |entity| (event, entity)))
    }

    /// Every relation declaration, in document order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.events.iter().flat_map(|event| event.relation_list().iter())
    }

    pub fn participants(&self) -> impl Iterator<Item = (&Event, &Participant)> {
        self.events.iter().flat_map(|event| {
            event
                .participant_list()
                .iter()
                .map(move |participant| (event, participant))
        })
    }

    /// First declaration of the entity `id`, under any event.
    pub fn entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.events
            .iter_mut()
            .filter_map(|event| event.entities.as_mut())
            .flat_map(|entities| entities.iter_mut())
            .find(|entity| entity.id == id)
    }

    /// Point every participant without an entity reference at the sentinel
    /// entity. Returns how many participants were changed.
    pub fn normalize_participants(&mut self) -> usize {
        let mut changed = 0;
        for event in &mut self.events {
            for participant in event.participants.iter_mut().flatten() {
                if participant.entity.is_none() {
                    participant.entity = Some(UNKNOWN_ENTITY_ID.to_string());
                    changed += 1;
                }
            }
        }
        changed
    }
}

// ============================================================================
// Event
// ============================================================================

impl Event {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: None,
            children_gate: None,
            outlinks: None,
            entities: None,
            participants: None,
            relations: None,
            fields: Record::new(),
        }
    }

    /// The event as a flat key/value record (what node extension reads).
    pub fn record(&self) -> Result<Record> {
        into_record(serde_json::to_value(self), || format!("event {}", self.id))
    }

    pub fn from_record(record: Record) -> Result<Self> {
        let context = record_context("event", &record);
        serde_json::from_value(Value::Object(record)).map_err(|e| ModelError::malformed(context, e))
    }

    pub fn gate(&self) -> Gate {
        Gate::parse(self.children_gate.as_deref())
    }

    pub fn has_children_field(&self) -> bool {
        self.children.is_some()
    }

    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().flatten().map(ChildRef::id)
    }

    pub fn push_child(&mut self, id: impl Into<String>) {
        self.children
            .get_or_insert_with(Vec::new)
            .push(ChildRef::Id(id.into()));
    }

    /// Remove every child entry pointing at `id`; returns whether any was removed.
    pub fn remove_child(&mut self, id: &str) -> bool {
        let Some(children) = self.children.as_mut() else {
            return false;
        };
        let before = children.len();
        children.retain(|child| child.id() != id);
        children.len() != before
    }

    pub fn outlink_list(&self) -> &[String] {
        self.outlinks.as_deref().unwrap_or(&[])
    }

    pub fn has_outlink(&self, id: &str) -> bool {
        self.outlink_list().iter().any(|o| o == id)
    }

    /// Append `id` to the outlinks unless it is already there.
    pub fn push_outlink(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.has_outlink(&id) {
            return false;
        }
        self.outlinks.get_or_insert_with(Vec::new).push(id);
        true
    }

    pub fn remove_outlink(&mut self, id: &str) -> bool {
        let Some(outlinks) = self.outlinks.as_mut() else {
            return false;
        };
        let before = outlinks.len();
        outlinks.retain(|o| o != id);
        outlinks.len() != before
    }

    pub fn entity_list(&self) -> &[Entity] {
        self.entities.as_deref().unwrap_or(&[])
    }

    pub fn participant_list(&self) -> &[Participant] {
        self.participants.as_deref().unwrap_or(&[])
    }

    pub fn relation_list(&self) -> &[Relation] {
        self.relations.as_deref().unwrap_or(&[])
    }

    pub fn declares_entity(&self, id: &str) -> bool {
        self.entity_list().iter().any(|e| e.id == id)
    }
}

impl ChildRef {
    pub fn id(&self) -> &str {
        match self {
            ChildRef::Id(id) => id,
            ChildRef::Record(record) => &record.child,
        }
    }
}

// ============================================================================
// Entity / participant / relation
// ============================================================================

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Record::new(),
        }
    }

    pub fn record(&self) -> Result<Record> {
        into_record(serde_json::to_value(self), || format!("entity {}", self.id))
    }

    pub fn from_record(record: Record) -> Result<Self> {
        let context = record_context("entity", &record);
        serde_json::from_value(Value::Object(record)).map_err(|e| ModelError::malformed(context, e))
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl Participant {
    pub fn new(id: impl Into<String>, role_name: impl Into<String>, entity: Option<String>) -> Self {
        Self {
            id: id.into(),
            role_name: role_name.into(),
            entity,
            fields: Record::new(),
        }
    }

    /// The referenced entity, or the sentinel when none (or an empty id) is given.
    pub fn entity_id(&self) -> &str {
        match self.entity.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => UNKNOWN_ENTITY_ID,
        }
    }
}

impl Relation {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        subject: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subject: subject.into(),
            object: object.into(),
            fields: Record::new(),
        }
    }

    pub fn record(&self) -> Result<Record> {
        into_record(serde_json::to_value(self), || format!("relation {}", self.id))
    }

    /// `relationPredicate` if present, else the knowledge-base node, else "".
    pub fn predicate(&self) -> Value {
        self.fields
            .get("relationPredicate")
            .or_else(|| self.fields.get("wd_node"))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    pub fn mentions(&self, entity_id: &str) -> bool {
        self.subject == entity_id || self.object == entity_id
    }
}

fn into_record(
    value: serde_json::Result<Value>,
    context: impl FnOnce() -> String,
) -> Result<Record> {
    match value {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ModelError::malformed(context(), "record did not serialize to an object")),
        Err(e) => Err(ModelError::malformed(context(), e)),
    }
}

fn record_context(kind: &str, record: &Record) -> String {
    match record.get("@id").and_then(Value::as_str) {
        Some(id) => format!("{kind} {id}"),
        None => kind.to_string(),
    }
}
