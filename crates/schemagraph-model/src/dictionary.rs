//! The schema dictionary: which record fields are copied onto graph nodes.
//!
//! The table is pinned to an SDF revision. Keys a record carries that are not
//! listed for its record kind are dropped when a node is extended; that filter
//! is what keeps the rendered graph independent of ad-hoc annotations.

use serde::Serialize;

/// SDF revision the dictionary is written against.
pub const SDF_VERSION: &str = "3.0";

const EVENT_FIELDS: &[&str] = &[
    "@id",
    "name",
    "comment",
    "description",
    "aka",
    "qnode",
    "qlabel",
    "isSchema",
    "goal",
    "ta1explanation",
    "importance",
    "children_gate",
    "instanceOf",
    "probParent",
    "probChild",
    "probability",
    "liklihood",
    "wd_node",
    "wd_label",
    "wd_description",
    "modality",
    "participants",
    "privateData",
    "outlinks",
    "entities",
    "relations",
    "children",
    "optional",
    "repeatable",
];

const CHILDREN_FIELDS: &[&str] = &["child", "comment", "optional", "importance", "outlinks"];

const PRIVATE_DATA_FIELDS: &[&str] = &["@type", "template", "repeatable", "importance"];

const ENTITY_FIELDS: &[&str] = &[
    "name",
    "@id",
    "qnode",
    "qlabel",
    "centrality",
    "wd_node",
    "wd_label",
    "wd_description",
    "modality",
    "aka",
    "properties",
];

const PROPERTIES_FIELDS: &[&str] = &["property values"];

const RELATION_FIELDS: &[&str] = &[
    "name",
    "wd_node",
    "wd_label",
    "modality",
    "wd_description",
    "ta1ref",
    "relationSubject",
    "relationObject",
    "relationPredicate",
];

/// Record types the dictionary knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Event,
    Children,
    PrivateData,
    Entity,
    Properties,
    Relation,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Event,
        RecordKind::Children,
        RecordKind::PrivateData,
        RecordKind::Entity,
        RecordKind::Properties,
        RecordKind::Relation,
    ];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaDictionary;

impl SchemaDictionary {
    pub fn version(&self) -> &'static str {
        SDF_VERSION
    }

    pub fn fields(&self, kind: RecordKind) -> &'static [&'static str] {
        match kind {
            RecordKind::Event => EVENT_FIELDS,
            RecordKind::Children => CHILDREN_FIELDS,
            RecordKind::PrivateData => PRIVATE_DATA_FIELDS,
            RecordKind::Entity => ENTITY_FIELDS,
            RecordKind::Properties => PROPERTIES_FIELDS,
            RecordKind::Relation => RELATION_FIELDS,
        }
    }

    pub fn recognizes(&self, kind: RecordKind, key: &str) -> bool {
        self.fields(kind).contains(&key)
    }

    /// Every record kind with its fields, in `RecordKind::ALL` order.
    pub fn entries(&self) -> impl Iterator<Item = (RecordKind, &'static [&'static str])> + '_ {
        RecordKind::ALL.into_iter().map(|kind| (kind, self.fields(kind)))
    }
}
