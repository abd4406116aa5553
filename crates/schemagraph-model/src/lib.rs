//! Schemagraph schema model
//!
//! Typed view of an SDF event-schema document:
//! - `document`: events, entities, participants, relations (+ every unknown key,
//!   kept verbatim so the document can be echoed back unchanged),
//! - `dictionary`: the fixed, versioned table of fields that are merged onto
//!   graph nodes,
//! - `error`: the model error type.
//!
//! The graph compiler (`schemagraph-graph`) and the offline renumbering tool
//! (`schemagraph-renumber`) both read ids and cross-references through this
//! crate, so they agree on which fields are references.

pub mod dictionary;
pub mod document;
pub mod error;

pub use dictionary::{RecordKind, SchemaDictionary, SDF_VERSION};
pub use document::{
    ChildRecord, ChildRef, Document, Entity, Event, Gate, Participant, Relation, Record,
    UNKNOWN_ENTITY_ID, UNKNOWN_ENTITY_NAME,
};
pub use error::{ModelError, Result};
