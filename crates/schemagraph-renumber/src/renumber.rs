use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};
use schemagraph_model::{ChildRef, Document};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RenumberError, Result};
use crate::mapping::{IdClass, IdMapping};

/// Canonical id layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenumberOptions {
    /// Prefix every new id carries (added when missing).
    pub namespace: String,
    /// Zero-padded width of the numeric segment.
    pub width: usize,
}

impl Default for RenumberOptions {
    fn default() -> Self {
        Self {
            namespace: "resin:".to_string(),
            width: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renumberer {
    options: RenumberOptions,
    digits: Regex,
}

impl Renumberer {
    pub fn new(options: RenumberOptions) -> Result<Self> {
        Ok(Self {
            options,
            digits: Regex::new(r"\d+")?,
        })
    }

    /// Canonical form of `old` for sequence number `number`: the first run of
    /// digits becomes the zero-padded number, the namespace is prepended if
    /// missing, and spaces in the last path segment become underscores.
    pub fn canonical_id(&self, old: &str, number: usize) -> String {
        let padded = format!("{number:0width$}", width = self.options.width);
        let replaced = self.digits.replacen(old, 1, NoExpand(&padded));
        let namespaced = if replaced.starts_with(&self.options.namespace) {
            replaced.into_owned()
        } else {
            format!("{}{}", self.options.namespace, replaced)
        };
        match namespaced.rsplit_once('/') {
            Some((head, last)) => format!("{head}/{}", last.replace(' ', "_")),
            None => namespaced,
        }
    }

    /// Rewrite every record id of `document` and every reference to those ids.
    /// Counters start afresh for each call.
    ///
    /// The document is only replaced when the whole run succeeds.
    pub fn renumber(&self, document: &mut Document) -> Result<IdMapping> {
        let mut working = document.clone();
        let mut run = Run {
            renumberer: self,
            counters: IdClass::ALL.map(IdClass::first_number),
            mapping: IdMapping::new(),
        };

        for event in &mut working.events {
            event.id = run.assign(IdClass::Events, &event.id, false)?;

            for entity in event.entities.iter_mut().flatten() {
                entity.id = match run.mapping.get(IdClass::Entities, &entity.id) {
                    // Repeated declarations of one entity share its new id.
                    Some(new) => new.to_string(),
                    None => run.assign(IdClass::Entities, &entity.id, true)?,
                };
            }
            for participant in event.participants.iter_mut().flatten() {
                participant.id = run.assign(IdClass::Participants, &participant.id, true)?;
            }
            for relation in event.relations.iter_mut().flatten() {
                relation.id = run.assign(IdClass::Relations, &relation.id, true)?;
            }
        }

        let mapping = run.mapping;
        let rewritten = rewrite_references(&mut working, &mapping);
        info!(
            events = working.events.len(),
            ids = mapping.len(),
            references = rewritten,
            "renumbered document"
        );
        *document = working;
        Ok(mapping)
    }
}

/// Counters and rewrites of a single renumbering run.
struct Run<'a> {
    renumberer: &'a Renumberer,
    counters: [usize; 4],
    mapping: IdMapping,
}

impl Run<'_> {
    fn assign(&mut self, class: IdClass, old: &str, nested: bool) -> Result<String> {
        let counter = &mut self.counters[class.slot()];
        let new = self.renumberer.canonical_id(old, *counter);
        *counter += 1;

        if self.mapping.assigns(class, &new) {
            return Err(RenumberError::DuplicateId {
                old: old.to_string(),
                new,
            });
        }
        if nested && new == old {
            return Err(RenumberError::UnchangedId(new));
        }
        debug!(?class, old, new = %new, "assigned id");
        self.mapping.insert(class, old, &new);
        Ok(new)
    }
}

/// Point children, outlinks, participant entities and relation endpoints at
/// the new ids. References to ids that were never declared stay as they are.
fn rewrite_references(document: &mut Document, mapping: &IdMapping) -> usize {
    let mut rewritten = 0;
    let mut rewrite = |class: IdClass, id: &mut String| {
        if let Some(new) = mapping.get(class, id) {
            *id = new.to_string();
            rewritten += 1;
        }
    };

    for event in &mut document.events {
        for child in event.children.iter_mut().flatten() {
            match child {
                ChildRef::Id(id) => rewrite(IdClass::Events, id),
                ChildRef::Record(record) => rewrite(IdClass::Events, &mut record.child),
            }
        }
        for outlink in event.outlinks.iter_mut().flatten() {
            rewrite(IdClass::Events, outlink);
        }
        for participant in event.participants.iter_mut().flatten() {
            if let Some(entity) = participant.entity.as_mut() {
                rewrite(IdClass::Entities, entity);
            }
        }
        for relation in event.relations.iter_mut().flatten() {
            rewrite(IdClass::Entities, &mut relation.subject);
            rewrite(IdClass::Entities, &mut relation.object);
        }
    }
    rewritten
}

/// Renumber with a fresh set of counters.
pub fn renumber(document: &mut Document, options: &RenumberOptions) -> Result<IdMapping> {
    Renumberer::new(options.clone())?.renumber(document)
}

/// Pretty JSON with four-space indentation.
pub fn render_document(document: &Document) -> Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// `<dir>/<stem>_reordered.json` and `<dir>/<stem>_id_mapping.csv` for `input`.
pub fn output_paths(input: &Path) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    (
        dir.join(format!("{stem}_reordered.json")),
        dir.join(format!("{stem}_id_mapping.csv")),
    )
}
