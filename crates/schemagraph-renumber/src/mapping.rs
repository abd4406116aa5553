//! Old-id → new-id tables, one per record class.

use std::collections::HashMap;

use serde::Serialize;

/// Record classes that get their own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IdClass {
    Events,
    Entities,
    Participants,
    Relations,
}

impl IdClass {
    /// Mapping-table order.
    pub const ALL: [IdClass; 4] = [
        IdClass::Events,
        IdClass::Entities,
        IdClass::Participants,
        IdClass::Relations,
    ];

    /// First number handed out for this class.
    pub fn first_number(self) -> usize {
        match self {
            IdClass::Events => 20000,
            IdClass::Entities => 10000,
            IdClass::Participants => 30000,
            IdClass::Relations => 40000,
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            IdClass::Events => 0,
            IdClass::Entities => 1,
            IdClass::Participants => 2,
            IdClass::Relations => 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ClassTable {
    entries: Vec<(String, String)>,
    by_old: HashMap<String, usize>,
}

impl ClassTable {
    fn insert(&mut self, old: &str, new: &str) {
        match self.by_old.get(old) {
            Some(&i) => self.entries[i].1 = new.to_string(),
            None => {
                self.by_old.insert(old.to_string(), self.entries.len());
                self.entries.push((old.to_string(), new.to_string()));
            }
        }
    }

    fn get(&self, old: &str) -> Option<&str> {
        self.by_old.get(old).map(|&i| self.entries[i].1.as_str())
    }

    fn assigns(&self, new: &str) -> bool {
        self.entries.iter().any(|(_, n)| n == new)
    }
}

/// Every id rewrite of one renumbering run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdMapping {
    tables: [ClassTable; 4],
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `old → new`; a later rewrite of the same old id replaces the
    /// earlier one.
    pub fn insert(&mut self, class: IdClass, old: &str, new: &str) {
        self.tables[class.slot()].insert(old, new);
    }

    pub fn get(&self, class: IdClass, old: &str) -> Option<&str> {
        self.tables[class.slot()].get(old)
    }

    /// Whether some id of `class` was already rewritten to `new`.
    pub fn assigns(&self, class: IdClass, new: &str) -> bool {
        self.tables[class.slot()].assigns(new)
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(|t| t.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rewrites, class by class, each class in first-seen order.
    pub fn entries(&self) -> impl Iterator<Item = (IdClass, &str, &str)> {
        IdClass::ALL.into_iter().flat_map(move |class| {
            self.tables[class.slot()]
                .entries
                .iter()
                .map(move |(old, new)| (class, old.as_str(), new.as_str()))
        })
    }

    /// `old_id,new_id` table with a header row.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("old_id,new_id\n");
        for (_, old, new) in self.entries() {
            out.push_str(&csv_field(old));
            out.push(',');
            out.push_str(&csv_field(new));
            out.push('\n');
        }
        out
    }
}

/// Quote a field when it holds a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
