//! Id-keyed node registry.
//!
//! Events, entities, gates and placeholders live in one id space, so a single
//! registry holds every node; `Node::origin` tags which kind of record it came
//! from. Insertion order is kept because "first root" and every rendered list
//! follow document order.

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::primitives::Node;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => None,
        }
    }

    /// Insert `node`, replacing (in place) any node with the same id.
    pub fn insert(&mut self, node: Node) -> &mut Node {
        let slot = match self.index.get(&node.id) {
            Some(&i) => {
                self.nodes[i] = node;
                i
            }
            None => {
                let i = self.nodes.len();
                self.index.insert(node.id.clone(), i);
                self.nodes.push(node);
                i
            }
        };
        &mut self.nodes[slot]
    }

    /// Insert the node built by `make` unless `id` is already registered.
    pub fn get_or_insert_with(&mut self, id: &str, make: impl FnOnce() -> Node) -> &mut Node {
        let slot = match self.index.get(id) {
            Some(&i) => i,
            None => {
                let node = make();
                debug_assert_eq!(node.id, id);
                let i = self.nodes.len();
                self.index.insert(id.to_string(), i);
                self.nodes.push(node);
                i
            }
        };
        &mut self.nodes[slot]
    }

    pub fn remove(&mut self, id: &str) -> Option<Node> {
        let i = self.index.remove(id)?;
        let node = self.nodes.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}

/// Serializes as an ordered `{ id: element }` object.
impl Serialize for NodeRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for node in &self.nodes {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }
}
