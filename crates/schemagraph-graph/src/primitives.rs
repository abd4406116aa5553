//! Graph primitives: nodes, edges, and the dictionary-filtered merge of
//! schema records onto them.
//!
//! Both primitives serialize as viewer elements:
//!
//! ```text
//! { "data": { "id", "_label", "_type", "_shape", ...fields }, "classes": "" }
//! { "data": { "id": "src__tgt", "_label", "name", "source", "target", "_edge_type", ... }, "classes": "" }
//! ```

use schemagraph_model::{Record, RecordKind, SchemaDictionary};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Marker the viewer uses to break edge labels onto their own line.
const WORD_JOINER: char = '\u{2060}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Parent,
    Child,
    Container,
    Entity,
    Gate,
}

impl NodeType {
    /// Dictionary section used when extending a node of this type.
    pub fn record_kind(self) -> Option<RecordKind> {
        match self {
            NodeType::Entity => Some(RecordKind::Entity),
            NodeType::Gate => None,
            NodeType::Root | NodeType::Parent | NodeType::Child | NodeType::Container => {
                Some(RecordKind::Event)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    #[serde(rename = "")]
    Plain,
    Diamond,
    Ellipse,
    Rectangle,
}

/// What a node was built from. Events and entities share one id space, so a
/// node can start as one origin and be upgraded to another during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    Event,
    Entity,
    Gate,
    /// Auto-created target of a reference with no declared record.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    StepChild,
    ChildOutlink,
    StepParticipant,
    Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub node_type: NodeType,
    pub shape: Shape,
    /// Set when the source record declared itself optional.
    pub optional: bool,
    pub origin: NodeOrigin,
    /// Dictionary-recognized fields merged from the source record(s).
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Composite `source__target` id. Parallel edges of different kinds share it.
    pub id: String,
    /// Label wrapped in word-joiner lines, ready for the viewer.
    pub label: String,
    /// The unwrapped label.
    pub name: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    /// `@id` of the participant or relation record behind this edge.
    pub record_id: Option<String>,
    pub predicate: Option<Value>,
    pub fields: Record,
}

// ============================================================================
// Builders
// ============================================================================

/// A bare node; an empty label falls back to the id.
pub fn make_node(id: &str, label: &str, node_type: NodeType, shape: Shape) -> Node {
    let origin = match node_type {
        NodeType::Entity => NodeOrigin::Entity,
        NodeType::Gate => NodeOrigin::Gate,
        _ => NodeOrigin::Event,
    };
    Node {
        id: id.to_string(),
        label: (if label.is_empty() { id } else { label }).to_string(),
        node_type,
        shape,
        optional: false,
        origin,
        fields: Record::new(),
    }
}

pub fn make_edge(source: &str, target: &str, label: &str, kind: EdgeKind) -> Edge {
    Edge {
        id: format!("{source}__{target}"),
        label: format!("\n{WORD_JOINER}{label}\n{WORD_JOINER}"),
        name: label.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        kind,
        record_id: None,
        predicate: None,
        fields: Record::new(),
    }
}

/// Merge the fields of `record` that the dictionary lists for the node's
/// current type, plus the recognized keys of a nested `privateData` object.
///
/// Re-applying the same record leaves the node unchanged.
pub fn extend(node: &mut Node, record: &Record) {
    let dictionary = SchemaDictionary;
    let Some(kind) = node.node_type.record_kind() else {
        return;
    };

    for (key, value) in record {
        if !dictionary.recognizes(kind, key) {
            continue;
        }
        if key == "optional" && is_truthy(value) {
            node.optional = true;
        }
        node.fields.insert(key.clone(), value.clone());
    }

    if let Some(Value::Object(private)) = record.get("privateData") {
        for (key, value) in private {
            if dictionary.recognizes(RecordKind::PrivateData, key) {
                node.fields.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge the relation-dictionary fields of `record` onto a relation edge.
pub fn extend_edge(edge: &mut Edge, record: &Record) {
    let dictionary = SchemaDictionary;
    for (key, value) in record {
        // `name` is already the edge's own label.
        if key != "name" && dictionary.recognizes(RecordKind::Relation, key) {
            edge.fields.insert(key.clone(), value.clone());
        }
    }
}

/// JSON truthiness as schema authors use it: `false`, `null`, `0`, `""`,
/// `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl Node {
    pub fn with_origin(mut self, origin: NodeOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// The merged `name` field, when the source record had one.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn is_repeatable(&self) -> bool {
        self.fields.get("repeatable").map(is_truthy).unwrap_or(false)
    }

    pub fn classes(&self) -> &'static str {
        if self.optional {
            "optional"
        } else {
            ""
        }
    }
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

// ============================================================================
// Viewer elements
// ============================================================================

#[derive(Serialize)]
struct Element<D> {
    data: D,
    classes: &'static str,
}

#[derive(Serialize)]
struct NodeData<'a> {
    id: &'a str,
    #[serde(rename = "_label")]
    label: &'a str,
    #[serde(rename = "_type")]
    node_type: NodeType,
    #[serde(rename = "_shape")]
    shape: Shape,
    #[serde(flatten)]
    fields: &'a Record,
}

#[derive(Serialize)]
struct EdgeData<'a> {
    id: &'a str,
    #[serde(rename = "_label")]
    label: &'a str,
    name: &'a str,
    source: &'a str,
    target: &'a str,
    #[serde(rename = "_edge_type")]
    kind: EdgeKind,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    record_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicate: Option<&'a Value>,
    #[serde(flatten)]
    fields: &'a Record,
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Element {
            data: NodeData {
                id: &self.id,
                label: &self.label,
                node_type: self.node_type,
                shape: self.shape,
                fields: &self.fields,
            },
            classes: self.classes(),
        }
        .serialize(serializer)
    }
}

impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Element {
            data: EdgeData {
                id: &self.id,
                label: &self.label,
                name: &self.name,
                source: &self.source,
                target: &self.target,
                kind: self.kind,
                record_id: self.record_id.as_deref(),
                predicate: self.predicate.as_ref(),
                fields: &self.fields,
            },
            classes: "",
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    #[test]
    fn empty_label_defaults_to_id() {
        let node = make_node("Events/1/", "", NodeType::Child, Shape::Ellipse);
        assert_eq!(node.label, "Events/1/");
        assert!(!node.optional);
        assert!(node.fields.is_empty());
    }

    #[test]
    fn edge_label_is_wrapped_in_word_joiner_lines() {
        let edge = make_edge("a", "b", "agent", EdgeKind::StepParticipant);
        assert_eq!(edge.id, "a__b");
        assert_eq!(edge.label, "\n\u{2060}agent\n\u{2060}");
        assert_eq!(edge.name, "agent");

        let bare = make_edge("a", "b", "", EdgeKind::StepChild);
        assert_eq!(bare.label, "\n\u{2060}\n\u{2060}");
    }

    #[test]
    fn extend_filters_by_dictionary_and_flags_optional() {
        let mut node = make_node("e", "E", NodeType::Parent, Shape::Diamond);
        let rec = record(json!({
            "@id": "e",
            "name": "E",
            "optional": true,
            "notInDictionary": 1,
            "privateData": {"@type": "kairos:PrivateData", "template": "t", "bogus": 2}
        }));
        extend(&mut node, &rec);

        assert!(node.optional);
        assert_eq!(node.classes(), "optional");
        assert_eq!(node.fields.get("name"), Some(&json!("E")));
        assert!(node.fields.get("notInDictionary").is_none());
        assert_eq!(node.fields.get("template"), Some(&json!("t")));
        assert_eq!(node.fields.get("@type"), Some(&json!("kairos:PrivateData")));
        assert!(node.fields.get("bogus").is_none());
    }

    #[test]
    fn extend_is_idempotent() {
        let mut node = make_node("x", "X", NodeType::Entity, Shape::Plain);
        let rec = record(json!({"@id": "x", "name": "X", "centrality": 0.5, "goal": "ignored"}));
        extend(&mut node, &rec);
        let once = node.clone();
        extend(&mut node, &rec);
        assert_eq!(node, once);
        assert!(node.fields.get("goal").is_none(), "goal is an event field");
    }

    #[test]
    fn gates_take_no_fields() {
        let mut node = make_node("ex", "XOR", NodeType::Gate, Shape::Rectangle);
        extend(&mut node, &record(json!({"name": "n"})));
        assert!(node.fields.is_empty());
    }

    #[test]
    fn falsy_optional_does_not_set_class() {
        let mut node = make_node("e", "E", NodeType::Child, Shape::Ellipse);
        extend(&mut node, &record(json!({"optional": false})));
        assert!(!node.optional);
        assert_eq!(node.fields.get("optional"), Some(&json!(false)));
    }

    #[test]
    fn elements_serialize_in_viewer_shape() {
        let mut node = make_node("e", "E", NodeType::Parent, Shape::Diamond);
        node.fields.insert("name".into(), json!("E"));
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["data"]["_type"], json!("parent"));
        assert_eq!(v["data"]["_shape"], json!("diamond"));
        assert_eq!(v["data"]["name"], json!("E"));
        assert_eq!(v["classes"], json!(""));

        let mut edge = make_edge("a", "b", "knows", EdgeKind::Relation);
        edge.record_id = Some("Relations/1/".into());
        edge.predicate = Some(json!("wd:P1"));
        let v = serde_json::to_value(&edge).unwrap();
        assert_eq!(v["data"]["_edge_type"], json!("relation"));
        assert_eq!(v["data"]["@id"], json!("Relations/1/"));
        assert_eq!(v["data"]["predicate"], json!("wd:P1"));

        let plain = serde_json::to_value(make_edge("a", "b", "", EdgeKind::StepChild)).unwrap();
        assert!(plain["data"].get("@id").is_none());
        assert_eq!(plain["data"]["_edge_type"], json!("step_child"));
    }

    #[test]
    fn plain_shape_serializes_empty() {
        let node = make_node("x", "X", NodeType::Entity, Shape::Plain);
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["data"]["_shape"], json!(""));
    }
}
