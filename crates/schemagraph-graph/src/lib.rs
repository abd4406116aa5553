//! Schemagraph graph engine
//!
//! Compiles an SDF schema document into the node/edge graph a viewer renders:
//!
//! - `primitives`: node and edge elements, dictionary-filtered field merging,
//! - `extract`: entity nodes and relation edges,
//! - `assemble`: the per-event pass (gates, participants, children, outlinks),
//! - `flatten`: container removal,
//! - `classify`: root detection,
//! - `subgraph`: bounded two-level views from an anchor,
//! - `session`: the editing handle that owns a document and its graph,
//! - `catalogue`: entity summaries.
//!
//! Events, entities, gates and placeholders share one id space and live in a
//! single `NodeRegistry`.

pub mod assemble;
pub mod catalogue;
pub mod classify;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod graph;
pub mod primitives;
pub mod registry;
pub mod session;
pub mod subgraph;

pub use assemble::{assemble, assemble_unflattened, AssembledGraph};
pub use catalogue::{entity_catalogue, EntitySummary};
pub use error::{GraphError, Result};
pub use graph::Graph;
pub use primitives::{Edge, EdgeKind, Node, NodeOrigin, NodeType, Shape};
pub use registry::NodeRegistry;
pub use session::{RemovalSummary, SchemaSession};
pub use subgraph::{extract_subgraph, Anchor, Subgraph, SubgraphView};
