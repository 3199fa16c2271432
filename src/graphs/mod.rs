//! Workflow graph model and validation.
//!
//! The graph is pure in-memory data plus mutation operations; it performs
//! no I/O. Edits are gated per-edge by the connection-rule table, and the
//! whole graph is checked for executability on demand before a build or an
//! execution.
//!
//! - [`model`]: nodes, edges, per-node configuration, and the persisted
//!   wire shape
//! - [`validation`]: the connection-rule table and the whole-graph
//!   executability check
//! - [`hooks`]: the runtime side table of per-node change callbacks,
//!   kept out of the serializable node records

pub mod hooks;
pub mod model;
pub mod validation;

pub use hooks::ChangeHooks;
pub use model::{Edge, Graph, GraphError, Node, NodeConfig, WireEdge, WireGraph, WireNode};
pub use validation::{allowed_targets, check_connection, validate_graph, ValidationReport};
