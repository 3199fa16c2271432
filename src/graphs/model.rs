//! In-memory graph model: nodes, edges, and per-node configuration.
//!
//! All mutation operations confine their side effects to the graph's own
//! state. Edge additions are gated by the connection-rule table in
//! [`validation`](crate::graphs::validation); a rejected edge leaves the
//! graph untouched.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::graphs::validation::check_connection;
use crate::types::{EdgeId, NodeId, NodeKind, Position};

/// Errors returned by graph mutation operations.
// `Display`/`Error` are hand-written rather than derived with thiserror:
// the `InvalidConnection.source` field name would otherwise be inferred as
// an error source, and `NodeKind` is not an error type.
#[derive(Debug, Clone, PartialEq, Diagnostic)]
pub enum GraphError {
    /// A referenced node or edge id is not present in the graph.
    #[diagnostic(
        code(flowforge::graphs::not_found),
        help("The node may have been deleted; refresh the editor state.")
    )]
    NotFound { id: NodeId },

    /// The proposed edge's (source kind, target kind) pair is not in the
    /// connection-rule table.
    #[diagnostic(
        code(flowforge::graphs::invalid_connection),
        help("Check the connection rules: a {source} node does not feed a {target} node.")
    )]
    InvalidConnection {
        source: NodeKind,
        target: NodeKind,
    },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::NotFound { id } => write!(f, "node {id} not found in graph"),
            GraphError::InvalidConnection { source, target } => {
                write!(f, "cannot connect {source} to {target}")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Kind-specific option map, owned exclusively by its node.
///
/// Values are replaced wholesale or merged key-by-key on edit, never
/// shared between nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeConfig(FxHashMap<String, Value>);

impl NodeConfig {
    /// An empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default configuration for a node of the given kind.
    #[must_use]
    pub fn defaults_for(kind: NodeKind) -> Self {
        let mut map = FxHashMap::default();
        match kind {
            NodeKind::ReasoningEngine => {
                map.insert("model".to_string(), json!(""));
                map.insert(
                    "prompt".to_string(),
                    json!("You are a helpful AI assistant."),
                );
                map.insert("temperature".to_string(), json!(0.7));
                map.insert("webSearchEnabled".to_string(), json!(false));
            }
            NodeKind::KnowledgeRetriever => {
                map.insert("selectedDocuments".to_string(), json!([]));
                map.insert("topK".to_string(), json!(5));
            }
            NodeKind::WebSearch => {
                map.insert("numResults".to_string(), json!(5));
                map.insert("searchApi".to_string(), json!("SerpAPI"));
            }
            NodeKind::QuerySource | NodeKind::ResultSink => {}
        }
        Self(map)
    }

    /// Set or replace one option.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Look up one option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Merge another configuration into this one, key by key. Keys present
    /// in `other` win.
    pub fn merge(&mut self, other: NodeConfig) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// A typed processing node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Position,
    pub config: NodeConfig,
}

/// A directed edge between two node ports.
///
/// Legality depends only on the kinds of its endpoints, never on their
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_port: String,
    pub target: NodeId,
    pub target_port: String,
}

/// The workflow graph: a collection of nodes plus the edges between them.
///
/// Invariants upheld by the mutation operations:
/// - every edge references nodes present in the graph;
/// - no edge connects a node to itself;
/// - every edge's kind pair appears in the connection-rule table.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: FxHashMap<NodeId, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of the given kind with kind-appropriate default
    /// configuration. Always succeeds; returns the new node's id.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> NodeId {
        let id = NodeId::fresh();
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                kind,
                position,
                config: NodeConfig::defaults_for(kind),
            },
        );
        tracing::debug!(node = %id, %kind, "added node");
        id
    }

    /// Remove a node and cascade removal of every edge touching it.
    ///
    /// The node and its edges are removed atomically; a no-op if the id is
    /// absent. Returns the removed node, if any.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        let before = self.edges.len();
        self.edges.retain(|e| &e.source != id && &e.target != id);
        tracing::debug!(
            node = %id,
            cascaded_edges = before - self.edges.len(),
            "removed node"
        );
        Some(node)
    }

    /// Merge one key into a node's configuration.
    pub fn set_config_value(
        &mut self,
        id: &NodeId,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NotFound { id: id.clone() })?;
        node.config.set(key, value);
        Ok(())
    }

    /// Replace a node's configuration wholesale.
    pub fn replace_config(&mut self, id: &NodeId, config: NodeConfig) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NotFound { id: id.clone() })?;
        node.config = config;
        Ok(())
    }

    /// Propose an edge between two ports.
    ///
    /// Checks endpoint presence and connection legality before mutating;
    /// on rejection the graph is unchanged. Returns the new edge's id.
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        source_port: &str,
        target: &NodeId,
        target_port: &str,
    ) -> Result<EdgeId, GraphError> {
        let source_kind = self
            .nodes
            .get(source)
            .ok_or_else(|| GraphError::NotFound { id: source.clone() })?
            .kind;
        let target_kind = self
            .nodes
            .get(target)
            .ok_or_else(|| GraphError::NotFound { id: target.clone() })?
            .kind;
        if source == target {
            // Self loops are never legal, whatever the kind.
            return Err(GraphError::InvalidConnection {
                source: source_kind,
                target: target_kind,
            });
        }
        check_connection(source_kind, target_kind)?;

        let id = EdgeId::fresh();
        self.edges.push(Edge {
            id: id.clone(),
            source: source.clone(),
            source_port: source_port.to_string(),
            target: target.clone(),
            target_port: target_port.to_string(),
        });
        tracing::debug!(edge = %id, %source_kind, %target_kind, "added edge");
        Ok(id)
    }

    /// Remove an edge. Idempotent; absent ids are ignored.
    pub fn remove_edge(&mut self, id: &EdgeId) {
        self.edges.retain(|e| &e.id != id);
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ids of nodes with the given kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .values()
            .filter(move |n| n.kind == kind)
            .map(|n| &n.id)
    }

    /// Outgoing neighbor ids of a node, following edge direction.
    pub fn successors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> {
        self.edges
            .iter()
            .filter(move |e| &e.source == id)
            .map(|e| &e.target)
    }

    /// Serialize into the persisted wire shape. Only data crosses the
    /// boundary; runtime callbacks live in a side table and are never
    /// serialized (see [`ChangeHooks`](crate::graphs::hooks::ChangeHooks)).
    #[must_use]
    pub fn to_wire(&self) -> WireGraph {
        let mut nodes: Vec<WireNode> = self
            .nodes
            .values()
            .map(|n| WireNode {
                id: n.id.clone(),
                kind: n.kind,
                position: n.position,
                config: n.config.clone(),
            })
            .collect();
        // Stable output for diffs and tests; the in-memory map is unordered.
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        WireGraph {
            nodes,
            edges: self
                .edges
                .iter()
                .map(|e| WireEdge {
                    id: e.id.clone(),
                    source: e.source.clone(),
                    source_port: e.source_port.clone(),
                    target: e.target.clone(),
                    target_port: e.target_port.clone(),
                })
                .collect(),
        }
    }

    /// Reconstruct live nodes and edges from the persisted shape.
    ///
    /// Edges are re-checked against the current rule table; an entry that
    /// no longer passes is dropped rather than poisoning the whole load.
    #[must_use]
    pub fn from_wire(wire: WireGraph) -> Self {
        let mut graph = Graph::new();
        for n in wire.nodes {
            graph.nodes.insert(
                n.id.clone(),
                Node {
                    id: n.id,
                    kind: n.kind,
                    position: n.position,
                    config: n.config,
                },
            );
        }
        for e in wire.edges {
            let kinds = (
                graph.nodes.get(&e.source).map(|n| n.kind),
                graph.nodes.get(&e.target).map(|n| n.kind),
            );
            match kinds {
                (Some(s), Some(t)) if e.source != e.target && check_connection(s, t).is_ok() => {
                    graph.edges.push(Edge {
                        id: e.id,
                        source: e.source,
                        source_port: e.source_port,
                        target: e.target,
                        target_port: e.target_port,
                    });
                }
                _ => {
                    tracing::warn!(edge = %e.id, "dropping illegal edge during load");
                }
            }
        }
        graph
    }
}

/// Persisted node record: id, kind, position, configuration. No callbacks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    pub config: NodeConfig,
}

/// Persisted edge record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireEdge {
    pub id: EdgeId,
    pub source: NodeId,
    #[serde(rename = "sourceHandle")]
    pub source_port: String,
    pub target: NodeId,
    #[serde(rename = "targetHandle")]
    pub target_port: String,
}

/// The opaque JSON-shaped workflow document exchanged with the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireGraph {
    pub nodes: Vec<WireNode>,
    pub edges: Vec<WireEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_graph() -> (Graph, NodeId, NodeId, NodeId) {
        let mut g = Graph::new();
        let q = g.add_node(NodeKind::QuerySource, Position::default());
        let l = g.add_node(NodeKind::ReasoningEngine, Position::new(100.0, 0.0));
        let o = g.add_node(NodeKind::ResultSink, Position::new(200.0, 0.0));
        g.add_edge(&q, "out", &l, "in").unwrap();
        g.add_edge(&l, "out", &o, "in").unwrap();
        (g, q, l, o)
    }

    #[test]
    fn add_node_applies_kind_defaults() {
        let mut g = Graph::new();
        let id = g.add_node(NodeKind::ReasoningEngine, Position::default());
        let node = g.node(&id).unwrap();
        assert_eq!(node.config.get("temperature"), Some(&json!(0.7)));
        assert_eq!(node.config.get("webSearchEnabled"), Some(&json!(false)));

        let q = g.add_node(NodeKind::QuerySource, Position::default());
        assert!(g.node(&q).unwrap().config.is_empty());
    }

    #[test]
    fn remove_node_cascades_only_touching_edges() {
        let (mut g, _q, l, _o) = linear_graph();
        assert_eq!(g.edge_count(), 2);
        g.remove_node(&l);
        // Both edges touched the reasoning engine.
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn remove_node_keeps_unrelated_edges() {
        let (mut g, q, _l, _o) = linear_graph();
        let extra_sink = g.add_node(NodeKind::ResultSink, Position::default());
        g.add_edge(&q, "out", &extra_sink, "in").unwrap();
        let before = g.edge_count();
        g.remove_node(&extra_sink);
        assert_eq!(g.edge_count(), before - 1);
    }

    #[test]
    fn remove_absent_node_is_noop() {
        let (mut g, ..) = linear_graph();
        assert!(g.remove_node(&NodeId::from("ghost")).is_none());
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn set_config_value_merges_one_key() {
        let mut g = Graph::new();
        let id = g.add_node(NodeKind::ReasoningEngine, Position::default());
        g.set_config_value(&id, "model", json!("gpt-4o-mini")).unwrap();
        let node = g.node(&id).unwrap();
        assert_eq!(node.config.get("model"), Some(&json!("gpt-4o-mini")));
        // Other defaults untouched.
        assert_eq!(node.config.get("temperature"), Some(&json!(0.7)));
    }

    #[test]
    fn set_config_value_fails_for_missing_node() {
        let mut g = Graph::new();
        let err = g
            .set_config_value(&NodeId::from("ghost"), "model", json!("x"))
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
    }

    #[test]
    fn rejected_edge_leaves_graph_unchanged() {
        let mut g = Graph::new();
        let sink = g.add_node(NodeKind::ResultSink, Position::default());
        let q = g.add_node(NodeKind::QuerySource, Position::default());
        let err = g.add_edge(&sink, "out", &q, "in").unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidConnection {
                source: NodeKind::ResultSink,
                target: NodeKind::QuerySource,
            }
        );
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn self_edge_is_rejected() {
        let mut g = Graph::new();
        let l = g.add_node(NodeKind::ReasoningEngine, Position::default());
        let err = g.add_edge(&l, "out", &l, "in").unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnection { .. }));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn edge_to_missing_node_reports_not_found() {
        let mut g = Graph::new();
        let q = g.add_node(NodeKind::QuerySource, Position::default());
        let err = g
            .add_edge(&q, "out", &NodeId::from("ghost"), "in")
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
    }

    #[test]
    fn remove_edge_is_idempotent() {
        let (mut g, q, l, _o) = linear_graph();
        let id = g
            .edges()
            .iter()
            .find(|e| e.source == q && e.target == l)
            .map(|e| e.id.clone())
            .unwrap();
        g.remove_edge(&id);
        assert_eq!(g.edge_count(), 1);
        g.remove_edge(&id);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn wire_round_trip_preserves_structure() {
        let (g, ..) = linear_graph();
        let wire = g.to_wire();
        let json = serde_json::to_string(&wire).unwrap();
        let back: WireGraph = serde_json::from_str(&json).unwrap();
        let restored = Graph::from_wire(back);
        assert_eq!(restored.node_count(), g.node_count());
        assert_eq!(restored.edge_count(), g.edge_count());
        for node in g.nodes() {
            assert_eq!(restored.node(&node.id), Some(node));
        }
    }

    #[test]
    fn wire_nodes_use_react_flow_field_names() {
        let (g, ..) = linear_graph();
        let value = serde_json::to_value(g.to_wire()).unwrap();
        let node = &value["nodes"][0];
        assert!(node.get("type").is_some());
        assert!(node.get("kind").is_none());
        let edge = &value["edges"][0];
        assert!(edge.get("sourceHandle").is_some());
    }

    #[test]
    fn load_drops_illegal_edges() {
        let (g, _q, l, o) = linear_graph();
        let mut wire = g.to_wire();
        // Tamper: sink -> llm is not in the rule table.
        wire.edges.push(WireEdge {
            id: EdgeId::from("bad"),
            source: o.clone(),
            source_port: "out".into(),
            target: l.clone(),
            target_port: "in".into(),
        });
        let restored = Graph::from_wire(wire);
        assert_eq!(restored.edge_count(), 2);
    }
}
