//! Graph fixtures shared across integration tests.

use flowforge::graphs::Graph;
use flowforge::types::{NodeId, NodeKind, Position};

/// Query source -> reasoning engine -> result sink.
pub fn linear_workflow() -> (Graph, NodeId, NodeId, NodeId) {
    let mut g = Graph::new();
    let q = g.add_node(NodeKind::QuerySource, Position::new(0.0, 0.0));
    let l = g.add_node(NodeKind::ReasoningEngine, Position::new(200.0, 0.0));
    let o = g.add_node(NodeKind::ResultSink, Position::new(400.0, 0.0));
    g.add_edge(&q, "out", &l, "in").expect("query -> engine");
    g.add_edge(&l, "out", &o, "in").expect("engine -> sink");
    (g, q, l, o)
}

/// Full RAG shape: query feeds both a retriever and the engine, the
/// retriever feeds the engine, the engine feeds the sink.
pub fn rag_workflow() -> Graph {
    let mut g = Graph::new();
    let q = g.add_node(NodeKind::QuerySource, Position::new(0.0, 0.0));
    let kb = g.add_node(NodeKind::KnowledgeRetriever, Position::new(200.0, 100.0));
    let l = g.add_node(NodeKind::ReasoningEngine, Position::new(400.0, 0.0));
    let o = g.add_node(NodeKind::ResultSink, Position::new(600.0, 0.0));
    g.add_edge(&q, "out", &kb, "in").expect("query -> retriever");
    g.add_edge(&q, "out", &l, "query").expect("query -> engine");
    g.add_edge(&kb, "out", &l, "context").expect("retriever -> engine");
    g.add_edge(&l, "out", &o, "in").expect("engine -> sink");
    g
}
