//! Connection legality and whole-graph executability checks.
//!
//! Two separate questions, answered at different times:
//!
//! - *Is this proposed edge legal?* A static table lookup on the endpoint
//!   kinds, run synchronously on every add-edge attempt before the graph
//!   is mutated.
//! - *Is this graph executable?* A structural check run on demand, before
//!   execution and before a build confirmation. It enumerates every
//!   violated rule so the caller can report all problems at once.
//!
//! Both checks are pure functions of the node-kind/edge topology;
//! configuration values are never inspected.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::graphs::model::{Graph, GraphError};
use crate::types::{NodeId, NodeKind};

/// The connection-rule table: which target kinds a source kind may feed.
///
/// A result sink is terminal and never appears as a source.
#[must_use]
pub fn allowed_targets(source: NodeKind) -> &'static [NodeKind] {
    match source {
        NodeKind::QuerySource => &[
            NodeKind::KnowledgeRetriever,
            NodeKind::ReasoningEngine,
            NodeKind::ResultSink,
        ],
        NodeKind::KnowledgeRetriever => &[NodeKind::ReasoningEngine],
        NodeKind::ReasoningEngine => &[NodeKind::ResultSink, NodeKind::WebSearch],
        NodeKind::WebSearch => &[NodeKind::ReasoningEngine, NodeKind::ResultSink],
        NodeKind::ResultSink => &[],
    }
}

/// Per-edge legality: reject the pair unless it appears in the rule table.
pub fn check_connection(source: NodeKind, target: NodeKind) -> Result<(), GraphError> {
    if allowed_targets(source).contains(&target) {
        Ok(())
    } else {
        Err(GraphError::InvalidConnection { source, target })
    }
}

/// Outcome of the whole-graph executability check.
///
/// `reasons` enumerates every violated rule, not just the first, so a
/// build dialog can show the complete list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl ValidationReport {
    fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            valid: reasons.is_empty(),
            reasons,
        }
    }
}

/// Whole-graph executability check.
///
/// Rules:
/// 1. at least one query source exists;
/// 2. at least one reasoning engine exists;
/// 3. at least one result sink exists;
/// 4. some query source reaches a reasoning engine, directly or through
///    exactly one knowledge-retriever hop;
/// 5. every reasoning engine reachable from a query source itself reaches
///    a result sink, directly or via web search;
/// 6. the graph contains no directed cycle.
pub fn validate_graph(graph: &Graph) -> ValidationReport {
    let mut reasons = Vec::new();

    let kind_of = |id: &NodeId| graph.node(id).map(|n| n.kind);

    for (kind, label) in [
        (NodeKind::QuerySource, "query source"),
        (NodeKind::ReasoningEngine, "reasoning engine"),
        (NodeKind::ResultSink, "result sink"),
    ] {
        if graph.nodes_of_kind(kind).next().is_none() {
            reasons.push(format!("workflow must have a {label} node"));
        }
    }

    // Rule 4: query source -> reasoning engine, allowing one retriever hop.
    let mut engine_fed = false;
    for q in graph.nodes_of_kind(NodeKind::QuerySource) {
        for succ in graph.successors(q) {
            match kind_of(succ) {
                Some(NodeKind::ReasoningEngine) => engine_fed = true,
                Some(NodeKind::KnowledgeRetriever) => {
                    if graph
                        .successors(succ)
                        .any(|n| kind_of(n) == Some(NodeKind::ReasoningEngine))
                    {
                        engine_fed = true;
                    }
                }
                _ => {}
            }
        }
    }
    if !engine_fed {
        reasons.push(
            "no reasoning engine is reachable from a query source \
             (directly or through a single knowledge retriever)"
                .to_string(),
        );
    }

    // Rule 5: every engine downstream of a query source must reach a sink.
    let reachable = reachable_from_sources(graph);
    let mut stranded: Vec<&NodeId> = graph
        .nodes_of_kind(NodeKind::ReasoningEngine)
        .filter(|id| reachable.contains(id))
        .filter(|id| !reaches_sink(graph, id))
        .collect();
    stranded.sort();
    for id in stranded {
        reasons.push(format!(
            "reasoning engine {id} cannot deliver its output to a result sink"
        ));
    }

    if has_cycle(graph) {
        reasons.push("workflow contains a cycle".to_string());
    }

    ValidationReport::from_reasons(reasons)
}

/// Every node reachable from any query source, following edge direction.
fn reachable_from_sources(graph: &Graph) -> Vec<NodeId> {
    let mut seen: Vec<NodeId> = Vec::new();
    let mut queue: VecDeque<NodeId> = graph
        .nodes_of_kind(NodeKind::QuerySource)
        .cloned()
        .collect();
    while let Some(id) = queue.pop_front() {
        if seen.contains(&id) {
            continue;
        }
        for succ in graph.successors(&id) {
            queue.push_back(succ.clone());
        }
        seen.push(id);
    }
    seen
}

/// Does this engine deliver to a sink, directly or via one web-search hop?
fn reaches_sink(graph: &Graph, engine: &NodeId) -> bool {
    graph.successors(engine).any(|succ| {
        match graph.node(succ).map(|n| n.kind) {
            Some(NodeKind::ResultSink) => true,
            Some(NodeKind::WebSearch) => graph
                .successors(succ)
                .any(|n| graph.node(n).map(|n| n.kind) == Some(NodeKind::ResultSink)),
            _ => false,
        }
    })
}

/// Directed cycle detection via DFS with a recursion stack.
fn has_cycle(graph: &Graph) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        graph: &Graph,
        id: &NodeId,
        marks: &mut FxHashMap<NodeId, Mark>,
    ) -> bool {
        match marks.get(id) {
            Some(Mark::Done) => return false,
            Some(Mark::InProgress) => return true,
            None => {}
        }
        marks.insert(id.clone(), Mark::InProgress);
        for succ in graph.successors(id) {
            if visit(graph, succ, marks) {
                return true;
            }
        }
        marks.insert(id.clone(), Mark::Done);
        false
    }

    let mut marks = FxHashMap::default();
    let ids: Vec<NodeId> = graph.nodes().map(|n| n.id.clone()).collect();
    ids.iter().any(|id| visit(graph, id, &mut marks))
}
