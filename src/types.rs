//! Core identifier and node-kind types for the flowforge workflow model.
//!
//! This module defines the fundamental vocabulary of the system: the closed
//! set of node kinds a workflow may contain ([`NodeKind`]) and the id
//! newtypes used to reference nodes, edges, sessions, and workflows.
//!
//! # Key Types
//!
//! - [`NodeKind`]: the closed enumeration governing connection legality
//! - [`NodeId`] / [`EdgeId`]: stable identities within one graph's lifetime
//! - [`SessionId`] / [`WorkflowId`]: identities handed out by the backend
//! - [`Position`]: renderer-owned canvas coordinates, opaque to the core
//!
//! # Examples
//!
//! ```rust
//! use flowforge::types::NodeKind;
//!
//! let kind = NodeKind::ReasoningEngine;
//! assert_eq!(kind.encode(), "llm");
//! assert_eq!(NodeKind::decode("llm"), Some(NodeKind::ReasoningEngine));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::ids;

/// The kind of a node within a workflow graph.
///
/// `NodeKind` is a closed set: connection legality and whole-graph
/// executability are decided purely on these kinds, never on node
/// configuration. The serde/wire names match the component types the
/// backend stores inside a persisted workflow document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry point carrying the user's query into the workflow.
    #[serde(rename = "userQuery")]
    QuerySource,

    /// Retrieves relevant document chunks for the query.
    #[serde(rename = "knowledgeBase")]
    KnowledgeRetriever,

    /// Language-model reasoning step; the heart of an executable workflow.
    #[serde(rename = "llm")]
    ReasoningEngine,

    /// Live web search enrichment.
    #[serde(rename = "webSearch")]
    WebSearch,

    /// Terminal node that renders the final answer. Never a source.
    #[serde(rename = "outputN")]
    ResultSink,
}

impl NodeKind {
    /// Every kind, in table order. Useful for exhaustive rule checks.
    pub const ALL: [NodeKind; 5] = [
        NodeKind::QuerySource,
        NodeKind::KnowledgeRetriever,
        NodeKind::ReasoningEngine,
        NodeKind::WebSearch,
        NodeKind::ResultSink,
    ];

    /// Encode this kind into its persisted wire form.
    ///
    /// ```rust
    /// # use flowforge::types::NodeKind;
    /// assert_eq!(NodeKind::QuerySource.encode(), "userQuery");
    /// assert_eq!(NodeKind::ResultSink.encode(), "outputN");
    /// ```
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            NodeKind::QuerySource => "userQuery",
            NodeKind::KnowledgeRetriever => "knowledgeBase",
            NodeKind::ReasoningEngine => "llm",
            NodeKind::WebSearch => "webSearch",
            NodeKind::ResultSink => "outputN",
        }
    }

    /// Decode a persisted wire form back into a kind.
    ///
    /// Returns `None` for unknown strings; the set is closed, so there is
    /// no forward-compatibility fallback.
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.encode() == s)
    }

    /// Returns `true` if this kind may appear as an edge source.
    #[must_use]
    pub fn can_be_source(&self) -> bool {
        !matches!(self, NodeKind::ResultSink)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::QuerySource => "query source",
            NodeKind::KnowledgeRetriever => "knowledge retriever",
            NodeKind::ReasoningEngine => "reasoning engine",
            NodeKind::WebSearch => "web search",
            NodeKind::ResultSink => "result sink",
        };
        write!(f, "{name}")
    }
}

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident, $prefix:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh unique id.
            #[must_use]
            pub fn fresh() -> Self {
                Self(ids::fresh_id($prefix))
            }

            /// Borrow the raw id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::fresh()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identity of a node, stable for the graph's lifetime.
    NodeId,
    "node"
);
id_newtype!(
    /// Identity of an edge.
    EdgeId,
    "edge"
);
id_newtype!(
    /// Identity of a chat session, issued by the backend.
    SessionId,
    "session"
);
id_newtype!(
    /// Identity of a saved workflow, issued by the backend.
    WorkflowId,
    "workflow"
);

/// Canvas coordinates for a node. Opaque to the core; carried through
/// serialization untouched so the renderer can restore layout on load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
