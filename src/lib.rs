//! # Flowforge: Headless Core for Visual RAG Workflow Builders
//!
//! Flowforge is the renderer-agnostic engine behind a visual
//! retrieval-augmented-generation workflow builder: a typed node/edge
//! graph model, connection and executability validation, a resilient
//! backend call layer, and chat session orchestration.
//!
//! ## Core Concepts
//!
//! - **Graph**: typed nodes and edges with per-kind default configuration
//! - **Validation**: connection legality plus whole-graph executability
//! - **Calls**: timeout, bounded retry, and supersession on every backend call
//! - **Sessions**: optimistic chat transcripts over a session backend
//! - **Execution**: validate-then-submit workflow runs
//!
//! ## Quick Start
//!
//! ### Building and Validating a Workflow
//!
//! ```
//! use flowforge::graphs::{validate_graph, Graph};
//! use flowforge::types::{NodeKind, Position};
//!
//! let mut graph = Graph::new();
//! let query = graph.add_node(NodeKind::QuerySource, Position::new(0.0, 0.0));
//! let engine = graph.add_node(NodeKind::ReasoningEngine, Position::new(200.0, 0.0));
//! let sink = graph.add_node(NodeKind::ResultSink, Position::new(400.0, 0.0));
//!
//! graph.add_edge(&query, "out", &engine, "in").unwrap();
//! graph.add_edge(&engine, "out", &sink, "in").unwrap();
//!
//! let report = validate_graph(&graph);
//! assert!(report.valid);
//! ```
//!
//! ### Talking to a Backend
//!
//! Every remote call runs through a [`calls::CallExecutor`], which applies
//! a per-attempt timeout, bounded linear-backoff retries, and cooperative
//! cancellation. Starting a new call through the same executor supersedes
//! the previous one; a superseded call resolves with neither a success nor
//! a failure.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowforge::backends::http::HttpBackend;
//! use flowforge::calls::{AuthContext, CallExecutor};
//! use flowforge::config::ClientConfig;
//! use flowforge::sessions::ChatOrchestrator;
//! use flowforge::types::WorkflowId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env();
//! let auth = Arc::new(AuthContext::new());
//! auth.init("token-from-login");
//!
//! let backend = Arc::new(HttpBackend::new(&config, Arc::clone(&auth))?);
//! let executor = CallExecutor::new(config.call_policy(), auth);
//!
//! let mut chat = ChatOrchestrator::new(backend, executor, WorkflowId::from("wf-1"));
//! chat.load().await?;
//! chat.chat("What does the quarterly report say about revenue?").await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod calls;
pub mod config;
pub mod execution;
pub mod graphs;
pub mod message;
pub mod sessions;
pub mod telemetry;
pub mod types;
pub mod utils;
