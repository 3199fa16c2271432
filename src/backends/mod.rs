//! External interface boundary.
//!
//! The core consumes the backend as two narrow traits: one for workflow
//! execution, one for session/message state. Implementations are the only
//! code in the crate that performs I/O, and every call to them is routed
//! through the [`CallExecutor`](crate::calls::CallExecutor).
//!
//! [`HttpBackend`] is the production implementation; tests substitute
//! in-memory fakes.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calls::CallError;
use crate::graphs::WireGraph;
use crate::message::{Message, SourceRef};
use crate::types::{SessionId, WorkflowId};

/// Request submitted to the execution endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub workflow_id: WorkflowId,
    /// The serialized graph: data only, callbacks stripped.
    pub graph: WireGraph,
    pub user_query: String,
}

/// Opaque execution record returned by the execution endpoint.
///
/// `payload` is the provider's result document; the execution trigger
/// locates the primary text field in it without interpreting the rest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionRecord {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Reply from a chat send or quick-chat call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Session header as stored by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub workflow_id: WorkflowId,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// The workflow execution endpoint.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Run the serialized graph against the user query.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionRecord, CallError>;
}

/// The chat session endpoint: session CRUD plus the message log.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn create_session(
        &self,
        workflow_id: &WorkflowId,
        label: &str,
    ) -> Result<SessionRecord, CallError>;

    async fn session(&self, id: &SessionId) -> Result<SessionRecord, CallError>;

    async fn sessions(&self, workflow_id: &WorkflowId) -> Result<Vec<SessionRecord>, CallError>;

    async fn delete_session(&self, id: &SessionId) -> Result<(), CallError>;

    /// Full message history for a session, oldest first.
    async fn messages(&self, id: &SessionId) -> Result<Vec<Message>, CallError>;

    /// Send a user message through the session's workflow and return the
    /// assistant reply. The backend appends both to its durable log.
    async fn send_message(&self, id: &SessionId, text: &str) -> Result<ChatReply, CallError>;

    /// One-shot chat against a workflow without touching any session.
    async fn quick_chat(
        &self,
        workflow_id: &WorkflowId,
        text: &str,
    ) -> Result<ChatReply, CallError>;
}
