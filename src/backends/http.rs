//! HTTP implementation of the backend traits.
//!
//! Speaks the backend's REST dialect and maps transport/status failures
//! into the [`CallError`] taxonomy: 401 becomes `Unauthorized`, transport
//! failures become `Network`, and structured error bodies (`{"detail":
//! ...}`) become `Provider`. Attempt timeouts are enforced by the
//! [`CallExecutor`](crate::calls::CallExecutor), not here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::backends::{
    ChatReply, ExecutionBackend, ExecutionRecord, ExecutionRequest, SessionBackend, SessionRecord,
};
use crate::calls::{AuthContext, CallError};
use crate::config::ClientConfig;
use crate::message::{Message, MessageMeta, SourceRef};
use crate::types::{SessionId, WorkflowId};

/// reqwest-based backend client.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<AuthContext>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, auth: Arc<AuthContext>) -> Result<Self, CallError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CallError::Network {
                message: format!("failed to build http client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = self.auth.bearer() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, CallError> {
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CallError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::Provider {
                status: status.as_u16(),
                message: provider_detail(&body),
            });
        }
        resp.json::<T>().await.map_err(|e| CallError::Provider {
            status: status.as_u16(),
            message: format!("malformed response body: {e}"),
        })
    }
}

fn transport_error(e: reqwest::Error) -> CallError {
    if e.is_timeout() {
        CallError::Timeout
    } else {
        CallError::Network {
            message: e.to_string(),
        }
    }
}

/// FastAPI-style error bodies put the human detail under `detail`.
fn provider_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str().map(str::to_string)))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "backend returned an error with no body".to_string()
            } else {
                body.to_string()
            }
        })
}

/// Backend ids may be numeric; the core treats them as opaque strings.
fn id_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SessionWire {
    id: Value,
    workflow_id: Value,
    session_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl SessionWire {
    fn into_record(self) -> SessionRecord {
        SessionRecord {
            id: SessionId::from(id_string(&self.id)),
            workflow_id: WorkflowId::from(id_string(&self.workflow_id)),
            label: self.session_name.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceWire {
    document_id: Value,
    #[serde(default)]
    document_name: String,
    #[serde(default)]
    similarity_score: f64,
    #[serde(default)]
    chunk_text: String,
}

impl SourceWire {
    fn into_ref(self) -> SourceRef {
        SourceRef {
            document_id: id_string(&self.document_id),
            document_name: self.document_name,
            similarity_score: self.similarity_score,
            excerpt: self.chunk_text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageWire {
    id: Value,
    message_type: String,
    content: String,
    #[serde(default)]
    metadata_msg: Option<Value>,
    created_at: DateTime<Utc>,
}

impl MessageWire {
    fn into_message(self) -> Message {
        let meta = self.metadata_msg.as_ref().map(|m| MessageMeta {
            execution_id: m.get("execution_id").map(id_string),
            sources: m
                .get("sources")
                .and_then(|s| serde_json::from_value::<Vec<SourceWire>>(s.clone()).ok())
                .map(|ws| ws.into_iter().map(SourceWire::into_ref).collect())
                .unwrap_or_default(),
            error: m.get("error").and_then(Value::as_bool).unwrap_or(false),
        });
        Message {
            id: id_string(&self.id),
            role: self.message_type,
            content: self.content,
            created_at: self.created_at,
            meta,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReplyWire {
    response: String,
    #[serde(default)]
    execution_id: Option<Value>,
    #[serde(default)]
    sources: Vec<SourceWire>,
    #[serde(default)]
    metadata_msg: Value,
}

impl ChatReplyWire {
    fn into_reply(self) -> ChatReply {
        ChatReply {
            response: self.response,
            execution_id: self.execution_id.as_ref().map(id_string),
            sources: self.sources.into_iter().map(SourceWire::into_ref).collect(),
            metadata: self.metadata_msg,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecutionWire {
    id: Value,
    #[serde(default)]
    execution_result: Value,
}

impl ExecutionWire {
    fn into_record(self) -> ExecutionRecord {
        let sources = self
            .execution_result
            .get("sources")
            .and_then(|s| serde_json::from_value::<Vec<SourceWire>>(s.clone()).ok())
            .map(|ws| ws.into_iter().map(SourceWire::into_ref).collect())
            .unwrap_or_default();
        let metadata = self
            .execution_result
            .get("metadata")
            .cloned()
            .unwrap_or(Value::Null);
        ExecutionRecord {
            execution_id: Some(id_string(&self.id)),
            payload: self.execution_result,
            sources,
            metadata,
        }
    }
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionRecord, CallError> {
        let path = format!("/workflows/{}/execute", request.workflow_id);
        let body = json!({
            "workflow_id": request.workflow_id,
            "user_query": request.user_query,
            "workflow_data": request.graph,
        });
        let wire: ExecutionWire = self
            .send_json(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(wire.into_record())
    }
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn create_session(
        &self,
        workflow_id: &WorkflowId,
        label: &str,
    ) -> Result<SessionRecord, CallError> {
        let body = json!({
            "workflow_id": workflow_id,
            "session_name": label,
        });
        let wire: SessionWire = self
            .send_json(self.request(Method::POST, "/chat/sessions").json(&body))
            .await?;
        Ok(wire.into_record())
    }

    async fn session(&self, id: &SessionId) -> Result<SessionRecord, CallError> {
        let wire: SessionWire = self
            .send_json(self.request(Method::GET, &format!("/chat/sessions/{id}")))
            .await?;
        Ok(wire.into_record())
    }

    async fn sessions(&self, workflow_id: &WorkflowId) -> Result<Vec<SessionRecord>, CallError> {
        let req = self
            .request(Method::GET, "/chat/sessions")
            .query(&[("workflow_id", workflow_id.as_str())]);
        let wires: Vec<SessionWire> = self.send_json(req).await?;
        Ok(wires.into_iter().map(SessionWire::into_record).collect())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), CallError> {
        let _ack: Value = self
            .send_json(self.request(Method::DELETE, &format!("/chat/sessions/{id}")))
            .await?;
        Ok(())
    }

    async fn messages(&self, id: &SessionId) -> Result<Vec<Message>, CallError> {
        let wires: Vec<MessageWire> = self
            .send_json(self.request(Method::GET, &format!("/chat/sessions/{id}/messages")))
            .await?;
        Ok(wires.into_iter().map(MessageWire::into_message).collect())
    }

    async fn send_message(&self, id: &SessionId, text: &str) -> Result<ChatReply, CallError> {
        let body = json!({
            "session_id": id,
            "message": text,
        });
        let wire: ChatReplyWire = self
            .send_json(
                self.request(Method::POST, &format!("/chat/sessions/{id}/messages"))
                    .json(&body),
            )
            .await?;
        Ok(wire.into_reply())
    }

    async fn quick_chat(
        &self,
        workflow_id: &WorkflowId,
        text: &str,
    ) -> Result<ChatReply, CallError> {
        let req = self
            .request(Method::POST, "/chat/quick-chat")
            .query(&[("workflow_id", workflow_id.as_str()), ("message", text)]);
        let wire: ChatReplyWire = self.send_json(req).await?;
        Ok(wire.into_reply())
    }
}
