//! In-memory backend fakes with failure injection.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use flowforge::backends::{
    ChatReply, ExecutionBackend, ExecutionRecord, ExecutionRequest, SessionBackend, SessionRecord,
};
use flowforge::calls::CallError;
use flowforge::message::Message;
use flowforge::types::{SessionId, WorkflowId};

/// Session backend fake: an in-memory session store that echoes messages.
///
/// Failures are injected as a queue consumed one per call, so a test can
/// script "fail twice, then succeed" retry scenarios. An optional delay is
/// applied before every call to exercise timeouts and supersession.
#[derive(Default)]
pub struct MockSessionBackend {
    sessions: Mutex<Vec<SessionRecord>>,
    logs: Mutex<HashMap<SessionId, Vec<Message>>>,
    failures: Mutex<VecDeque<CallError>>,
    delay: Mutex<Option<Duration>>,
    next_id: AtomicU32,
    pub send_calls: AtomicU32,
}

impl MockSessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure; each queued failure consumes one call.
    pub fn fail_with(&self, err: CallError) {
        self.failures.lock().unwrap().push_back(err);
    }

    /// Queue the same failure `n` times.
    pub fn fail_n_times(&self, err: CallError, n: usize) {
        let mut q = self.failures.lock().unwrap();
        for _ in 0..n {
            q.push_back(err.clone());
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn gate(&self) -> Result<(), CallError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(())
    }

    fn fresh_session_id(&self) -> SessionId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        SessionId::from(format!("s-{n}"))
    }
}

#[async_trait]
impl SessionBackend for MockSessionBackend {
    async fn create_session(
        &self,
        workflow_id: &WorkflowId,
        label: &str,
    ) -> Result<SessionRecord, CallError> {
        self.gate().await?;
        let record = SessionRecord {
            id: self.fresh_session_id(),
            workflow_id: workflow_id.clone(),
            label: label.to_string(),
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(record.clone());
        self.logs
            .lock()
            .unwrap()
            .insert(record.id.clone(), Vec::new());
        Ok(record)
    }

    async fn session(&self, id: &SessionId) -> Result<SessionRecord, CallError> {
        self.gate().await?;
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| CallError::Provider {
                status: 404,
                message: "Chat session not found".to_string(),
            })
    }

    async fn sessions(&self, workflow_id: &WorkflowId) -> Result<Vec<SessionRecord>, CallError> {
        self.gate().await?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.workflow_id == workflow_id)
            .cloned()
            .collect())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), CallError> {
        self.gate().await?;
        self.sessions.lock().unwrap().retain(|s| &s.id != id);
        self.logs.lock().unwrap().remove(id);
        Ok(())
    }

    async fn messages(&self, id: &SessionId) -> Result<Vec<Message>, CallError> {
        self.gate().await?;
        Ok(self
            .logs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, id: &SessionId, text: &str) -> Result<ChatReply, CallError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        let response = format!("echo: {text}");
        let mut logs = self.logs.lock().unwrap();
        let log = logs.entry(id.clone()).or_default();
        log.push(Message::user(text));
        log.push(Message::assistant(&response));
        Ok(ChatReply {
            response,
            execution_id: Some("exec-1".to_string()),
            sources: Vec::new(),
            metadata: Value::Null,
        })
    }

    async fn quick_chat(
        &self,
        _workflow_id: &WorkflowId,
        text: &str,
    ) -> Result<ChatReply, CallError> {
        self.gate().await?;
        Ok(ChatReply {
            response: format!("quick: {text}"),
            execution_id: None,
            sources: Vec::new(),
            metadata: Value::Null,
        })
    }
}

/// Execution backend fake returning a configurable payload.
pub struct MockExecutionBackend {
    payload: Mutex<Value>,
    failures: Mutex<VecDeque<CallError>>,
    pub calls: AtomicU32,
}

impl Default for MockExecutionBackend {
    fn default() -> Self {
        Self {
            payload: Mutex::new(json!({"response": "ok"})),
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }
}

impl MockExecutionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: Value) -> Self {
        let backend = Self::default();
        *backend.payload.lock().unwrap() = payload;
        backend
    }

    pub fn fail_with(&self, err: CallError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionBackend for MockExecutionBackend {
    async fn execute(&self, _request: ExecutionRequest) -> Result<ExecutionRecord, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(ExecutionRecord {
            execution_id: Some("exec-42".to_string()),
            payload: self.payload.lock().unwrap().clone(),
            sources: Vec::new(),
            metadata: Value::Null,
        })
    }
}
