//! Chat session orchestration.
//!
//! [`ChatOrchestrator`] owns the session list, the selected session, and the
//! in-memory message transcript for one workflow. Every backend call goes
//! through the orchestrator's [`CallExecutor`], so a newer user action
//! supersedes a stale in-flight one instead of racing it.
//!
//! Sends are optimistic: the user's message is appended before the call
//! starts, and a permanent failure appends a synthetic assistant error
//! reply rather than rewriting history.

use std::sync::Arc;

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;

use crate::backends::{ChatReply, SessionBackend, SessionRecord};
use crate::calls::{CallError, CallExecutor, CallOutcome};
use crate::message::{Message, MessageMeta};
use crate::types::{SessionId, WorkflowId};

/// Lifecycle of the orchestrator's view of one workflow's chat state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatPhase {
    /// No session list has been loaded yet.
    Uninitialized,
    /// A session list or transcript fetch is in flight.
    Loading,
    /// State is consistent and idle.
    Ready,
    /// A message send is in flight.
    Sending,
}

/// Errors surfaced by the orchestrator.
// `Diagnostic` is hand-written rather than derived: the derive's
// `#[diagnostic(transparent)]` forwarding uses method-call syntax, which
// `CallError`'s inherent `code()` method would shadow.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A message was sent with no session selected.
    #[error("no chat session is selected")]
    NoSession,

    /// The backend call failed after exhausting its retry budget.
    #[error(transparent)]
    Call(#[from] CallError),
}

impl Diagnostic for ChatError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ChatError::NoSession => Some(Box::new("flowforge::sessions::no_session")),
            ChatError::Call(inner) => Diagnostic::code(inner),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ChatError::NoSession => Some(Box::new(
                "Create or select a session first, or use `chat` to auto-create one.",
            )),
            ChatError::Call(inner) => Diagnostic::help(inner),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            ChatError::NoSession => None,
            ChatError::Call(inner) => Diagnostic::severity(inner),
        }
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ChatError::NoSession => None,
            ChatError::Call(inner) => Diagnostic::url(inner),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            ChatError::NoSession => None,
            ChatError::Call(inner) => Diagnostic::source_code(inner),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        match self {
            ChatError::NoSession => None,
            ChatError::Call(inner) => Diagnostic::labels(inner),
        }
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        match self {
            ChatError::NoSession => None,
            ChatError::Call(inner) => Diagnostic::related(inner),
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        match self {
            ChatError::NoSession => None,
            ChatError::Call(inner) => Diagnostic::diagnostic_source(inner),
        }
    }
}

/// Whether an orchestrator action took effect or was superseded by a
/// newer one. Superseded actions mutate nothing beyond what they had
/// already optimistically applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    Applied,
    Superseded,
}

impl ChatOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, ChatOutcome::Applied)
    }
}

/// Orchestrates chat sessions and messages for a single workflow.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use flowforge::backends::http::HttpBackend;
/// use flowforge::calls::{AuthContext, CallExecutor};
/// use flowforge::config::ClientConfig;
/// use flowforge::sessions::ChatOrchestrator;
/// use flowforge::types::WorkflowId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::default();
/// let auth = Arc::new(AuthContext::new());
/// let backend = Arc::new(HttpBackend::new(&config, Arc::clone(&auth))?);
/// let executor = CallExecutor::new(config.call_policy(), auth);
///
/// let mut chat = ChatOrchestrator::new(backend, executor, WorkflowId::from("wf-1"));
/// chat.load().await?;
/// chat.chat("What changed in the latest report?").await?;
/// # Ok(())
/// # }
/// ```
pub struct ChatOrchestrator {
    backend: Arc<dyn SessionBackend>,
    executor: CallExecutor,
    workflow_id: WorkflowId,
    phase: ChatPhase,
    sessions: Vec<SessionRecord>,
    current: Option<SessionId>,
    messages: Vec<Message>,
}

impl ChatOrchestrator {
    #[must_use]
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        executor: CallExecutor,
        workflow_id: WorkflowId,
    ) -> Self {
        Self {
            backend,
            executor,
            workflow_id,
            phase: ChatPhase::Uninitialized,
            sessions: Vec::new(),
            current: None,
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    #[must_use]
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Known session headers, most recent load wins.
    #[must_use]
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    #[must_use]
    pub fn current_session(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    /// Transcript of the selected session, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Fetch the workflow's session list.
    ///
    /// On failure the orchestrator returns to `Uninitialized` so a later
    /// `load` retries from scratch.
    pub async fn load(&mut self) -> Result<ChatOutcome, ChatError> {
        self.phase = ChatPhase::Loading;
        let backend = Arc::clone(&self.backend);
        let workflow_id = self.workflow_id.clone();
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let workflow_id = workflow_id.clone();
                async move { backend.sessions(&workflow_id).await }
            })
            .await;

        match outcome {
            CallOutcome::Completed(sessions) => {
                self.sessions = sessions;
                self.phase = ChatPhase::Ready;
                Ok(ChatOutcome::Applied)
            }
            CallOutcome::Failed(err) => {
                self.phase = ChatPhase::Uninitialized;
                Err(err.into())
            }
            CallOutcome::Superseded => Ok(ChatOutcome::Superseded),
        }
    }

    /// Create a session and select it.
    ///
    /// `label` defaults to a timestamped name when absent.
    pub async fn create_session(
        &mut self,
        label: Option<&str>,
    ) -> Result<ChatOutcome, ChatError> {
        let label = label.map(str::to_string).unwrap_or_else(default_label);
        let backend = Arc::clone(&self.backend);
        let workflow_id = self.workflow_id.clone();
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let workflow_id = workflow_id.clone();
                let label = label.clone();
                async move { backend.create_session(&workflow_id, &label).await }
            })
            .await;

        match outcome {
            CallOutcome::Completed(record) => {
                self.current = Some(record.id.clone());
                self.messages.clear();
                self.sessions.push(record);
                self.phase = ChatPhase::Ready;
                Ok(ChatOutcome::Applied)
            }
            CallOutcome::Failed(err) => Err(err.into()),
            CallOutcome::Superseded => Ok(ChatOutcome::Superseded),
        }
    }

    /// Switch to another session, replacing the transcript atomically:
    /// header and history are fetched in one invocation, so a superseded
    /// switch leaves the previous transcript untouched.
    pub async fn select_session(&mut self, id: &SessionId) -> Result<ChatOutcome, ChatError> {
        self.phase = ChatPhase::Loading;
        let backend = Arc::clone(&self.backend);
        let sid = id.clone();
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let sid = sid.clone();
                async move {
                    let header = backend.session(&sid).await?;
                    let history = backend.messages(&sid).await?;
                    Ok((header, history))
                }
            })
            .await;

        match outcome {
            CallOutcome::Completed((header, history)) => {
                if let Some(slot) = self.sessions.iter_mut().find(|s| s.id == header.id) {
                    *slot = header.clone();
                } else {
                    self.sessions.push(header.clone());
                }
                self.current = Some(header.id);
                self.messages = history;
                self.phase = ChatPhase::Ready;
                Ok(ChatOutcome::Applied)
            }
            CallOutcome::Failed(err) => {
                self.phase = ChatPhase::Ready;
                Err(err.into())
            }
            CallOutcome::Superseded => Ok(ChatOutcome::Superseded),
        }
    }

    /// Ensure a session is selected, creating one on demand.
    pub async fn ensure_session(&mut self) -> Result<ChatOutcome, ChatError> {
        if self.current.is_some() {
            return Ok(ChatOutcome::Applied);
        }
        self.create_session(None).await
    }

    /// Send a message through the selected session.
    ///
    /// The user's message is appended optimistically before the call
    /// starts. On success the assistant reply is appended with its
    /// execution linkage; on permanent failure a synthetic error reply is
    /// appended and the error is also returned. A superseded send keeps
    /// the optimistic message and appends nothing else.
    pub async fn send_message(&mut self, text: &str) -> Result<ChatOutcome, ChatError> {
        let Some(session_id) = self.current.clone() else {
            return Err(ChatError::NoSession);
        };

        self.messages.push(Message::user(text));
        self.phase = ChatPhase::Sending;

        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let session_id = session_id.clone();
                let text = text.clone();
                async move { backend.send_message(&session_id, &text).await }
            })
            .await;

        match outcome {
            CallOutcome::Completed(reply) => {
                self.messages.push(reply_message(reply));
                self.phase = ChatPhase::Ready;
                Ok(ChatOutcome::Applied)
            }
            CallOutcome::Failed(err) => {
                self.messages.push(Message::error_reply(&format!(
                    "Sorry, I encountered an error: {err}"
                )));
                self.phase = ChatPhase::Ready;
                Err(err.into())
            }
            CallOutcome::Superseded => {
                self.phase = ChatPhase::Ready;
                Ok(ChatOutcome::Superseded)
            }
        }
    }

    /// Send a message, creating a session first if none is selected.
    pub async fn chat(&mut self, text: &str) -> Result<ChatOutcome, ChatError> {
        match self.ensure_session().await? {
            ChatOutcome::Applied => self.send_message(text).await,
            ChatOutcome::Superseded => Ok(ChatOutcome::Superseded),
        }
    }

    /// One-shot chat against the workflow without touching session state.
    ///
    /// Returns `None` when superseded.
    pub async fn quick_chat(&self, text: &str) -> Result<Option<ChatReply>, ChatError> {
        let backend = Arc::clone(&self.backend);
        let workflow_id = self.workflow_id.clone();
        let text = text.to_string();
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let workflow_id = workflow_id.clone();
                let text = text.clone();
                async move { backend.quick_chat(&workflow_id, &text).await }
            })
            .await;

        match outcome.into_result() {
            Some(Ok(reply)) => Ok(Some(reply)),
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }

    /// Delete a session. Deleting the selected session clears the
    /// transcript.
    pub async fn delete_session(&mut self, id: &SessionId) -> Result<ChatOutcome, ChatError> {
        let backend = Arc::clone(&self.backend);
        let sid = id.clone();
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let sid = sid.clone();
                async move { backend.delete_session(&sid).await }
            })
            .await;

        match outcome {
            CallOutcome::Completed(()) => {
                self.sessions.retain(|s| &s.id != id);
                if self.current.as_ref() == Some(id) {
                    self.current = None;
                    self.messages.clear();
                }
                Ok(ChatOutcome::Applied)
            }
            CallOutcome::Failed(err) => Err(err.into()),
            CallOutcome::Superseded => Ok(ChatOutcome::Superseded),
        }
    }

    /// Cancel whatever invocation is in flight.
    pub fn cancel(&self) {
        self.executor.cancel();
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("workflow_id", &self.workflow_id)
            .field("phase", &self.phase)
            .field("sessions", &self.sessions.len())
            .field("messages", &self.messages.len())
            .finish_non_exhaustive()
    }
}

fn reply_message(reply: ChatReply) -> Message {
    Message::assistant(&reply.response).with_meta(MessageMeta {
        execution_id: reply.execution_id,
        sources: reply.sources,
        error: false,
    })
}

fn default_label() -> String {
    Utc::now().format("Chat Session - %Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_label_is_timestamped() {
        let label = default_label();
        assert!(label.starts_with("Chat Session - "));
    }

    #[test]
    fn reply_message_carries_linkage() {
        let msg = reply_message(ChatReply {
            response: "answer".into(),
            execution_id: Some("exec-9".into()),
            sources: Vec::new(),
            metadata: serde_json::Value::Null,
        });
        assert!(msg.has_role(Message::ASSISTANT));
        assert!(!msg.is_error());
        assert_eq!(
            msg.meta.unwrap().execution_id.as_deref(),
            Some("exec-9")
        );
    }
}
