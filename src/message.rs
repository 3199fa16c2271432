//! Conversation messages and their metadata.
//!
//! Messages are the primary data structure for chat history. Each message
//! carries a role, text content, a creation timestamp, and optional
//! metadata linking it to the execution that produced it. Messages are
//! immutable once appended to a session: a failed send never rewrites the
//! user's message, it appends a synthetic error reply instead.
//!
//! # Examples
//!
//! ```
//! use flowforge::message::Message;
//!
//! let user_msg = Message::user("What's in the quarterly report?");
//! let reply = Message::assistant("Revenue grew 12% quarter over quarter.");
//!
//! assert!(user_msg.has_role(Message::USER));
//! assert!(!reply.is_error());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::ids;

/// A message in a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Locally generated id. Tentative entries use timestamp-based ids;
    /// the backend assigns the durable identity on persistence.
    pub id: String,
    /// The role of the message sender.
    ///
    /// Use the constants on [`Message`] for standardized values.
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// When the message was created (client clock for optimistic entries).
    pub created_at: DateTime<Utc>,
    /// Execution linkage and source citations, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            id: ids::timestamp_id("msg"),
            role: role.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            meta: None,
        }
    }

    /// Creates a user message.
    ///
    /// ```
    /// use flowforge::message::Message;
    ///
    /// let msg = Message::user("hello");
    /// assert_eq!(msg.role, "user");
    /// ```
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Creates the synthetic assistant message appended when a send fails.
    ///
    /// The error is surfaced in-line in the conversation rather than by
    /// truncating or rewriting history.
    #[must_use]
    pub fn error_reply(content: &str) -> Self {
        let mut msg = Self::assistant(content);
        msg.meta = Some(MessageMeta {
            error: true,
            ..MessageMeta::default()
        });
        msg
    }

    /// Attach metadata to this message.
    #[must_use]
    pub fn with_meta(mut self, meta: MessageMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Returns true if this message marks a failed exchange.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.meta.as_ref().is_some_and(|m| m.error)
    }
}

/// Metadata carried by assistant messages: which execution produced the
/// reply, which sources backed it, and whether it marks a failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMeta {
    /// Id of the backend execution that produced this reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// Document chunks cited by the reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
    /// Set on synthetic error replies.
    #[serde(default)]
    pub error: bool,
}

/// A citation pointing at the document chunk a reply drew from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: String,
    pub document_name: String,
    pub similarity_score: f64,
    /// Leading excerpt of the cited chunk.
    pub excerpt: String,
}
