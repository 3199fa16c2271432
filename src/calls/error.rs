//! Error taxonomy for the call boundary.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that can occur while talking to the backend.
///
/// These are the retryable layer's currency: the executor retries them up
/// to its configured bound, then surfaces the last one as a
/// [`TerminalFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CallError {
    /// The backend rejected the credential. Not self-healing: retrying
    /// with the same token cannot succeed, and the auth context is torn
    /// down when this becomes terminal.
    #[error("unauthorized: the backend rejected the credential")]
    #[diagnostic(
        code(flowforge::calls::unauthorized),
        help("Sign in again; stale tokens are not refreshed by this layer.")
    )]
    Unauthorized,

    /// No response reached the endpoint.
    #[error("network error: {message}")]
    #[diagnostic(code(flowforge::calls::network))]
    Network { message: String },

    /// The attempt exceeded its time budget.
    #[error("attempt timed out")]
    #[diagnostic(
        code(flowforge::calls::timeout),
        help("The backend may be overloaded; the call was retried up to its bound.")
    )]
    Timeout,

    /// The endpoint responded with a structured failure.
    #[error("provider error ({status}): {message}")]
    #[diagnostic(code(flowforge::calls::provider))]
    Provider { status: u16, message: String },
}

impl CallError {
    /// Stable machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            CallError::Unauthorized => "unauthorized",
            CallError::Network { .. } => "network_error",
            CallError::Timeout => "timeout",
            CallError::Provider { .. } => "provider_error",
        }
    }

    /// The single `{message, code}` object surfaced after retries are
    /// exhausted.
    #[must_use]
    pub fn terminal(&self) -> TerminalFailure {
        TerminalFailure {
            message: self.to_string(),
            code: self.code(),
        }
    }
}

/// Terminal error object handed to callers once the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalFailure {
    pub message: String,
    pub code: &'static str,
}
