//! Workflow execution trigger.
//!
//! Validates a graph locally, serializes it, and submits it to the
//! execution backend through the resilient call executor. An inexecutable
//! graph is rejected before any network traffic happens.

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::backends::{ExecutionBackend, ExecutionRecord, ExecutionRequest};
use crate::calls::{CallError, CallExecutor};
use crate::graphs::{validate_graph, Graph, ValidationReport};
use crate::types::WorkflowId;

/// Errors surfaced by [`ExecutionTrigger::execute`].
// `Diagnostic` is hand-written rather than derived: the derive's
// `#[diagnostic(transparent)]` forwarding uses method-call syntax, which
// `CallError`'s inherent `code()` method would shadow.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The graph failed executability validation; nothing was submitted.
    #[error("workflow is not executable: {}", report.reasons.join("; "))]
    Validation { report: ValidationReport },

    /// The backend call failed after exhausting its retry budget.
    #[error(transparent)]
    Call(#[from] CallError),
}

impl Diagnostic for ExecutionError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ExecutionError::Validation { .. } => {
                Some(Box::new("flowforge::execution::not_executable"))
            }
            ExecutionError::Call(inner) => Diagnostic::code(inner),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ExecutionError::Validation { .. } => Some(Box::new(
                "Fix the listed problems in the workflow before running it.",
            )),
            ExecutionError::Call(inner) => Diagnostic::help(inner),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            ExecutionError::Validation { .. } => None,
            ExecutionError::Call(inner) => Diagnostic::severity(inner),
        }
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ExecutionError::Validation { .. } => None,
            ExecutionError::Call(inner) => Diagnostic::url(inner),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            ExecutionError::Validation { .. } => None,
            ExecutionError::Call(inner) => Diagnostic::source_code(inner),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        match self {
            ExecutionError::Validation { .. } => None,
            ExecutionError::Call(inner) => Diagnostic::labels(inner),
        }
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        match self {
            ExecutionError::Validation { .. } => None,
            ExecutionError::Call(inner) => Diagnostic::related(inner),
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        match self {
            ExecutionError::Validation { .. } => None,
            ExecutionError::Call(inner) => Diagnostic::diagnostic_source(inner),
        }
    }
}

/// A completed execution: the provider's record plus the extracted answer
/// text.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    pub record: ExecutionRecord,
    /// Primary answer text located in the result payload.
    pub answer: String,
}

/// Submits validated workflows for execution.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use flowforge::backends::http::HttpBackend;
/// use flowforge::calls::{AuthContext, CallExecutor};
/// use flowforge::config::ClientConfig;
/// use flowforge::execution::ExecutionTrigger;
/// use flowforge::graphs::Graph;
/// use flowforge::types::WorkflowId;
///
/// # async fn example(graph: &Graph) -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::default();
/// let auth = Arc::new(AuthContext::new());
/// let backend = Arc::new(HttpBackend::new(&config, Arc::clone(&auth))?);
/// let trigger = ExecutionTrigger::new(backend, CallExecutor::new(config.call_policy(), auth));
///
/// if let Some(outcome) = trigger
///     .execute(graph, &WorkflowId::from("wf-1"), "Summarize the report")
///     .await?
/// {
///     println!("{}", outcome.answer);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ExecutionTrigger {
    backend: Arc<dyn ExecutionBackend>,
    executor: CallExecutor,
}

impl ExecutionTrigger {
    #[must_use]
    pub fn new(backend: Arc<dyn ExecutionBackend>, executor: CallExecutor) -> Self {
        Self { backend, executor }
    }

    /// Validate, serialize, and submit the graph.
    ///
    /// Returns `Ok(None)` when a newer execution superseded this one.
    pub async fn execute(
        &self,
        graph: &Graph,
        workflow_id: &WorkflowId,
        user_query: &str,
    ) -> Result<Option<ExecutionOutcome>, ExecutionError> {
        let report = validate_graph(graph);
        if !report.valid {
            tracing::debug!(reasons = ?report.reasons, "rejecting inexecutable workflow");
            return Err(ExecutionError::Validation { report });
        }

        let request = ExecutionRequest {
            workflow_id: workflow_id.clone(),
            graph: graph.to_wire(),
            user_query: user_query.to_string(),
        };
        let backend = Arc::clone(&self.backend);
        let outcome = self
            .executor
            .run(move || {
                let backend = Arc::clone(&backend);
                let request = request.clone();
                async move { backend.execute(request).await }
            })
            .await;

        match outcome.into_result() {
            Some(Ok(record)) => {
                let answer = primary_text(&record.payload);
                Ok(Some(ExecutionOutcome { record, answer }))
            }
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }

    /// Cancel the in-flight execution, if any.
    pub fn cancel(&self) {
        self.executor.cancel();
    }
}

impl std::fmt::Debug for ExecutionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTrigger").finish_non_exhaustive()
    }
}

/// Locate the primary answer text in a result payload.
///
/// Providers differ in where they put it; fall back to the whole payload
/// rendered as JSON so the caller always has something to show.
fn primary_text(payload: &Value) -> String {
    for key in ["response", "llm_response"] {
        if let Some(text) = payload.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }
    serde_json::to_string_pretty(payload).unwrap_or_default()
}
